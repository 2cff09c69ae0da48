//! Diagnostic recovery for chunk content the decoder could not parse.
//!
//! Nothing here reconstructs records.  The scanner only pulls identifying
//! names and a few signals out of the raw text so an operator can judge how
//! much of a corrupt file was meant to be there.

pub mod scanner;

pub use scanner::{extract_partial, LabelError, PartialExtractor, DEFAULT_FIELD_LABEL, TAIL_CHARS};

use serde::{Deserialize, Serialize};

/// Best-effort findings for one unparseable piece of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialExtract {
    /// Every value of the labelled field, in order of appearance.
    pub names:        Vec<String>,
    /// Last [`TAIL_CHARS`] characters of the content.
    pub tail:         String,
    /// Occurrences of the record-opening marker; a rough lower bound on the
    /// number of records the file intended to hold.
    pub object_count: usize,
}

impl PartialExtract {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.object_count == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} name(s) via pattern, {} potential record object(s)",
            self.names.len(),
            self.object_count,
        )
    }
}
