//! Single-file diagnostics: reformat a parseable chunk for manual review, or
//! scan a corrupt one for whatever can still be identified.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::recovery::{PartialExtract, PartialExtractor};

/// Records shown in an [`Inspection::Parsed`] preview.
pub const PREVIEW_LEN: usize = 5;

#[derive(Error, Debug)]
pub enum InspectError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Could not render formatted copy: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPreview {
    pub name:         String,
    pub generic_name: String,
}

impl RecordPreview {
    fn of(record: &Value, label: &str) -> Self {
        fn text(v: Option<&Value>, fallback: &str) -> String {
            v.and_then(Value::as_str).unwrap_or(fallback).to_owned()
        }
        Self {
            name:         text(record.get(label), "Unknown"),
            generic_name: text(record.pointer("/label/genericName"), "N/A"),
        }
    }
}

#[derive(Debug)]
pub enum Inspection {
    /// The file parsed as a JSON value and a formatted copy was written.
    Parsed {
        /// Array length, or `None` when the top-level value is not an array.
        entries:  Option<usize>,
        preview:  Vec<RecordPreview>,
        artifact: PathBuf,
    },
    Corrupt {
        error:   String,
        partial: PartialExtract,
    },
}

/// `<stem>_formatted.json`, next to `path`.
pub fn artifact_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!("{stem}_formatted.json"))
}

pub fn inspect(path: &Path, extractor: &PartialExtractor) -> Result<Inspection, InspectError> {
    let content = fs::read_to_string(path)?;
    info!(path = %path.display(), chars = content.chars().count(), "inspecting chunk");

    let value: Value = match serde_json::from_str(&content) {
        Ok(v)  => v,
        Err(e) => {
            return Ok(Inspection::Corrupt {
                error:   e.to_string(),
                partial: extractor.extract_partial(&content),
            });
        }
    };

    let artifact = artifact_path(path);
    fs::write(&artifact, serde_json::to_string_pretty(&value)?)?;
    info!(artifact = %artifact.display(), "wrote formatted copy");

    let (entries, preview) = match &value {
        Value::Array(items) => (
            Some(items.len()),
            items.iter().take(PREVIEW_LEN).map(|r| RecordPreview::of(r, extractor.label())).collect(),
        ),
        _ => (None, Vec::new()),
    };
    Ok(Inspection::Parsed { entries, preview, artifact })
}
