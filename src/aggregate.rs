//! Aggregator: decode an ordered range of input chunks into one master list.
//!
//! Files are visited in ascending index order and each contributes either
//! all of its decoded records or none of them.  Absent indices are skipped;
//! the input range is caller supplied and gaps in it are expected.

use std::fs;
use std::io;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chunk::ChunkFile;
use crate::decode::{decode_with_strategy, DecodeStrategy};
use crate::recovery::{PartialExtract, PartialExtractor};

// ── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Every record in the file was appended to the master list.
    Ok { records: usize, strategy: DecodeStrategy },
    /// Index absent on disk.  A skip, not an error.
    Missing,
    /// Nothing from this file was kept.  `partial` is set when the content
    /// was unparseable and the recovery scanner ran over it.
    Failed { reason: String, partial: Option<PartialExtract> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file:   ChunkFile,
    pub status: FileStatus,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, FileStatus::Ok { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// The master list plus one report per input file, both in index order.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: Vec<Value>,
    pub reports: Vec<FileReport>,
}

impl Aggregation {
    pub fn failed(&self) -> impl Iterator<Item = &FileReport> {
        self.reports.iter().filter(|r| r.is_failed())
    }

    pub fn processed(&self) -> usize {
        self.reports.iter().filter(|r| !matches!(r.status, FileStatus::Missing)).count()
    }
}

// ── Aggregator ───────────────────────────────────────────────────────────────

/// Decode every file in `files` (sorted by index first) and concatenate the
/// results.  Never fails: per-file problems land in the reports.
pub fn aggregate(files: &[ChunkFile], extractor: &PartialExtractor) -> Aggregation {
    let mut ordered: Vec<&ChunkFile> = files.iter().collect();
    ordered.sort_by_key(|f| f.index);

    let mut out = Aggregation::default();
    for file in ordered {
        let status = match read_chunk(file) {
            Ok(None) => {
                debug!(path = %file.path.display(), "input chunk absent, skipping");
                FileStatus::Missing
            }
            Ok(Some(content)) => decode_chunk(file, &content, extractor, &mut out.records),
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "could not read input chunk");
                FileStatus::Failed { reason: format!("read error: {e}"), partial: None }
            }
        };
        out.reports.push(FileReport { file: file.clone(), status });
    }

    info!(
        records = out.records.len(),
        processed = out.processed(),
        failed = out.failed().count(),
        "aggregation complete",
    );
    out
}

fn decode_chunk(
    file:      &ChunkFile,
    content:   &str,
    extractor: &PartialExtractor,
    master:    &mut Vec<Value>,
) -> FileStatus {
    match decode_with_strategy(content) {
        Ok(decoded) => {
            let records = decoded.records.len();
            info!(
                path = %file.path.display(),
                records,
                strategy = decoded.strategy.name(),
                "decoded input chunk",
            );
            master.extend(decoded.records);
            FileStatus::Ok { records, strategy: decoded.strategy }
        }
        Err(e) => {
            let partial = e.wants_recovery().then(|| extractor.extract_partial(content));
            warn!(
                path = %file.path.display(),
                error = %e,
                recovered_names = partial.as_ref().map_or(0, |p| p.names.len()),
                "could not decode input chunk",
            );
            FileStatus::Failed { reason: e.to_string(), partial }
        }
    }
}

/// `Ok(None)` when the file does not exist.
fn read_chunk(file: &ChunkFile) -> io::Result<Option<String>> {
    match fs::read_to_string(&file.path) {
        Ok(s)                                         => Ok(Some(s)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e)                                        => Err(e),
    }
}
