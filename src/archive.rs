//! Archiver: move original input chunks into a backup directory.
//!
//! ```no_run
//! use rechunk::archive::archive;
//! use rechunk::chunk::input_files;
//! use std::path::Path;
//!
//! let inputs = input_files(Path::new("data"), 1..=16);
//! for outcome in archive(&inputs, Path::new("data/original_chunks")) {
//!     println!("{outcome}");
//! }
//! ```
//!
//! A backup is never overwritten.  When a same-name file already sits in the
//! backup directory (left by an interrupted earlier run) the backup is taken
//! as authoritative and the working copy is deleted.  Running the archiver
//! again after any partial run therefore converges on exactly one copy of
//! every file, in the backup directory.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunk::ChunkFile;

/// Per-file result of [`archive`].
#[derive(Debug)]
pub enum ArchiveOutcome {
    /// Renamed into the backup directory.
    Moved     { from: PathBuf, to: PathBuf },
    /// A backup already existed; the working copy was deleted.
    Discarded { from: PathBuf, backup: PathBuf },
    /// Not present at the working location.
    Absent    { path: PathBuf },
    Failed    { path: PathBuf, error: io::Error },
}

impl ArchiveOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ArchiveOutcome::Failed { .. })
    }
}

impl fmt::Display for ArchiveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveOutcome::Moved { from, to } =>
                write!(f, "moved    {} -> {}", from.display(), to.display()),
            ArchiveOutcome::Discarded { from, .. } =>
                write!(f, "deleted  {} (backup already exists)", from.display()),
            ArchiveOutcome::Absent { path } =>
                write!(f, "absent   {}", path.display()),
            ArchiveOutcome::Failed { path, error } =>
                write!(f, "FAILED   {}: {error}", path.display()),
        }
    }
}

/// Relocate every present input into `backup_dir`, creating it if needed.
///
/// Failures are reported per file and never stop the remaining files.
pub fn archive(inputs: &[ChunkFile], backup_dir: &Path) -> Vec<ArchiveOutcome> {
    if let Err(e) = fs::create_dir_all(backup_dir) {
        warn!(dir = %backup_dir.display(), error = %e, "could not create backup directory");
        return inputs
            .iter()
            .map(|f| {
                if f.exists() {
                    ArchiveOutcome::Failed {
                        path:  f.path.clone(),
                        error: io::Error::new(e.kind(), format!("backup directory: {e}")),
                    }
                } else {
                    ArchiveOutcome::Absent { path: f.path.clone() }
                }
            })
            .collect();
    }

    inputs.iter().map(|f| archive_one(f, backup_dir)).collect()
}

fn archive_one(file: &ChunkFile, backup_dir: &Path) -> ArchiveOutcome {
    let from = file.path.clone();
    if !file.exists() {
        debug!(path = %from.display(), "nothing to archive");
        return ArchiveOutcome::Absent { path: from };
    }

    let backup = backup_dir.join(file.file_name());
    if same_file(&from, &backup) {
        let error = io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("backup location {} is the input itself", backup.display()),
        );
        warn!(path = %from.display(), %error, "refusing to archive input onto itself");
        return ArchiveOutcome::Failed { path: from, error };
    }

    let res = if backup.exists() {
        fs::remove_file(&from).map(|()| ArchiveOutcome::Discarded { from: from.clone(), backup })
    } else {
        fs::rename(&from, &backup).map(|()| ArchiveOutcome::Moved { from: from.clone(), to: backup })
    };

    match res {
        Ok(outcome) => {
            info!("{outcome}");
            outcome
        }
        Err(error) => {
            warn!(path = %from.display(), %error, "could not archive input chunk");
            ArchiveOutcome::Failed { path: from, error }
        }
    }
}

/// Both paths exist and resolve to the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _              => false,
    }
}
