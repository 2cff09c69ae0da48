//! Checksum manifest for a directory of chunk files.
//!
//! Every `*.json` file directly inside the directory is hashed with BLAKE3.
//! The overall hash is BLAKE3 over the per-file hex digests concatenated in
//! file-name order, so it changes if any file is added, removed or edited.
//! The manifest file itself is excluded.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default manifest file name inside the hashed directory.
pub const MANIFEST_NAME: &str = "checksums.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChecksum {
    pub filename: String,
    pub size:     u64,
    /// RFC 3339 modification time.
    pub modified: String,
    pub blake3:   String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub generated:    String,
    pub total_files:  usize,
    pub total_size:   u64,
    pub overall_hash: String,
    pub files:        Vec<FileChecksum>,
}

impl Manifest {
    /// `Ok(None)` when no manifest exists at `path`, or when the file there
    /// does not parse; a corrupt manifest is replaced on the next save.
    pub fn load(path: &Path) -> Result<Option<Self>, ManifestError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(manifest) => Ok(Some(manifest)),
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable checksum manifest");
                Ok(None)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), files = self.total_files, "saved checksum manifest");
        Ok(())
    }
}

/// Hash every JSON file in `dir`.
pub fn generate(dir: &Path) -> Result<Manifest, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::NotADirectory(dir.display().to_string()));
    }

    let mut names: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".json") && name != MANIFEST_NAME {
            names.push(name);
        }
    }
    names.sort();

    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(&name);
        let data = fs::read(&path)?;
        let meta = fs::metadata(&path)?;
        let modified: DateTime<Utc> = meta.modified()?.into();
        debug!(file = %name, size = data.len(), "hashed");
        files.push(FileChecksum {
            filename: name,
            size:     data.len() as u64,
            modified: modified.to_rfc3339_opts(SecondsFormat::Millis, true),
            blake3:   blake3::hash(&data).to_hex().to_string(),
        });
    }

    let overall_hash = overall_hash(&files);
    let manifest = Manifest {
        generated:   Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        total_files: files.len(),
        total_size:  files.iter().map(|f| f.size).sum(),
        overall_hash,
        files,
    };
    info!(
        dir = %dir.display(),
        files = manifest.total_files,
        overall = %manifest.overall_hash,
        "generated checksums",
    );
    Ok(manifest)
}

fn overall_hash(files: &[FileChecksum]) -> String {
    let mut hasher = blake3::Hasher::new();
    for f in files {
        hasher.update(f.blake3.as_bytes());
    }
    hex::encode(hasher.finalize().as_bytes())
}

// ── Comparison ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// No previous manifest to compare against.
    pub no_baseline:   bool,
    pub new_files:     Vec<String>,
    pub changed_files: Vec<String>,
    pub deleted_files: Vec<String>,
}

impl ManifestDiff {
    pub fn has_changes(&self) -> bool {
        self.no_baseline
            || !(self.new_files.is_empty() && self.changed_files.is_empty() && self.deleted_files.is_empty())
    }
}

/// Differences between a previous manifest (if any) and a fresh one, by
/// file name and content hash.  Results are sorted by file name.
pub fn compare(old: Option<&Manifest>, new: &Manifest) -> ManifestDiff {
    let Some(old) = old else {
        return ManifestDiff {
            no_baseline: true,
            new_files:   new.files.iter().map(|f| f.filename.clone()).collect(),
            ..ManifestDiff::default()
        };
    };

    let before: BTreeMap<&str, &str> =
        old.files.iter().map(|f| (f.filename.as_str(), f.blake3.as_str())).collect();
    let after: BTreeMap<&str, &str> =
        new.files.iter().map(|f| (f.filename.as_str(), f.blake3.as_str())).collect();

    let mut diff = ManifestDiff::default();
    for (name, hash) in &after {
        match before.get(name) {
            None                    => diff.new_files.push((*name).to_owned()),
            Some(h) if h != hash    => diff.changed_files.push((*name).to_owned()),
            Some(_)                 => {}
        }
    }
    diff.deleted_files = before
        .keys()
        .filter(|name| !after.contains_key(*name))
        .map(|name| (*name).to_owned())
        .collect();
    diff
}
