//! Chunk file identity: index ↔ file name mapping for inputs and shards.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Common stem of every chunk file, input or output.
pub const CHUNK_PREFIX:    &str  = "chunk_";
pub const CHUNK_EXTENSION: &str  = "json";
/// Minimum zero-padded width for output shard names (`chunk_001.json`).
pub const DEFAULT_WIDTH:   usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFile {
    pub index: u32,
    pub path:  PathBuf,
}

impl ChunkFile {
    /// An unpadded input chunk: `chunk_{index}.json`.
    pub fn input(dir: &Path, index: u32) -> Self {
        Self { index, path: dir.join(input_name(index)) }
    }

    /// A zero-padded output shard: `chunk_{index:0width$}.json`.
    pub fn output(dir: &Path, index: u32, width: usize) -> Self {
        Self { index, path: dir.join(output_name(index, width)) }
    }

    /// File name component, used to locate the same file in the backup dir.
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.path.file_name().unwrap_or(self.path.as_os_str())
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

pub fn input_name(index: u32) -> String {
    format!("{CHUNK_PREFIX}{index}.{CHUNK_EXTENSION}")
}

pub fn output_name(index: u32, width: usize) -> String {
    format!("{CHUNK_PREFIX}{index:0width$}.{CHUNK_EXTENSION}")
}

/// Ordered input chunk list for an inclusive, contiguous index range.
pub fn input_files(dir: &Path, range: RangeInclusive<u32>) -> Vec<ChunkFile> {
    range.map(|i| ChunkFile::input(dir, i)).collect()
}

/// Number of decimal digits in `n` (`digits(0) == 1`).
pub fn digits(mut n: usize) -> usize {
    let mut d = 1;
    while n >= 10 {
        n /= 10;
        d += 1;
    }
    d
}
