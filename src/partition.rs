//! Partitioner: slice the master list into evenly sized, numbered shards.
//!
//! `shard_size = ceil(total / target)`.  Shards are consecutive windows of
//! that size; the last may be shorter, and emission stops as soon as the
//! records run out, so fewer than `target` shards come out whenever
//! `total < target` or the ceiling leaves the tail windows empty.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::chunk::{digits, ChunkFile};

/// One output chunk.  `index` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Shard {
    pub index:   u32,
    pub records: Vec<Value>,
}

/// Records per shard, or `None` when there is nothing to partition.
pub fn shard_size(total: usize, target: usize) -> Option<usize> {
    if total == 0 || target == 0 {
        return None;
    }
    Some(total.div_ceil(target))
}

/// Split `records` into at most `target` consecutive shards.
pub fn partition(records: Vec<Value>, target: usize) -> Vec<Shard> {
    let Some(size) = shard_size(records.len(), target) else {
        return Vec::new();
    };

    let mut shards = Vec::with_capacity(target.min(records.len()));
    let mut rest   = records.into_iter().peekable();
    let mut index  = 1u32;
    while rest.peek().is_some() && shards.len() < target {
        shards.push(Shard { index, records: rest.by_ref().take(size).collect() });
        index += 1;
    }
    shards
}

/// Zero-padded width for shard file names: wide enough for `target`, never
/// narrower than `min_width`.
pub fn output_width(target: usize, min_width: usize) -> usize {
    digits(target).max(min_width)
}

// ── Writing ──────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ShardOutcome {
    Written { path: PathBuf, records: usize },
    Failed  { path: PathBuf, error: io::Error },
}

impl ShardOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ShardOutcome::Written { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            ShardOutcome::Written { path, .. } | ShardOutcome::Failed { path, .. } => path,
        }
    }
}

/// Pretty-printed JSON array: 2-space indent, keys in record order,
/// non-ASCII characters written as-is.
pub fn render_shard(records: &[Value]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

/// Write each shard to `dir/chunk_{NNN}.json`.  A failed shard does not stop
/// the others.
pub fn write_shards(dir: &Path, shards: &[Shard], width: usize) -> Vec<ShardOutcome> {
    shards
        .iter()
        .map(|shard| {
            let file = ChunkFile::output(dir, shard.index, width);
            let res  = render_shard(&shard.records)
                .map_err(io::Error::from)
                .and_then(|text| fs::write(&file.path, text));
            match res {
                Ok(()) => {
                    info!(path = %file.path.display(), records = shard.records.len(), "wrote shard");
                    ShardOutcome::Written { path: file.path, records: shard.records.len() }
                }
                Err(error) => {
                    warn!(path = %file.path.display(), %error, "could not write shard");
                    ShardOutcome::Failed { path: file.path, error }
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn numbered(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "id": i })).collect()
    }

    fn sizes(shards: &[Shard]) -> Vec<usize> {
        shards.iter().map(|s| s.records.len()).collect()
    }

    #[test]
    fn twelve_into_five() {
        assert_eq!(shard_size(12, 5), Some(3));
        let shards = partition(numbered(12), 5);
        assert_eq!(sizes(&shards), [3, 3, 3, 3]);
        assert_eq!(shards.iter().map(|s| s.index).collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn fewer_records_than_target() {
        let shards = partition(numbered(3), 80);
        assert_eq!(sizes(&shards), [1, 1, 1]);
    }

    #[test]
    fn empty_input_yields_no_shards() {
        assert_eq!(shard_size(0, 80), None);
        assert!(partition(Vec::new(), 80).is_empty());
    }

    #[test]
    fn last_shard_may_be_short() {
        assert_eq!(sizes(&partition(numbered(10), 3)), [4, 4, 2]);
    }

    #[test]
    fn width_covers_target() {
        assert_eq!(output_width(80, 3), 3);
        assert_eq!(output_width(999, 3), 3);
        assert_eq!(output_width(1000, 3), 4);
        assert_eq!(output_width(5, 1), 1);
    }

    #[test]
    fn rendering_is_readable() {
        let text = render_shard(&[json!({"z": "ü", "a": 1})]).unwrap();
        assert_eq!(text, "[\n  {\n    \"z\": \"ü\",\n    \"a\": 1\n  }\n]");
    }

    #[test]
    fn writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let shards = partition(numbered(5), 2);
        let out = write_shards(dir.path(), &shards, 3);

        assert!(out.iter().all(ShardOutcome::is_written));
        assert_eq!(out[0].path(), dir.path().join("chunk_001.json"));
        let back: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(dir.path().join("chunk_002.json")).unwrap()).unwrap();
        assert_eq!(back, numbered(5)[3..]);
    }

    #[test]
    fn unwritable_dir_fails_per_shard() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let out = write_shards(&missing, &partition(numbered(2), 2), 3);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|o| !o.is_written()));
    }

    proptest! {
        #[test]
        fn completeness_sizing_and_count(n in 0usize..400, target in 1usize..100) {
            let records = numbered(n);
            let shards  = partition(records.clone(), target);

            let joined: Vec<Value> = shards.iter().flat_map(|s| s.records.clone()).collect();
            prop_assert_eq!(&joined, &records);

            prop_assert!(shards.len() <= target.min(n));
            prop_assert_eq!(shards.is_empty(), n == 0);

            if let Some(size) = shard_size(n, target) {
                let (last, init) = shards.split_last().unwrap();
                prop_assert!(init.iter().all(|s| s.records.len() == size));
                let expected_last = if n % size == 0 { size } else { n % size };
                prop_assert_eq!(last.records.len(), expected_last);
            }
        }
    }
}
