//! One repartition run: aggregate → partition → write → archive.
//!
//! ```no_run
//! use rechunk::pipeline::{run, RepartitionOptions};
//!
//! let opts = RepartitionOptions { target_shards: 5, ..RepartitionOptions::default() };
//! let report = run(&opts)?;
//! println!("{}", report.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::aggregate::{aggregate, FileReport};
use crate::archive::{archive, ArchiveOutcome};
use crate::chunk::{input_files, output_name, DEFAULT_WIDTH};
use crate::partition::{output_width, partition, shard_size, write_shards, ShardOutcome};
use crate::recovery::{LabelError, PartialExtractor, DEFAULT_FIELD_LABEL};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Label(#[from] LabelError),
}

// ── RepartitionOptions ───────────────────────────────────────────────────────

/// Configuration for [`run`].
#[derive(Debug, Clone)]
pub struct RepartitionOptions {
    /// Directory holding the input chunks; shards are written here too.
    pub data_dir:        PathBuf,
    /// Backup subdirectory name, relative to `data_dir`.
    pub backup_dir_name: String,
    /// Inclusive input index range.
    pub first_input:     u32,
    pub last_input:      u32,
    pub target_shards:   usize,
    /// Minimum zero-padded width of shard file names.
    pub min_width:       usize,
    /// Field used by the recovery scanner to name partial records.
    pub field_label:     String,
    pub archive_inputs:  bool,
    /// Aggregate and plan only; nothing is written or moved.
    pub dry_run:         bool,
}

impl Default for RepartitionOptions {
    fn default() -> Self {
        Self {
            data_dir:        PathBuf::from("data"),
            backup_dir_name: "original_chunks".into(),
            first_input:     1,
            last_input:      16,
            target_shards:   80,
            min_width:       DEFAULT_WIDTH,
            field_label:     DEFAULT_FIELD_LABEL.into(),
            archive_inputs:  true,
            dry_run:         false,
        }
    }
}

impl RepartitionOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.target_shards == 0 {
            return Err(PipelineError::InvalidOptions("target shard count must be at least 1".into()));
        }
        if self.first_input > self.last_input {
            return Err(PipelineError::InvalidOptions(format!(
                "empty input range {}..={}", self.first_input, self.last_input
            )));
        }
        // Shard indices without leading zeros share a name with the same input
        // index (`chunk_100.json`), and writing them would clobber an input.
        let width       = output_width(self.target_shards, self.min_width);
        let unpadded_lo = 10u64.checked_pow(width.saturating_sub(1) as u32).unwrap_or(u64::MAX);
        let lo          = unpadded_lo.max(u64::from(self.first_input));
        let hi          = (self.target_shards as u64).min(u64::from(self.last_input));
        if lo <= hi {
            return Err(PipelineError::InvalidOptions(format!(
                "shard chunk_{lo}.json would overwrite input chunk_{lo}.json; raise the shard name width"
            )));
        }
        // The backup dir must be a direct child of the data dir; `.`, `..`,
        // nested or absolute names could resolve onto the inputs themselves.
        let mut parts = Path::new(&self.backup_dir_name).components();
        if !matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None)) {
            return Err(PipelineError::InvalidOptions(format!(
                "backup directory name {:?} must be a single plain directory name", self.backup_dir_name
            )));
        }
        Ok(())
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(&self.backup_dir_name)
    }
}

// ── RunReport ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RunReport {
    pub files:         Vec<FileReport>,
    pub total_records: usize,
    /// `None` when no records were recovered and partitioning was skipped.
    pub shard_size:    Option<usize>,
    /// Shard file names and sizes planned (dry run) or attempted.
    pub planned:       Vec<(PathBuf, usize)>,
    pub shards:        Vec<ShardOutcome>,
    pub archive:       Vec<ArchiveOutcome>,
    /// Why the archive step did not run, if it did not.
    pub archive_skipped: Option<&'static str>,
}

impl RunReport {
    pub fn shards_written(&self) -> usize {
        self.shards.iter().filter(|s| s.is_written()).count()
    }

    /// Inputs moved to, or already present in, the backup directory.
    pub fn archived(&self) -> usize {
        self.archive
            .iter()
            .filter(|o| matches!(o, ArchiveOutcome::Moved { .. } | ArchiveOutcome::Discarded { .. }))
            .count()
    }

    pub fn summary(&self) -> String {
        match self.shard_size {
            None => format!("No records recovered from {} file(s); 0 shards written", self.files.len()),
            Some(size) => format!(
                "Split {} record(s) into {} shard(s) of up to {} record(s); {} written, {} input(s) archived",
                self.total_records,
                self.planned.len(),
                size,
                self.shards_written(),
                self.archived(),
            ),
        }
    }
}

// ── run ──────────────────────────────────────────────────────────────────────

/// Execute one repartition run.  Only invalid options are returned as `Err`;
/// every per-file problem is recorded in the report.
pub fn run(opts: &RepartitionOptions) -> Result<RunReport, PipelineError> {
    opts.validate()?;
    let extractor = PartialExtractor::new(&opts.field_label)?;
    let inputs    = input_files(&opts.data_dir, opts.first_input..=opts.last_input);

    let agg = aggregate(&inputs, &extractor);
    let mut report = RunReport {
        files:         agg.reports,
        total_records: agg.records.len(),
        shard_size:    shard_size(agg.records.len(), opts.target_shards),
        ..RunReport::default()
    };

    if report.shard_size.is_none() {
        info!("no records recovered, nothing to partition");
        report.archive_skipped = Some("no records recovered");
        return Ok(report);
    }

    let width  = output_width(opts.target_shards, opts.min_width);
    let shards = partition(agg.records, opts.target_shards);
    report.planned = shards
        .iter()
        .map(|s| (opts.data_dir.join(output_name(s.index, width)), s.records.len()))
        .collect();

    if opts.dry_run {
        report.archive_skipped = Some("dry run");
        return Ok(report);
    }

    report.shards = write_shards(&opts.data_dir, &shards, width);

    if report.shards_written() != report.shards.len() {
        warn!("not every shard was written; leaving inputs in place");
        report.archive_skipped = Some("shard write failed");
    } else if !opts.archive_inputs {
        report.archive_skipped = Some("archiving disabled");
    } else {
        report.archive = archive(&inputs, &opts.backup_dir());
    }

    info!("{}", report.summary());
    Ok(report)
}
