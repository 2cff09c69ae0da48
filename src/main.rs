use clap::{Parser, Subcommand};
use rechunk::aggregate::FileStatus;
use rechunk::inspect::{inspect, Inspection};
use rechunk::manifest::{self, Manifest, MANIFEST_NAME};
use rechunk::partition::ShardOutcome;
use rechunk::pipeline::{run, RepartitionOptions};
use rechunk::recovery::{PartialExtract, PartialExtractor, DEFAULT_FIELD_LABEL};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Names listed before the rest of a recovery scan is summarised.
const NAMES_SHOWN: usize = 10;

#[derive(Parser)]
#[command(name = "rechunk", about = "Repair and repartition JSON chunk files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode chunk_{first..=last}.json, split into evenly sized shards, back up inputs
    Run {
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// First input chunk index
        #[arg(long, default_value = "1")]
        first: u32,
        /// Last input chunk index (inclusive)
        #[arg(long, default_value = "16")]
        last: u32,
        /// Target number of output shards
        #[arg(short, long, default_value = "80")]
        shards: usize,
        /// Minimum zero-padded width of shard numbers
        #[arg(short, long, default_value = "3")]
        width: usize,
        /// Backup directory name under the data directory
        #[arg(long, default_value = "original_chunks")]
        backup_dir: String,
        /// Field naming a record, used when scanning corrupt chunks
        #[arg(long, default_value = DEFAULT_FIELD_LABEL)]
        field: String,
        /// Leave input chunks in place
        #[arg(long)]
        no_archive: bool,
        /// Decode and plan only; write and move nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Reformat one JSON file for review, or scan it for names if it is corrupt
    Inspect {
        input: PathBuf,
        #[arg(long, default_value = DEFAULT_FIELD_LABEL)]
        field: String,
    },
    /// Write a BLAKE3 checksum manifest and report changes (exit status 1 if any)
    Manifest {
        dir: PathBuf,
        /// Manifest path (default: <dir>/checksums.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    match Cli::parse().command {

        // ── Run ──────────────────────────────────────────────────────────────
        Commands::Run { data_dir, first, last, shards, width, backup_dir, field, no_archive, dry_run } => {
            let opts = RepartitionOptions {
                data_dir,
                backup_dir_name: backup_dir,
                first_input:     first,
                last_input:      last,
                target_shards:   shards,
                min_width:       width,
                field_label:     field,
                archive_inputs:  !no_archive,
                dry_run,
            };
            let report = run(&opts)?;

            println!("Reading chunk files from {}", opts.data_dir.display());
            for r in &report.files {
                match &r.status {
                    FileStatus::Missing => {}
                    FileStatus::Ok { records, strategy } =>
                        println!("  ok      {:<24} {:>6} record(s)  ({})",
                            r.file.path.display(), records, strategy.name()),
                    FileStatus::Failed { reason, partial } => {
                        println!("  FAILED  {:<24} {}", r.file.path.display(), reason);
                        if let Some(p) = partial {
                            print_partial(p, "          ");
                        }
                    }
                }
            }
            println!("Total records collected: {}", report.total_records);

            if let Some(size) = report.shard_size {
                println!("Records per shard ({} target): {}", opts.target_shards, size);
            }
            if opts.dry_run {
                for (path, n) in &report.planned {
                    println!("  would write {:<28} {:>6} record(s)", path.display(), n);
                }
            }
            for s in &report.shards {
                match s {
                    ShardOutcome::Written { path, records } =>
                        println!("  wrote   {:<28} {:>6} record(s)", path.display(), records),
                    ShardOutcome::Failed { path, error } =>
                        println!("  FAILED  {:<28} {}", path.display(), error),
                }
            }
            for a in &report.archive {
                println!("  {a}");
            }
            if let Some(why) = report.archive_skipped {
                println!("Inputs not archived: {why}");
            }
            println!("{}", report.summary());
        }

        // ── Inspect ──────────────────────────────────────────────────────────
        Commands::Inspect { input, field } => {
            let extractor = PartialExtractor::new(&field)?;
            match inspect(&input, &extractor)? {
                Inspection::Parsed { entries, preview, artifact } => {
                    match entries {
                        Some(n) => println!("Parsed {} as JSON: {} entries", input.display(), n),
                        None    => println!("Parsed {} as JSON (not a list)", input.display()),
                    }
                    println!("Formatted copy: {}", artifact.display());
                    for (i, p) in preview.iter().enumerate() {
                        println!("  {}. {} ({})", i + 1, p.name, p.generic_name);
                    }
                    if let Some(n) = entries.filter(|&n| n > preview.len()) {
                        println!("  ... and {} more", n - preview.len());
                    }
                }
                Inspection::Corrupt { error, partial } => {
                    println!("JSON parsing failed: {error}");
                    print_partial(&partial, "  ");
                    println!("Total names found: {}", partial.names.len());
                }
            }
        }

        // ── Manifest ─────────────────────────────────────────────────────────
        Commands::Manifest { dir, output } => {
            let path = output.unwrap_or_else(|| dir.join(MANIFEST_NAME));
            let old  = Manifest::load(&path)?;
            let new  = manifest::generate(&dir)?;
            let diff = manifest::compare(old.as_ref(), &new);

            println!("Files          {}", new.total_files);
            println!("Total size     {:.2} MiB", new.total_size as f64 / 1024.0 / 1024.0);
            println!("Overall hash   {}", new.overall_hash);
            if diff.no_baseline {
                println!("No previous manifest; recording a new baseline");
            }
            if diff.has_changes() {
                println!("Changes:");
                for f in &diff.new_files     { println!("  + {f}"); }
                for f in &diff.changed_files { println!("  ~ {f}"); }
                for f in &diff.deleted_files { println!("  - {f}"); }
            } else {
                println!("No changes detected");
            }
            new.save(&path)?;
            println!("Saved: {}", path.display());
            if diff.has_changes() {
                return Ok(ExitCode::from(1));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn print_partial(p: &PartialExtract, indent: &str) {
    println!("{indent}Recovered {}", p.summary());
    for (i, name) in p.names.iter().take(NAMES_SHOWN).enumerate() {
        println!("{indent}  {}. {}", i + 1, name);
    }
    if p.names.len() > NAMES_SHOWN {
        println!("{indent}  ... and {} more", p.names.len() - NAMES_SHOWN);
    }
    println!("{indent}Last {} characters: {:?}", p.tail.chars().count(), p.tail);
}
