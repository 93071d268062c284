//! its-bkg-study - offline ITS/ZDC background anomaly study
//!
//! # Usage
//!
//! ```bash
//! # Resolved chunks (ChunkInput JSON), records to stdout
//! its-bkg-study chunk_0001.json chunk_0002.json > records.jsonl
//!
//! # Raw chunks with pattern ids, resolved against a shape dictionary
//! its-bkg-study --dictionary dict.json --output records.jsonl raw_*.json
//!
//! # Dump the built-in configuration as a starting point
//! its-bkg-study --print-default-config > study_config.toml
//! ```
//!
//! # Environment Variables
//!
//! - `ITS_BKG_CONFIG`: path to the study config (when `--config` is not given)
//! - `ITS_BKG_LOG_JSON`: emit logs as JSON
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{bail, Context, Result};
use clap::Parser;
use its_bkg_study::acquisition::{load_chunk, load_dictionary};
use its_bkg_study::{process_in_batches, ChunkProcessor, JsonLinesSink, RunTotals, StudyConfig};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{error, info};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "its-bkg-study")]
#[command(about = "Correlates ITS cluster frames with ZDC background tags")]
#[command(version)]
struct CliArgs {
    /// Study config TOML (default: $ITS_BKG_CONFIG, then ./study_config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Shape dictionary JSON. When given, chunk files are read as raw chunks
    /// with pattern ids.
    #[arg(short, long)]
    dictionary: Option<PathBuf>,

    /// Output file for JSON-lines records (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the built-in configuration as TOML and exit
    #[arg(long)]
    print_default_config: bool,

    /// Emit logs as JSON
    #[arg(long, env = "ITS_BKG_LOG_JSON")]
    log_json: bool,

    /// Worker threads for chunk processing (default: one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Chunk files, processed independently
    #[arg(required_unless_present = "print_default_config")]
    chunks: Vec<PathBuf>,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    if args.print_default_config {
        print!("{}", StudyConfig::default().to_toml()?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => StudyConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StudyConfig::load(),
    };
    info!(
        study = %config.study.name,
        acceptance_min = config.tagging.acceptance_min,
        acceptance_max = config.tagging.acceptance_max,
        roi_chip_bound = config.geometry.roi_chip_bound,
        "Study configuration ready"
    );

    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring worker pool")?;
    }

    let processor = ChunkProcessor::new(&config)?;

    let dictionary = match &args.dictionary {
        Some(path) => {
            let dict = load_dictionary(path)?;
            info!(path = %path.display(), entries = dict.len(), "Loaded shape dictionary");
            Some(dict)
        }
        None => None,
    };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };
    let mut sink = JsonLinesSink::new(writer);
    let mut totals = RunTotals::default();
    let mut failed = 0usize;

    // One batch per worker: a batch is written out before the next is loaded.
    let batch_size = rayon::current_num_threads();
    process_in_batches(
        &processor,
        &args.chunks,
        batch_size,
        |path| load_chunk(path, dictionary.as_ref()),
        |path, result| -> Result<()> {
            // A chunk that fails to load is dropped whole; the others still run.
            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Chunk rejected");
                    failed += 1;
                    return Ok(());
                }
            };
            output
                .emit(&mut sink)
                .with_context(|| format!("writing records of {}", path.display()))?;
            let c = &output.summary.counters;
            info!(
                path = %path.display(),
                frames = c.frames,
                chip_records = c.chip_records,
                tagged_frames = c.tagged_frames_any,
                any_anomaly = c.any_anomaly,
                any_anomaly_tagged = c.any_anomaly_tagged,
                strobe_length = output.summary.strobe_length,
                "Chunk done"
            );
            totals.absorb(&output.summary);
            Ok(())
        },
    )?;

    info!(
        chunks = totals.counters.chunks,
        frames = totals.counters.frames,
        lines = sink.lines_written(),
        tagged_frames = totals.counters.tagged_frames_any,
        any_anomaly = totals.counters.any_anomaly,
        dead_zone_anomaly = totals.counters.dead_zone_anomaly,
        warnings = totals.warnings,
        "Run complete"
    );

    if failed > 0 {
        bail!("{failed} of {} chunks failed to load", args.chunks.len());
    }
    Ok(())
}
