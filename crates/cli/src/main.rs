use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use tracing::{error, info};

use fire_recovery_core::core_types::fire::{load_manifest, FireManifest};
use fire_recovery_core::merge::{self, BarrierConfig, NUM_BANDS};
use fire_recovery_core::pipeline;
use fire_recovery_core::RecoveryParams;

/// Post-fire vegetation recovery pipeline and statewide merge.
#[derive(Parser, Debug)]
#[command(name = "fire-recovery")]
#[command(about = "Detect post-fire vegetation recovery and merge results statewide")]
struct Args {
    /// Run manifest JSON (fire id -> metadata and paths)
    #[arg(long)]
    manifest: PathBuf,

    /// Pipeline parameters JSON; defaults used when omitted
    #[arg(long)]
    params: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the per-fire pipeline for every fire in the manifest
    RunFires {
        /// Number of fires processed in parallel (0 = all cores)
        #[arg(short, long, default_value_t = 0)]
        jobs: usize,
    },
    /// Merge one contiguous UID range of processed fires into batch mosaics
    MergeBatch {
        /// Statewide template raster defining the mosaic grid
        #[arg(long)]
        template: PathBuf,
        /// First UID of this batch (inclusive)
        #[arg(long)]
        uid_start: u32,
        /// Last UID of this batch (inclusive)
        #[arg(long)]
        uid_end: u32,
        /// Directory receiving the per-band batch mosaics
        #[arg(long)]
        out_dir: PathBuf,
    },
    /// Wait for all batch mosaics, then reduce them into the final output
    MergeFinal {
        /// Directory holding every batch's per-band mosaics
        #[arg(long)]
        batch_dir: PathBuf,
        /// Number of batch jobs to wait for
        #[arg(long)]
        batches: usize,
        /// Seconds between barrier polls
        #[arg(long, default_value_t = 30)]
        poll_secs: u64,
        /// Give up after this many seconds of waiting
        #[arg(long, default_value_t = 86_400)]
        max_wait_secs: u64,
        /// Path of the final multi-band mosaic
        #[arg(long)]
        output: PathBuf,
    },
}

fn run_fires(fires: &[&FireManifest], params: &RecoveryParams, jobs: usize) -> Result<()> {
    if jobs > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("failed to configure worker pool")?;
    }

    let failures: usize = fires
        .par_iter()
        .map(|fire| match pipeline::process_fire(fire, params) {
            Ok(report) => usize::from(!report.is_complete()),
            Err(e) => {
                error!(fire = %fire.metadata.prefix(), error = %e, "fire failed; skipping");
                1
            }
        })
        .sum();

    info!(
        fires = fires.len(),
        failures, "per-fire processing finished"
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let params = match &args.params {
        Some(path) => RecoveryParams::load(path)
            .with_context(|| format!("loading params from {}", path.display()))?,
        None => RecoveryParams::default(),
    };
    let manifest = load_manifest(&args.manifest)
        .with_context(|| format!("loading manifest from {}", args.manifest.display()))?;

    match args.command {
        Command::RunFires { jobs } => {
            let fires: Vec<&FireManifest> = manifest.values().collect();
            run_fires(&fires, &params, jobs)?;
        }
        Command::MergeBatch {
            template,
            uid_start,
            uid_end,
            out_dir,
        } => {
            let fires = merge::assign_uids(&manifest);
            let written =
                merge::merge_batch(&fires, &template, uid_start, uid_end, &out_dir, &params)
                    .context("batch merge failed")?;
            info!(files = written.len(), "batch mosaics written");
        }
        Command::MergeFinal {
            batch_dir,
            batches,
            poll_secs,
            max_wait_secs,
            output,
        } => {
            let barrier = BarrierConfig {
                poll_interval: Duration::from_secs(poll_secs),
                max_wait: Duration::from_secs(max_wait_secs),
            };
            merge::await_batch_outputs(&batch_dir, ".tif", batches * NUM_BANDS, &barrier)
                .context("waiting for batch outputs")?;
            let merged = merge::final_reduction(&batch_dir).context("final reduction failed")?;
            merged
                .write_multiband(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            info!(output = %output.display(), "statewide mosaic written");
        }
    }
    Ok(())
}
