//! Batch-completion barrier
//!
//! The final reduction depends on every batch job having written its band
//! mosaics. Batch jobs run as independent processes, so the barrier polls
//! the batch directory for the expected file count, sleeping between
//! checks. The wait is bounded: a dead batch job surfaces as a typed
//! timeout instead of an infinite poll loop.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::RecoveryError;
use crate::io;

/// Polling parameters for the batch barrier.
#[derive(Debug, Clone, Copy)]
pub struct BarrierConfig {
    /// Sleep between directory polls
    pub poll_interval: Duration,
    /// Give up after this much total waiting
    pub max_wait: Duration,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Wait until `dir` holds at least `expected` files ending in `suffix`.
/// A missing directory counts as zero files, not an error, since the first
/// batch job may not have created it yet.
///
/// # Errors
/// Returns [`RecoveryError::BarrierTimeout`] when the expected count is
/// still not reached after `max_wait`.
pub fn await_batch_outputs(
    dir: &Path,
    suffix: &str,
    expected: usize,
    config: &BarrierConfig,
) -> Result<Vec<PathBuf>, RecoveryError> {
    let started = Instant::now();
    loop {
        let files = io::list_files_with_suffix(dir, suffix).unwrap_or_default();
        if files.len() >= expected {
            info!(found = files.len(), expected, "batch barrier released");
            return Ok(files);
        }

        let waited = started.elapsed();
        if waited >= config.max_wait {
            return Err(RecoveryError::BarrierTimeout {
                expected,
                found: files.len(),
                waited_secs: waited.as_secs(),
            });
        }
        debug!(
            found = files.len(),
            expected,
            waited_secs = waited.as_secs(),
            "batch outputs incomplete; sleeping"
        );
        std::thread::sleep(config.poll_interval.min(config.max_wait - waited));
    }
}
