//! Per-fire export reports

use std::path::PathBuf;
use tracing::warn;

use crate::error::RecoveryError;

/// Outcome of exporting one band.
#[derive(Debug)]
pub struct BandOutcome {
    pub band: String,
    pub outcome: Result<PathBuf, RecoveryError>,
}

/// Collected band outcomes for one fire's export pass.
#[derive(Debug)]
pub struct ExportReport {
    fire: String,
    outcomes: Vec<BandOutcome>,
}

impl ExportReport {
    #[must_use]
    pub fn new(fire: impl Into<String>) -> Self {
        Self {
            fire: fire.into(),
            outcomes: Vec::new(),
        }
    }

    /// Record one band's outcome; failures are logged immediately with the
    /// offending band name.
    pub fn record(&mut self, band: &str, outcome: Result<PathBuf, RecoveryError>) {
        if let Err(e) = &outcome {
            warn!(fire = %self.fire, band, error = %e, "band export failed");
        }
        self.outcomes.push(BandOutcome {
            band: band.to_string(),
            outcome,
        });
    }

    #[must_use]
    pub fn fire(&self) -> &str {
        &self.fire
    }

    #[must_use]
    pub fn outcomes(&self) -> &[BandOutcome] {
        &self.outcomes
    }

    /// Number of bands that exported successfully.
    #[must_use]
    pub fn exported(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_ok()).count()
    }

    /// Bands that failed to export.
    pub fn failures(&self) -> impl Iterator<Item = &BandOutcome> {
        self.outcomes.iter().filter(|o| o.outcome.is_err())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_tracks_failures_independently() {
        let mut report = ExportReport::new("FIRE_x");
        report.record("severity", Ok(PathBuf::from("/tmp/severity.tif")));
        report.record(
            "groups",
            Err(RecoveryError::BandExport {
                band: "groups".to_string(),
                reason: "shape mismatch".to_string(),
            }),
        );
        report.record("dist_mask", Ok(PathBuf::from("/tmp/dist_mask.tif")));

        assert_eq!(report.exported(), 2);
        assert!(!report.is_complete());
        let failed: Vec<&str> = report.failures().map(|o| o.band.as_str()).collect();
        assert_eq!(failed, vec!["groups"]);
    }
}
