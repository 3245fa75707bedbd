//! Matched-group time-series statistics
//!
//! For every season, every matched group's NDVI distribution is summarized
//! under five pixel masks: all pixels, the three burn-severity classes, and
//! the undisturbed pixels the classifier compares against. Statistics are
//! long-format rows keyed by (season, group, mask); the undisturbed rows
//! carry the `lower` recovery threshold (median minus one population
//! standard deviation).

use chrono::NaiveDate;
use ndarray::Array3;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use crate::cube::FireDataCube;
use crate::error::RecoveryError;

/// Pixel mask a statistics row was computed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskCategory {
    /// Every pixel of the group
    All,
    /// Burn severity class 2
    LowSev,
    /// Burn severity class 3
    MedSev,
    /// Burn severity class 4
    HighSev,
    /// Unburned and never disturbed; the classifier's reference population
    Undisturbed,
}

impl MaskCategory {
    pub const ALL: [Self; 5] = [
        Self::All,
        Self::LowSev,
        Self::MedSev,
        Self::HighSev,
        Self::Undisturbed,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::LowSev => "low_severity",
            Self::MedSev => "medium_severity",
            Self::HighSev => "high_severity",
            Self::Undisturbed => "undisturbed",
        }
    }

    fn contains(self, severity: i8, dist_mask: i8) -> bool {
        match self {
            Self::All => true,
            Self::LowSev => severity == 2,
            Self::MedSev => severity == 3,
            Self::HighSev => severity == 4,
            Self::Undisturbed => severity == 0 && dist_mask == 0,
        }
    }
}

/// One (season, group, mask) statistics row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Season index on the cube's time axis
    pub time: usize,
    /// Season date
    pub date: NaiveDate,
    /// Refined matched-group id
    pub group: i32,
    pub category: MaskCategory,
    /// Valid, nonzero observations behind the row
    pub count: usize,
    pub mean: f32,
    /// Population standard deviation
    pub std: f32,
    pub p10: f32,
    pub median: f32,
    pub p90: f32,
    /// Recovery threshold: median minus one standard deviation
    pub lower: f32,
    pub upper: f32,
}

/// Long-format statistics table with an index over the undisturbed rows.
#[derive(Debug, Clone, Default)]
pub struct SummaryTable {
    rows: Vec<SummaryRow>,
    undisturbed: FxHashMap<(usize, i32), usize>,
}

impl SummaryTable {
    #[must_use]
    pub fn rows(&self) -> &[SummaryRow] {
        &self.rows
    }

    /// The undisturbed reference row for a (season, group) pair, when that
    /// group had any undisturbed observations that season.
    #[must_use]
    pub fn undisturbed_row(&self, time: usize, group: i32) -> Option<&SummaryRow> {
        self.undisturbed.get(&(time, group)).map(|&i| &self.rows[i])
    }

    /// Write the table as CSV.
    ///
    /// # Errors
    /// Fails when the file cannot be created or written.
    pub fn write_csv(&self, path: &Path) -> Result<(), RecoveryError> {
        let file = File::create(path).map_err(|e| RecoveryError::io(path, e))?;
        let mut out = BufWriter::new(file);
        writeln!(
            out,
            "date,group,category,count,mean,std,p10,median,p90,lower,upper"
        )
        .map_err(|e| RecoveryError::io(path, e))?;
        for r in &self.rows {
            writeln!(
                out,
                "{},{},{},{},{},{},{},{},{},{},{}",
                r.date,
                r.group,
                r.category.label(),
                r.count,
                r.mean,
                r.std,
                r.p10,
                r.median,
                r.p90,
                r.lower,
                r.upper
            )
            .map_err(|e| RecoveryError::io(path, e))?;
        }
        Ok(())
    }
}

fn quantile_sorted(sorted: &[f32], q: f64) -> f32 {
    let last = sorted.len() - 1;
    let rank = q * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let w = (rank - lo as f64) as f32;
        sorted[lo] + (sorted[hi] - sorted[lo]) * w
    }
}

fn summarize(
    time: usize,
    date: NaiveDate,
    group: i32,
    category: MaskCategory,
    values: &mut Vec<f32>,
) -> Option<SummaryRow> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f32::total_cmp);
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    let std = var.sqrt();
    let median = quantile_sorted(values, 0.5);
    // exact zeros do not count toward the matched-pixel minimum
    let count = values.iter().filter(|v| **v != 0.0).count();
    Some(SummaryRow {
        time,
        date,
        group,
        category,
        count,
        mean,
        std,
        p10: quantile_sorted(values, 0.1),
        median,
        p90: quantile_sorted(values, 0.9),
        lower: median - std,
        upper: median + std,
    })
}

/// Compute the full statistics table for a cube. Seasons are independent
/// and processed in parallel; rows with no observations are dropped.
#[must_use]
pub fn compute(cube: &FireDataCube) -> SummaryTable {
    let (t, rows, cols) = cube.shape();
    let ndvi: &Array3<f32> = &cube.ndvi;

    let per_season: Vec<Vec<SummaryRow>> = (0..t)
        .into_par_iter()
        .map(|time| {
            let date = cube.axis.date(time);
            // bucket valid observations by (group, category)
            let mut buckets: FxHashMap<(i32, MaskCategory), Vec<f32>> = FxHashMap::default();
            for row in 0..rows {
                for col in 0..cols {
                    let group = cube.groups[[row, col]];
                    if group <= 0 {
                        continue;
                    }
                    let v = ndvi[[time, row, col]];
                    if v.is_nan() {
                        continue;
                    }
                    let severity = cube.severity[[row, col]];
                    let dist = cube.dist_mask[[row, col]];
                    for category in MaskCategory::ALL {
                        if category.contains(severity, dist) {
                            buckets.entry((group, category)).or_default().push(v);
                        }
                    }
                }
            }

            let mut out: Vec<SummaryRow> = buckets
                .into_iter()
                .filter_map(|((group, category), mut values)| {
                    summarize(time, date, group, category, &mut values)
                })
                .collect();
            let order = |c: MaskCategory| MaskCategory::ALL.iter().position(|k| *k == c);
            out.sort_by(|a, b| {
                a.group
                    .cmp(&b.group)
                    .then_with(|| order(a.category).cmp(&order(b.category)))
            });
            out
        })
        .collect();

    let rows: Vec<SummaryRow> = per_season.into_iter().flatten().collect();
    let mut undisturbed = FxHashMap::default();
    for (i, r) in rows.iter().enumerate() {
        if r.category == MaskCategory::Undisturbed {
            undisturbed.insert((r.time, r.group), i);
        }
    }
    debug!(fire = %cube.fire.prefix(), rows = rows.len(), "statistics table built");
    SummaryTable { rows, undisturbed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::testutil::synthetic_cube;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn cube_with_reference() -> FireDataCube {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(2, 2, 3, start);
        // left column burned high severity, middle medium, right undisturbed
        for row in 0..2 {
            cube.severity[[row, 0]] = 4;
            cube.severity[[row, 1]] = 3;
            cube.severity[[row, 2]] = 0;
        }
        for t in 0..2 {
            for row in 0..2 {
                cube.ndvi[[t, row, 0]] = 0.2;
                cube.ndvi[[t, row, 1]] = 0.5;
                cube.ndvi[[t, row, 2]] = 0.8;
            }
        }
        cube
    }

    #[test]
    fn test_rows_split_by_mask_category() {
        let cube = cube_with_reference();
        let table = compute(&cube);

        // no low-severity pixels, so 4 categories per season
        assert_eq!(table.rows().len(), 2 * 4);
        assert!(table
            .rows()
            .iter()
            .all(|r| r.category != MaskCategory::LowSev));

        let all = table
            .rows()
            .iter()
            .find(|r| r.time == 0 && r.category == MaskCategory::All)
            .unwrap();
        assert_eq!(all.count, 6);
        assert_relative_eq!(all.median, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_undisturbed_lower_is_median_minus_std() {
        let cube = cube_with_reference();
        let table = compute(&cube);

        let row = table.undisturbed_row(0, 11_050).unwrap();
        assert_eq!(row.count, 2);
        // constant 0.8 population: std 0, lower == median
        assert_relative_eq!(row.median, 0.8, epsilon = 1e-6);
        assert_relative_eq!(row.std, 0.0, epsilon = 1e-6);
        assert_relative_eq!(row.lower, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_values_do_not_count_as_matched() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(1, 1, 3, start);
        cube.severity.fill(0);
        cube.ndvi[[0, 0, 0]] = 0.0;
        cube.ndvi[[0, 0, 1]] = 0.4;
        cube.ndvi[[0, 0, 2]] = f32::NAN;

        let table = compute(&cube);
        let row = table.undisturbed_row(0, 11_050).unwrap();
        // the exact zero is summarized but not counted
        assert_eq!(row.count, 1);
        assert_relative_eq!(row.median, 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_group_rows_are_dropped() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let mut cube = synthetic_cube(1, 1, 1, start);
        cube.ndvi.fill(f32::NAN);
        let table = compute(&cube);
        assert!(table.rows().is_empty());
        assert!(table.undisturbed_row(0, 11_050).is_none());
    }
}
