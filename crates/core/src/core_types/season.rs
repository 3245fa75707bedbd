//! Seasonal time axis
//!
//! The recovery series advances in fixed quarterly steps. Each seasonal
//! raster file name starts with `YYYYS` where `S` is the season number
//! (1-4); the season maps to a nominal month through
//! [`RecoveryParams::month_for_season`] so that dates can be compared with
//! ignition dates and QA windows.

use chrono::NaiveDate;
use std::ops::Range;

use crate::core_types::config::RecoveryParams;

/// Sorted seasonal time axis for one fire's data cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonalAxis {
    dates: Vec<NaiveDate>,
}

impl SeasonalAxis {
    /// Build an axis from unordered dates. Dates are sorted ascending; the
    /// caller is responsible for keeping its layers in the same order.
    #[must_use]
    pub fn new(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort_unstable();
        Self { dates }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    #[must_use]
    pub fn date(&self, index: usize) -> NaiveDate {
        self.dates[index]
    }

    /// Index range of all dates in `[start, end]` (inclusive on both ends,
    /// mirroring a label-based time slice).
    #[must_use]
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Range<usize> {
        let lo = self.dates.partition_point(|d| *d < start);
        let hi = self.dates.partition_point(|d| *d <= end);
        lo..hi.max(lo)
    }

    /// Index range of all dates on or after `start` (ignition forward).
    #[must_use]
    pub fn from_date(&self, start: NaiveDate) -> Range<usize> {
        self.dates.partition_point(|d| *d < start)..self.dates.len()
    }
}

/// Parse `YYYYS` from the leading token of a seasonal raster file name
/// (e.g. `19923_ndvi_seasonal.tif` → 1992, season 3). Returns the nominal
/// date of that season, or `None` when the name does not match.
#[must_use]
pub fn parse_seasonal_filename(file_name: &str, params: &RecoveryParams) -> Option<NaiveDate> {
    let token = file_name.split('_').next()?;
    if token.len() != 5 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = token[..4].parse().ok()?;
    let season: u32 = token[4..].parse().ok()?;
    let month = params.month_for_season(season)?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_axis_sorts_and_windows() {
        let axis = SeasonalAxis::new(vec![date(1995, 7), date(1994, 1), date(1994, 10)]);
        assert_eq!(axis.dates(), &[date(1994, 1), date(1994, 10), date(1995, 7)]);

        // inclusive on both ends
        let w = axis.window(date(1994, 1), date(1994, 10));
        assert_eq!(w, 0..2);

        let post = axis.from_date(date(1994, 6));
        assert_eq!(post, 1..3);
    }

    #[test]
    fn test_window_outside_axis_is_empty() {
        let axis = SeasonalAxis::new(vec![date(1994, 1)]);
        assert!(axis.window(date(2000, 1), date(2001, 1)).is_empty());
    }

    #[test]
    fn test_parse_seasonal_filename() {
        let params = RecoveryParams::default();
        let parsed = parse_seasonal_filename("19923_ndvi_seasonal.tif", &params).unwrap();
        assert_eq!(parsed, date(1992, 7));

        assert!(parse_seasonal_filename("notaseason.tif", &params).is_none());
        assert!(parse_seasonal_filename("19925_bad_season.tif", &params).is_none());
    }
}
