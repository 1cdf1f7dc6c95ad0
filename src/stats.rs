//! Summary statistics over a finished value array.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeriesError};

/// Immutable snapshot of a series' distribution.
///
/// Computed once from a gap-free array. The only way to change it afterwards is
/// [`merge`](Self::merge), which copies another snapshot verbatim.
///
/// # Fields
///
/// - `total`: sum of all values
/// - `max`: largest value
/// - `mean`: `total / samples`
/// - `stdev`: population standard deviation
/// - `above`: number of values strictly greater than the mean
/// - `total_above`: sum of those values
/// - `total_above_frac`: `total_above / total`, or `0.0` when `total <= 0`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of values the snapshot was computed from.
    pub samples: usize,
    /// Sum of all values.
    pub total: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub stdev: f64,
    /// Count of values above the mean.
    pub above: usize,
    /// Sum of values above the mean.
    pub total_above: f64,
    /// `total_above` as a fraction of `total`.
    pub total_above_frac: f64,
}

impl Statistics {
    /// Computes the snapshot. An empty slice yields all zeros.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let total: f64 = values.iter().sum();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = total / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut above = 0;
        let mut total_above = 0.0;
        for &v in values {
            if v > mean {
                above += 1;
                total_above += v;
            }
        }
        let total_above_frac = if total > 0.0 { total_above / total } else { 0.0 };

        Self {
            samples: values.len(),
            total,
            max,
            mean,
            stdev: variance.sqrt(),
            above,
            total_above,
            total_above_frac,
        }
    }

    /// Overwrites this snapshot with `other`.
    ///
    /// This is a copy, not a recombination of two distributions.
    pub fn merge(&mut self, other: Option<&Statistics>) -> Result<()> {
        let other = other.ok_or(SeriesError::MissingStatistics)?;
        *self = *other;
        Ok(())
    }

    /// Fraction of samples above the mean.
    #[allow(clippy::cast_precision_loss)]
    pub fn above_frac(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.above as f64 / self.samples as f64
        }
    }

    /// Multi-line dump of every field.
    pub fn show(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "total      = {:.6}", self.total);
        let _ = writeln!(out, "max        = {:.6}", self.max);
        let _ = writeln!(out, "ave        = {:.6}", self.mean);
        let _ = writeln!(out, "stdev      = {:.6}", self.stdev);
        let _ = writeln!(out, "above      = {}", self.above);
        let _ = writeln!(out, "totAbv     = {:.6}", self.total_above);
        let _ = writeln!(out, "totAbvFrac = {:.6}", self.total_above_frac);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_from_values() {
        let stats = Statistics::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.samples, 8);
        assert_eq!(stats.total, 40.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.stdev, 2.0);
        assert_eq!(stats.above, 2);
        assert_eq!(stats.total_above, 16.0);
        assert_eq!(stats.total_above_frac, 0.4);
        assert_eq!(stats.above_frac(), 0.25);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = Statistics::from_values(&[]);
        assert_eq!(stats, Statistics::default());
        assert_eq!(stats.above_frac(), 0.0);
    }

    #[test]
    fn test_statistics_non_positive_total() {
        let stats = Statistics::from_values(&[-1.0, 1.0, -2.0]);
        assert!(stats.total < 0.0);
        assert_eq!(stats.total_above_frac, 0.0);
        assert_eq!(stats.above, 1);
    }

    #[test]
    fn test_statistics_merge_copies() {
        let source = Statistics::from_values(&[1.0, 2.0, 3.0]);
        let mut target = Statistics::from_values(&[10.0]);
        target.merge(Some(&source)).unwrap();
        assert_eq!(target, source);
    }

    #[test]
    fn test_statistics_merge_absent_fails() {
        let mut target = Statistics::from_values(&[10.0]);
        assert_eq!(target.merge(None), Err(SeriesError::MissingStatistics));
        assert_eq!(target.max, 10.0);
    }

    #[test]
    fn test_statistics_show() {
        let shown = Statistics::from_values(&[1.0, 3.0]).show();
        assert!(shown.contains("max        = 3.000000"));
        assert_eq!(shown.lines().count(), 7);
    }
}
