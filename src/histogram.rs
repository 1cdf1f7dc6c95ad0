//! Histograms over time: a [`Series2D`] whose rows come from a bucket axis and
//! whose columns come from a time axis.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::axis::{self, BucketAxis, BucketKey, TimeAxis, TimeKey};
use crate::config::NormalizeConfig;
use crate::diagnostics::{DiagnosticSink, LookupMiss, MissedKey, NoopSink, report_miss};
use crate::error::{Result, SeriesError};
use crate::series2::{RowFill, Series2D};
use crate::stats::Statistics;

/// A bucket × time matrix bound to a bucket axis and a time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    matrix: Series2D,
    buckets: Option<Arc<BucketAxis>>,
    steps: Option<Arc<TimeAxis>>,
}

impl HistogramSeries {
    /// Creates a histogram with no axes bound.
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            matrix: Series2D::new(name, units),
            buckets: None,
            steps: None,
        }
    }

    /// Replaces the normalization settings.
    #[must_use]
    pub fn with_config(mut self, config: NormalizeConfig) -> Self {
        self.matrix = self.matrix.with_config(config);
        self
    }

    /// Binds both axes and allocates one row per bucket and one column per step.
    ///
    /// If either axis is empty no storage is allocated and every later
    /// registration is dropped as a lookup miss.
    pub fn bind_axes(&mut self, buckets: Arc<BucketAxis>, steps: Arc<TimeAxis>) -> Result<()> {
        if self.matrix.is_allocated() {
            return Err(SeriesError::AlreadyAllocated(self.name().to_string()));
        }
        if buckets.is_empty() || steps.is_empty() {
            #[cfg(feature = "logging")]
            log::warn!(
                "histogram '{}' bound to {} bucket(s) and {} step(s); nothing to allocate",
                self.name(),
                buckets.len(),
                steps.len()
            );
        } else {
            self.matrix.allocate(buckets.len(), steps.len())?;
        }
        self.buckets = Some(buckets);
        self.steps = Some(steps);
        Ok(())
    }

    /// Descriptive name.
    pub fn name(&self) -> &str {
        self.matrix.name()
    }

    /// Units of the values.
    pub fn units(&self) -> &str {
        self.matrix.units()
    }

    /// The underlying matrix.
    pub fn as_matrix(&self) -> &Series2D {
        &self.matrix
    }

    /// The bucket axis, if bound.
    pub fn bucket_axis(&self) -> Option<&Arc<BucketAxis>> {
        self.buckets.as_ref()
    }

    /// The time axis, if bound.
    pub fn time_axis(&self) -> Option<&Arc<TimeAxis>> {
        self.steps.as_ref()
    }

    /// Bucket keys in row order.
    pub fn bucket_keys(&self) -> &[BucketKey] {
        self.buckets.as_deref().map_or(&[][..], BucketAxis::keys)
    }

    /// Time keys in column order.
    pub fn time_keys(&self) -> &[TimeKey] {
        self.steps.as_deref().map_or(&[][..], TimeAxis::keys)
    }

    /// Row-major raw values.
    pub fn values(&self) -> &[f64] {
        self.matrix.values()
    }

    /// `(buckets, steps)`.
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }

    /// Value for `bucket` at `time`.
    pub fn get(&self, bucket: BucketKey, time: TimeKey) -> Option<f64> {
        let row = self.buckets.as_ref()?.index_of(bucket)?;
        let col = self.steps.as_ref()?.index_of(time)?;
        self.matrix.get(row, col)
    }

    /// Records `value` for `bucket` at `time`.
    ///
    /// Returns `true` if stored; an unknown bucket or time drops the sample.
    pub fn register(&mut self, bucket: BucketKey, time: TimeKey, value: f64) -> Result<bool> {
        self.register_with(bucket, time, value, &mut NoopSink)
    }

    /// Like [`register`](Self::register), reporting dropped samples to `sink`.
    ///
    /// When both keys are unknown the bucket is reported.
    pub fn register_with<S: DiagnosticSink + ?Sized>(
        &mut self,
        bucket: BucketKey,
        time: TimeKey,
        value: f64,
        sink: &mut S,
    ) -> Result<bool> {
        let (Some(buckets), Some(steps)) = (self.buckets.as_ref(), self.steps.as_ref()) else {
            return Err(SeriesError::AxisNotBound(self.name().to_string()));
        };
        let missed = match (buckets.index_of(bucket), steps.index_of(time)) {
            (Some(row), Some(col)) => {
                self.matrix.register(row, col, value)?;
                return Ok(true);
            }
            (None, _) => MissedKey::Bucket(bucket),
            (Some(_), None) => MissedKey::Time(time),
        };
        report_miss(
            sink,
            LookupMiss {
                series: self.name().to_string(),
                key: missed,
                value,
            },
        );
        Ok(false)
    }

    /// Interpolates every bucket row in time.
    pub fn interpolate(&mut self) -> Result<Vec<RowFill>> {
        let steps = Arc::clone(self.bound_steps()?);
        if !self.matrix.is_allocated() {
            return Ok(Vec::new());
        }
        self.matrix.interpolate_by(|col| steps.position(col))
    }

    /// Converts every bucket row to a per-second rate.
    pub fn differential(&mut self) -> Result<()> {
        let steps = Arc::clone(self.bound_steps()?);
        if !self.matrix.is_allocated() {
            return Ok(());
        }
        self.matrix.differential()?;
        self.matrix.divide_by(steps.deltas());
        Ok(())
    }

    /// One bucket's values over time.
    pub fn row(&self, bucket_index: usize) -> Result<&[f64]> {
        self.matrix.row(bucket_index)
    }

    /// The histogram at one time step.
    pub fn column(&self, time_index: usize) -> Result<Vec<f64>> {
        self.matrix.column(time_index)
    }

    /// Sum over time of each bucket.
    pub fn bucket_totals(&self) -> Vec<f64> {
        self.matrix.row_totals()
    }

    /// Statistics for one bucket over time.
    pub fn row_stats(&self, bucket_index: usize) -> Result<Statistics> {
        self.matrix.row_stats(bucket_index)
    }

    /// Number of histograms combined into this one.
    pub fn count(&self) -> u64 {
        self.matrix.count()
    }

    /// Builds the statistics snapshot over per-step totals.
    pub fn compute_stats(&mut self) -> Result<&Statistics> {
        self.matrix.compute_stats()
    }

    /// The statistics snapshot, if computed.
    pub fn stats(&self) -> Option<&Statistics> {
        self.matrix.stats()
    }

    /// Makes this histogram a copy of `other`, including its axes.
    pub fn copy_from(&mut self, other: &HistogramSeries) {
        self.matrix.copy_from(&other.matrix);
        self.buckets.clone_from(&other.buckets);
        self.steps.clone_from(&other.steps);
    }

    /// Count-weighted average of `other` into this histogram.
    ///
    /// Fails with [`SeriesError::AxisMismatch`] if either axis differs.
    pub fn merge(&mut self, other: &HistogramSeries) -> Result<()> {
        self.check_axes(other)?;
        self.matrix.merge(&other.matrix)?;
        self.adopt_axes(other);
        Ok(())
    }

    /// Slot-wise sum of `other` into this histogram.
    ///
    /// Fails with [`SeriesError::AxisMismatch`] if either axis differs.
    pub fn accumulate(&mut self, other: &HistogramSeries) -> Result<()> {
        self.check_axes(other)?;
        self.matrix.accumulate(&other.matrix)?;
        self.adopt_axes(other);
        Ok(())
    }

    /// Drops data, statistics and both axis bindings.
    pub fn clear(&mut self) {
        self.matrix.clear();
        self.buckets = None;
        self.steps = None;
    }

    /// One block per time step: the index, key and bucket values.
    pub fn show(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({}) count={} steps={}",
            self.name(),
            self.units(),
            self.count(),
            self.time_keys().len()
        );
        if !self.matrix.is_allocated() {
            return out;
        }
        for (col, key) in self.time_keys().iter().enumerate() {
            let _ = write!(out, "{col:>6} {key:>12}");
            for row in 0..self.bucket_keys().len() {
                match self.matrix.get(row, col) {
                    Some(value) => {
                        let _ = write!(out, " {value:.3}");
                    }
                    None => out.push_str(" -"),
                }
            }
            out.push('\n');
        }
        out
    }

    fn check_axes(&self, other: &HistogramSeries) -> Result<()> {
        axis::check_compatible(self.name(), self.buckets.as_ref(), other.buckets.as_ref())?;
        axis::check_compatible(self.name(), self.steps.as_ref(), other.steps.as_ref())
    }

    fn adopt_axes(&mut self, other: &HistogramSeries) {
        if self.buckets.is_none() {
            self.buckets.clone_from(&other.buckets);
        }
        if self.steps.is_none() {
            self.steps.clone_from(&other.steps);
        }
    }

    fn bound_steps(&self) -> Result<&Arc<TimeAxis>> {
        self.steps
            .as_ref()
            .ok_or_else(|| SeriesError::AxisNotBound(self.name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;

    fn assert_values_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    fn histogram(buckets: &[BucketKey], steps: &[TimeKey]) -> HistogramSeries {
        let mut hist = HistogramSeries::new("brw_rpc", "count");
        hist.bind_axes(
            BucketAxis::from_keys(buckets.iter().copied()).unwrap(),
            TimeAxis::from_keys(steps.iter().copied()).unwrap(),
        )
        .unwrap();
        hist
    }

    #[test]
    fn test_register_maps_both_keys() {
        let mut hist = histogram(&[4096, 1024], &[10, 0]);
        assert!(hist.register(4096, 10, 3.0).unwrap());
        assert_eq!(hist.bucket_keys(), &[1024, 4096]);
        assert_eq!(hist.time_keys(), &[0, 10]);
        assert_eq!(hist.as_matrix().get(1, 1), Some(3.0));
        assert_eq!(hist.get(4096, 10), Some(3.0));
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let mut hist = histogram(&[1, 2], &[0, 5]);
        let mut sink = CollectingSink::new();
        assert!(!hist.register_with(3, 0, 1.0, &mut sink).unwrap());
        assert!(!hist.register_with(1, 7, 1.0, &mut sink).unwrap());
        assert!(!hist.register_with(9, 9, 1.0, &mut sink).unwrap());
        let keys: Vec<_> = sink.drain().into_iter().map(|m| m.key).collect();
        assert_eq!(
            keys,
            vec![MissedKey::Bucket(3), MissedKey::Time(7), MissedKey::Bucket(9)]
        );
        assert_eq!(hist.as_matrix().absent_count(), 4);
    }

    #[test]
    fn test_register_unbound_fails() {
        let mut hist = HistogramSeries::new("brw_rpc", "count");
        assert!(matches!(
            hist.register(1, 0, 1.0),
            Err(SeriesError::AxisNotBound(_))
        ));
    }

    #[test]
    fn test_interpolate_weighted_by_time() {
        let mut hist = histogram(&[1, 2], &[0, 1, 4]);
        hist.register(1, 0, 0.0).unwrap();
        hist.register(1, 4, 8.0).unwrap();
        hist.register(2, 1, 5.0).unwrap();
        let outcome = hist.interpolate().unwrap();
        assert_eq!(outcome, vec![RowFill::Filled(1), RowFill::Filled(2)]);
        assert_values_close(hist.row(0).unwrap(), &[0.0, 2.0, 8.0]);
        assert_values_close(hist.row(1).unwrap(), &[5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_differential_divides_by_deltas() {
        let mut hist = histogram(&[1], &[0, 2, 6]);
        for (time, value) in [(0, 0.0), (2, 4.0), (6, 12.0)] {
            hist.register(1, time, value).unwrap();
        }
        hist.differential().unwrap();
        assert_values_close(hist.row(0).unwrap(), &[0.0, 2.0, 2.0]);
    }

    #[test]
    fn test_empty_axis_allocates_nothing() {
        let mut hist = histogram(&[], &[0, 1]);
        assert_eq!(hist.shape(), (0, 0));
        assert!(!hist.register(1, 0, 1.0).unwrap());
        assert!(hist.interpolate().unwrap().is_empty());
        hist.differential().unwrap();
    }

    #[test]
    fn test_bucket_totals_and_row_stats() {
        let mut hist = histogram(&[1, 2], &[0, 1]);
        hist.register(1, 0, 1.0).unwrap();
        hist.register(1, 1, 3.0).unwrap();
        hist.register(2, 0, 2.0).unwrap();
        hist.register(2, 1, 2.0).unwrap();
        assert_eq!(hist.bucket_totals(), vec![4.0, 4.0]);
        assert_eq!(hist.column(0).unwrap(), vec![1.0, 2.0]);
        assert_eq!(hist.row_stats(0).unwrap().max, 3.0);
        assert_eq!(hist.compute_stats().unwrap().total, 8.0);
    }

    #[test]
    fn test_accumulate_adopts_axes() {
        let mut part = histogram(&[1], &[0, 1]);
        part.register(1, 0, 1.0).unwrap();
        part.register(1, 1, 2.0).unwrap();
        part.compute_stats().unwrap();

        let mut total = HistogramSeries::new("all", "count");
        total.accumulate(&part).unwrap();
        total.accumulate(&part).unwrap();
        assert_eq!(total.values(), &[2.0, 4.0]);
        assert_eq!(total.bucket_keys(), &[1]);
        assert_eq!(total.count(), 2);
        assert!(total.show().contains("2.000"));
    }

    #[test]
    fn test_combine_rejects_foreign_axes() {
        let mut a = histogram(&[1, 2], &[0, 5]);
        a.register(1, 0, 1.0).unwrap();
        let same_shape = histogram(&[1, 2], &[100, 105]);
        let other_buckets = histogram(&[4, 8], &[0, 5]);

        let expected = Err(SeriesError::AxisMismatch(String::from("brw_rpc")));
        assert_eq!(a.accumulate(&same_shape), expected);
        assert_eq!(a.merge(&other_buckets), expected);
        assert_eq!(a.time_keys(), &[0, 5]);
        assert_eq!(a.values(), &[1.0, 0.0, 0.0, 0.0]);

        let twin = histogram(&[2, 1], &[5, 0]);
        a.accumulate(&twin).unwrap();
    }
}
