//! Rate series derived from monotonically increasing counters.
//!
//! A [`CounterSeries`] takes raw cumulative readings, and turns them into a
//! per-second rate the moment it is interpolated. A reading that is lower than
//! its predecessor is treated as a counter reset: the slot is recorded in
//! [`resets`](CounterSeries::resets) and its rate is zero instead of negative.

use std::sync::Arc;

use crate::axis::{TimeAxis, TimeKey};
use crate::config::NormalizeConfig;
use crate::diagnostics::{DiagnosticSink, NoopSink};
use crate::error::{Result, SeriesError};
use crate::series::difference_in_place;
use crate::stats::Statistics;
use crate::timeseries::TimeSeries;

/// Lifecycle of a [`CounterSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// No axis bound yet.
    Unbound,
    /// Storage exists, nothing registered.
    Allocated,
    /// At least one reading registered.
    Registering,
    /// Interpolated and converted to a rate. Read-only from here on.
    Differentiated,
}

/// A [`TimeSeries`] of counter readings that differentiates itself on interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSeries {
    inner: TimeSeries,
    state: CounterState,
    missing: Vec<usize>,
    resets: Vec<usize>,
    weight: f64,
}

impl CounterSeries {
    /// Creates an unbound counter with weight 1.
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            inner: TimeSeries::new(name, units),
            state: CounterState::Unbound,
            missing: Vec::new(),
            resets: Vec::new(),
            weight: 1.0,
        }
    }

    /// Replaces the normalization settings.
    #[must_use]
    pub fn with_config(mut self, config: NormalizeConfig) -> Self {
        self.inner = self.inner.with_config(config);
        self
    }

    /// Binds the time axis and allocates storage.
    pub fn bind_axis(&mut self, axis: Arc<TimeAxis>) -> Result<()> {
        self.inner.bind_axis(axis)?;
        self.state = CounterState::Allocated;
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CounterState {
        self.state
    }

    /// The rate series (or raw readings, before interpolation).
    pub fn as_time_series(&self) -> &TimeSeries {
        &self.inner
    }

    /// Descriptive name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Raw readings before interpolation, rates afterwards.
    pub fn values(&self) -> &[f64] {
        self.inner.values()
    }

    /// Keys of the bound axis.
    pub fn time_keys(&self) -> &[TimeKey] {
        self.inner.keys()
    }

    /// Records a raw reading at `key`.
    pub fn register(&mut self, key: TimeKey, value: f64) -> Result<bool> {
        self.register_with(key, value, &mut NoopSink)
    }

    /// Records a raw reading, reporting unknown keys to `sink`.
    pub fn register_with<S: DiagnosticSink + ?Sized>(
        &mut self,
        key: TimeKey,
        value: f64,
        sink: &mut S,
    ) -> Result<bool> {
        if self.state == CounterState::Differentiated {
            return Err(SeriesError::CounterClosed(self.name().to_string()));
        }
        let stored = self.inner.register_with(key, value, sink)?;
        if stored {
            self.state = CounterState::Registering;
        }
        Ok(stored)
    }

    /// Fills gaps, then converts the readings to a per-second rate.
    ///
    /// Slots absent before filling are remembered in [`missing`](Self::missing).
    /// Slots whose raw difference is negative are remembered in
    /// [`resets`](Self::resets) and set to zero before the division by elapsed time.
    /// A second call does nothing and returns `Ok(0)`.
    pub fn interpolate(&mut self) -> Result<usize> {
        match self.state {
            CounterState::Unbound => {
                return Err(SeriesError::AxisNotBound(self.name().to_string()));
            }
            CounterState::Differentiated => return Ok(0),
            CounterState::Allocated | CounterState::Registering => {}
        }
        let axis = match self.inner.axis() {
            Some(axis) => Arc::clone(axis),
            None => return Err(SeriesError::AxisNotBound(self.name().to_string())),
        };
        if axis.is_empty() {
            self.state = CounterState::Differentiated;
            return Ok(0);
        }

        self.missing = self.inner.as_series().absent_indices();
        let filled = self.inner.interpolate()?;

        let series = self.inner.series_mut();
        difference_in_place(series.values_mut());
        self.resets.clear();
        for (index, value) in series.values_mut().iter_mut().enumerate() {
            if *value < 0.0 {
                self.resets.push(index);
                *value = 0.0;
            }
        }
        series.divide_by(axis.deltas());

        #[cfg(feature = "logging")]
        if !self.resets.is_empty() {
            log::debug!(
                "counter '{}' reset at {} slot(s): {:?}",
                self.name(),
                self.resets.len(),
                self.resets
            );
        }

        self.state = CounterState::Differentiated;
        Ok(filled)
    }

    /// Always fails. The rate conversion happens in [`interpolate`](Self::interpolate);
    /// the error says whether that has happened yet.
    pub fn differential(&mut self) -> Result<()> {
        let name = self.name().to_string();
        Err(match self.state {
            CounterState::Unbound => SeriesError::AxisNotBound(name),
            CounterState::Allocated | CounterState::Registering => {
                SeriesError::NotInterpolated(name)
            }
            CounterState::Differentiated => SeriesError::AlreadyDifferentiated(name),
        })
    }

    /// Indices that had no reading before interpolation.
    pub fn missing(&self) -> &[usize] {
        &self.missing
    }

    /// Number of indices that had no reading.
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Indices where the counter went backwards.
    pub fn resets(&self) -> &[usize] {
        &self.resets
    }

    /// Number of resets detected.
    pub fn reset_count(&self) -> usize {
        self.resets.len()
    }

    /// Caller-assigned weight used when combining operation counters.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Sets the combination weight.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Values scaled by [`weight`](Self::weight).
    pub fn weighted_values(&self) -> Vec<f64> {
        self.values().iter().map(|v| v * self.weight).collect()
    }

    /// Adds another counter's rates into this one. See [`crate::Series::accumulate`].
    ///
    /// Both counters must be in the same state. An unbound counter adopts the
    /// state of the first counter accumulated into it.
    pub fn accumulate(&mut self, other: &CounterSeries) -> Result<()> {
        if self.state != CounterState::Unbound && self.state != other.state {
            return Err(SeriesError::CounterStateMismatch {
                counter: self.name().to_string(),
                other: other.name().to_string(),
            });
        }
        self.inner.accumulate(&other.inner)?;
        self.state = other.state;
        Ok(())
    }

    /// Builds the statistics snapshot over the rates.
    pub fn compute_stats(&mut self) -> Result<&Statistics> {
        self.inner.compute_stats()
    }

    /// The statistics snapshot, if computed.
    pub fn stats(&self) -> Option<&Statistics> {
        self.inner.stats()
    }

    /// Returns the counter to the unbound state.
    pub fn clear(&mut self) {
        self.inner.clear();
        self.missing.clear();
        self.resets.clear();
        self.state = CounterState::Unbound;
    }

    /// One line per slot. See [`TimeSeries::show`].
    pub fn show(&self) -> String {
        self.inner.show()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_values_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    fn bound(keys: &[TimeKey]) -> CounterSeries {
        let mut counter = CounterSeries::new("bytes", "bytes/sec");
        counter
            .bind_axis(TimeAxis::from_keys(keys.iter().copied()).unwrap())
            .unwrap();
        counter
    }

    #[test]
    fn test_counter_reset_suppressed() {
        let mut counter = bound(&[0, 5, 10, 15]);
        for (key, value) in [(0, 100.0), (5, 105.0), (10, 80.0), (15, 95.0)] {
            counter.register(key, value).unwrap();
        }
        counter.interpolate().unwrap();
        assert_eq!(counter.resets(), &[2]);
        assert_values_close(counter.values(), &[0.0, 1.0, 0.0, 3.0]);
        assert_eq!(counter.state(), CounterState::Differentiated);
    }

    #[test]
    fn test_counter_missing_snapshot() {
        let mut counter = bound(&[0, 10, 20, 30]);
        counter.register(0, 0.0).unwrap();
        counter.register(30, 300.0).unwrap();
        counter.interpolate().unwrap();
        assert_eq!(counter.missing(), &[1, 2]);
        assert_eq!(counter.missing_count(), 2);
        assert_eq!(counter.reset_count(), 0);
        assert_values_close(counter.values(), &[0.0, 10.0, 10.0, 10.0]);
    }

    #[test]
    fn test_counter_uneven_deltas() {
        let mut counter = bound(&[0, 2, 12]);
        for (key, value) in [(0, 0.0), (2, 20.0), (12, 70.0)] {
            counter.register(key, value).unwrap();
        }
        counter.interpolate().unwrap();
        assert_values_close(counter.values(), &[0.0, 10.0, 5.0]);
    }

    #[test]
    fn test_counter_second_differential_rejected() {
        let mut counter = bound(&[0, 5]);
        counter.register(0, 1.0).unwrap();
        counter.register(5, 2.0).unwrap();
        counter.interpolate().unwrap();
        assert!(matches!(
            counter.differential(),
            Err(SeriesError::AlreadyDifferentiated(_))
        ));
        let before = counter.values().to_vec();
        assert_eq!(counter.interpolate().unwrap(), 0);
        assert_eq!(counter.values(), before.as_slice());
    }

    #[test]
    fn test_counter_differential_before_interpolate() {
        let mut counter = CounterSeries::new("ops", "ops/sec");
        assert!(matches!(
            counter.differential(),
            Err(SeriesError::AxisNotBound(_))
        ));

        let mut counter = bound(&[0, 5]);
        assert!(matches!(
            counter.differential(),
            Err(SeriesError::NotInterpolated(_))
        ));
        counter.register(0, 1.0).unwrap();
        assert!(matches!(
            counter.differential(),
            Err(SeriesError::NotInterpolated(_))
        ));
    }

    #[test]
    fn test_counter_closed_after_interpolate() {
        let mut counter = bound(&[0, 5]);
        counter.register(0, 1.0).unwrap();
        counter.interpolate().unwrap();
        assert!(matches!(
            counter.register(5, 2.0),
            Err(SeriesError::CounterClosed(_))
        ));
    }

    #[test]
    fn test_counter_state_transitions() {
        let mut counter = CounterSeries::new("ops", "ops/sec");
        assert_eq!(counter.state(), CounterState::Unbound);
        assert!(counter.interpolate().is_err());

        counter
            .bind_axis(TimeAxis::from_keys([0, 1]).unwrap())
            .unwrap();
        assert_eq!(counter.state(), CounterState::Allocated);
        assert!(!counter.register(7, 1.0).unwrap());
        assert_eq!(counter.state(), CounterState::Allocated);
        counter.register(1, 1.0).unwrap();
        assert_eq!(counter.state(), CounterState::Registering);

        counter.clear();
        assert_eq!(counter.state(), CounterState::Unbound);
        assert!(counter.is_empty());
    }

    #[test]
    fn test_counter_empty_axis() {
        let mut counter = bound(&[]);
        assert_eq!(counter.interpolate().unwrap(), 0);
        assert!(counter.values().is_empty());
    }

    #[test]
    fn test_weighted_values() {
        let mut counter = bound(&[0, 1]);
        counter.register(0, 0.0).unwrap();
        counter.register(1, 4.0).unwrap();
        counter.interpolate().unwrap();
        counter.set_weight(0.5);
        assert_eq!(counter.weight(), 0.5);
        assert_eq!(counter.weighted_values(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_accumulate_counters() {
        let axis = TimeAxis::from_keys([0, 1]).unwrap();
        let mut a = CounterSeries::new("ost0", "bytes/sec");
        a.bind_axis(Arc::clone(&axis)).unwrap();
        a.register(0, 0.0).unwrap();
        a.register(1, 3.0).unwrap();
        a.interpolate().unwrap();
        a.compute_stats().unwrap();

        let mut b = CounterSeries::new("ost1", "bytes/sec");
        b.bind_axis(axis).unwrap();
        b.register(0, 0.0).unwrap();
        b.register(1, 5.0).unwrap();
        b.interpolate().unwrap();
        b.compute_stats().unwrap();

        let mut total = CounterSeries::new("total", "bytes/sec");
        total.accumulate(&a).unwrap();
        total.accumulate(&b).unwrap();
        assert_eq!(total.values(), &[0.0, 8.0]);
        assert_eq!(total.as_time_series().count(), 2);
        assert_eq!(total.state(), CounterState::Differentiated);
    }

    #[test]
    fn test_accumulate_rejects_mixed_states() {
        let axis = TimeAxis::from_keys([0, 10, 20]).unwrap();
        let mut total = CounterSeries::new("total", "bytes/sec");
        total.bind_axis(Arc::clone(&axis)).unwrap();
        total.register(0, 0.0).unwrap();
        total.register(10, 0.0).unwrap();
        total.register(20, 0.0).unwrap();

        let mut done = CounterSeries::new("ost0", "bytes/sec");
        done.bind_axis(axis).unwrap();
        for (key, value) in [(0, 0.0), (10, 100.0), (20, 300.0)] {
            done.register(key, value).unwrap();
        }
        done.interpolate().unwrap();
        assert_values_close(done.values(), &[0.0, 10.0, 20.0]);

        assert_eq!(
            total.accumulate(&done),
            Err(SeriesError::CounterStateMismatch {
                counter: String::from("total"),
                other: String::from("ost0"),
            })
        );
        assert_eq!(total.values(), &[0.0, 0.0, 0.0]);
        assert_eq!(total.state(), CounterState::Registering);

        let mut copy = CounterSeries::new("copy", "bytes/sec");
        copy.accumulate(&done).unwrap();
        assert_eq!(copy.state(), CounterState::Differentiated);
        assert_values_close(copy.values(), &[0.0, 10.0, 20.0]);
    }
}
