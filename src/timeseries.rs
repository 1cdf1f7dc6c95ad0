//! Series whose index space is supplied by an axis.
//!
//! [`IndexedSeries`] wraps a [`Series`] together with a shared reference to the
//! [`Axis`] it was sized against. Values are registered by key instead of index,
//! and interior gaps are weighted by key position, so unevenly spaced time keys
//! interpolate correctly in time rather than in slot count.

use std::fmt::Write as _;
use std::sync::Arc;

use crate::axis::{self, Axis, AxisKey, TimeKey};
use crate::config::NormalizeConfig;
use crate::diagnostics::{DiagnosticSink, LookupMiss, NoopSink, report_miss};
use crate::error::{Result, SeriesError};
use crate::series::Series;
use crate::stats::Statistics;

/// A [`Series`] bound to an axis of keys.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSeries<K: AxisKey> {
    series: Series,
    axis: Option<Arc<Axis<K>>>,
}

/// A series over the time axis.
pub type TimeSeries = IndexedSeries<TimeKey>;

impl<K: AxisKey> IndexedSeries<K> {
    /// Creates a series with no axis bound.
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            series: Series::new(name, units),
            axis: None,
        }
    }

    /// Replaces the normalization settings.
    #[must_use]
    pub fn with_config(mut self, config: NormalizeConfig) -> Self {
        self.series = self.series.with_config(config);
        self
    }

    /// Binds the axis and allocates one slot per key.
    ///
    /// An axis with no keys leaves the series empty; that is not an error.
    pub fn bind_axis(&mut self, axis: Arc<Axis<K>>) -> Result<()> {
        if self.series.is_allocated() {
            return Err(SeriesError::AlreadyAllocated(self.series.name().to_string()));
        }
        if axis.is_empty() {
            #[cfg(feature = "logging")]
            log::warn!("series '{}' bound to an axis with no keys", self.series.name());
        } else {
            self.series.allocate(axis.len())?;
        }
        self.axis = Some(axis);
        Ok(())
    }

    /// The bound axis.
    pub fn axis(&self) -> Option<&Arc<Axis<K>>> {
        self.axis.as_ref()
    }

    /// The underlying positional series.
    pub fn as_series(&self) -> &Series {
        &self.series
    }

    pub(crate) fn series_mut(&mut self) -> &mut Series {
        &mut self.series
    }

    /// Descriptive name.
    pub fn name(&self) -> &str {
        self.series.name()
    }

    /// Units of the values.
    pub fn units(&self) -> &str {
        self.series.units()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Returns `true` if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Raw value array.
    pub fn values(&self) -> &[f64] {
        self.series.values()
    }

    /// Keys of the bound axis, empty if none is bound.
    pub fn keys(&self) -> &[K] {
        self.axis.as_deref().map_or(&[][..], Axis::keys)
    }

    /// Value registered (or interpolated) for `key`.
    pub fn get(&self, key: K) -> Option<f64> {
        let index = self.axis.as_ref()?.index_of(key)?;
        self.series.get(index)
    }

    /// `(key, value)` pairs for present slots, in key order.
    pub fn points(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.keys()
            .iter()
            .enumerate()
            .filter_map(|(index, key)| self.series.get(index).map(|v| (*key, v)))
    }

    /// Number of series combined into this one.
    pub fn count(&self) -> u64 {
        self.series.count()
    }

    /// The statistics snapshot, if computed.
    pub fn stats(&self) -> Option<&Statistics> {
        self.series.stats()
    }

    /// Registers `value` at `key`, dropping it if the key is not on the axis.
    ///
    /// Returns `true` if the value was stored.
    pub fn register(&mut self, key: K, value: f64) -> Result<bool> {
        self.register_with(key, value, &mut NoopSink)
    }

    /// Like [`register`](Self::register), reporting dropped samples to `sink`.
    pub fn register_with<S: DiagnosticSink + ?Sized>(
        &mut self,
        key: K,
        value: f64,
        sink: &mut S,
    ) -> Result<bool> {
        let axis = self
            .axis
            .as_ref()
            .ok_or_else(|| SeriesError::AxisNotBound(self.series.name().to_string()))?;
        match axis.index_of(key) {
            Some(index) => {
                self.series.register(index, value)?;
                Ok(true)
            }
            None => {
                report_miss(
                    sink,
                    LookupMiss {
                        series: self.series.name().to_string(),
                        key: key.missed(),
                        value,
                    },
                );
                Ok(false)
            }
        }
    }

    /// Fills every absent slot, weighting interior gaps by key position.
    pub fn interpolate(&mut self) -> Result<usize> {
        let axis = Arc::clone(self.bound_axis()?);
        if axis.is_empty() {
            return Ok(0);
        }
        self.series.interpolate_by(|index| axis.position(index))
    }

    /// Makes this series a copy of `other`, including its axis binding.
    pub fn copy_from(&mut self, other: &IndexedSeries<K>) {
        self.series.copy_from(&other.series);
        self.axis.clone_from(&other.axis);
    }

    /// Count-weighted average of `other` into this series. See [`Series::merge`].
    ///
    /// Fails with [`SeriesError::AxisMismatch`] if both are bound to different keys.
    pub fn merge(&mut self, other: &IndexedSeries<K>) -> Result<()> {
        self.check_axis(other)?;
        self.series.merge(&other.series)?;
        self.adopt_axis(other);
        Ok(())
    }

    /// Slot-wise sum of `other` into this series. See [`Series::accumulate`].
    ///
    /// Fails with [`SeriesError::AxisMismatch`] if both are bound to different keys.
    pub fn accumulate(&mut self, other: &IndexedSeries<K>) -> Result<()> {
        self.check_axis(other)?;
        self.series.accumulate(&other.series)?;
        self.adopt_axis(other);
        Ok(())
    }

    fn check_axis(&self, other: &IndexedSeries<K>) -> Result<()> {
        axis::check_compatible(self.series.name(), self.axis.as_ref(), other.axis.as_ref())
    }

    fn adopt_axis(&mut self, other: &IndexedSeries<K>) {
        if self.axis.is_none() {
            self.axis.clone_from(&other.axis);
        }
    }

    /// Builds the statistics snapshot and sets the count to 1.
    pub fn compute_stats(&mut self) -> Result<&Statistics> {
        self.series.compute_stats()
    }

    /// Rebuilds the statistics snapshot without touching the count.
    pub fn refresh_stats(&mut self) -> Result<&Statistics> {
        self.series.refresh_stats()
    }

    /// Drops data, statistics and the axis binding.
    pub fn clear(&mut self) {
        self.series.clear();
        self.axis = None;
    }

    /// One line per slot: index, key and value (`-` when absent).
    pub fn show(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({}) count={} steps={}",
            self.name(),
            self.units(),
            self.count(),
            self.len()
        );
        for (index, key) in self.keys().iter().enumerate() {
            match self.series.get(index) {
                Some(value) => {
                    let _ = writeln!(out, "{index:>6} {key:>12} {value:>16.6}");
                }
                None => {
                    let _ = writeln!(out, "{index:>6} {key:>12} {:>16}", "-");
                }
            }
        }
        if let Some(stats) = self.stats() {
            out.push_str(&stats.show());
        }
        out
    }

    fn bound_axis(&self) -> Result<&Arc<Axis<K>>> {
        self.axis
            .as_ref()
            .ok_or_else(|| SeriesError::AxisNotBound(self.series.name().to_string()))
    }
}

impl IndexedSeries<TimeKey> {
    /// Converts the values into a per-second rate.
    ///
    /// Takes the first difference (slot 0 becomes `0.0`), then divides every other
    /// slot by the elapsed time since the previous key. Fails if any slot is absent.
    pub fn differential(&mut self) -> Result<()> {
        let axis = Arc::clone(self.bound_axis()?);
        if axis.is_empty() {
            return Ok(());
        }
        self.series.differential()?;
        self.series.divide_by(axis.deltas());
        Ok(())
    }
}
