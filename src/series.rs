//! Bounded one-dimensional series with a presence mask.
//!
//! A [`Series`] is a fixed-length array of optional observations. Storage is
//! allocated once, values are registered by index, and gaps are closed by
//! [`interpolate`](Series::interpolate) before the array is differenced or
//! summarized.

use crate::config::NormalizeConfig;
use crate::error::{Result, SeriesError};
use crate::stats::Statistics;

/// A fixed-length array of optional values.
///
/// Absent slots hold `0.0` in the raw array; always consult the mask through
/// [`is_present`](Self::is_present) or [`get`](Self::get) before interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    name: String,
    units: String,
    config: NormalizeConfig,
    allocated: bool,
    values: Vec<f64>,
    present: Vec<bool>,
    count: u64,
    stats: Option<Statistics>,
}

impl Series {
    /// Creates an unallocated series.
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            config: NormalizeConfig::default(),
            allocated: false,
            values: Vec::new(),
            present: Vec::new(),
            count: 0,
            stats: None,
        }
    }

    /// Replaces the normalization settings.
    #[must_use]
    pub fn with_config(mut self, config: NormalizeConfig) -> Self {
        self.config = config;
        self
    }

    /// Descriptive name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Units of the values.
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Normalization settings in effect.
    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    /// Returns `true` once storage exists.
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Creates `length` absent slots.
    pub fn allocate(&mut self, length: usize) -> Result<()> {
        if self.allocated {
            return Err(SeriesError::AlreadyAllocated(self.name.clone()));
        }
        self.values = vec![0.0; length];
        self.present = vec![false; length];
        self.allocated = true;
        Ok(())
    }

    /// Drops storage, count and statistics, returning to the unallocated state.
    pub fn clear(&mut self) {
        self.allocated = false;
        self.values.clear();
        self.present.clear();
        self.count = 0;
        self.stats = None;
    }

    /// Writes `value` at `index` and marks it present. Last write wins.
    pub fn register(&mut self, index: usize, value: f64) -> Result<()> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        if index >= self.values.len() {
            return Err(SeriesError::IndexOutOfBounds {
                index,
                length: self.values.len(),
            });
        }
        self.values[index] = value;
        self.present[index] = true;
        Ok(())
    }

    /// Value at `index`, or `None` if absent or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self.present.get(index) {
            Some(true) => Some(self.values[index]),
            _ => None,
        }
    }

    /// Returns `true` if `index` holds an observation.
    pub fn is_present(&self, index: usize) -> bool {
        self.present.get(index).copied().unwrap_or(false)
    }

    /// Number of absent slots.
    pub fn absent_count(&self) -> usize {
        self.present.iter().filter(|p| !**p).count()
    }

    /// Indices of absent slots, ascending.
    pub fn absent_indices(&self) -> Vec<usize> {
        self.present
            .iter()
            .enumerate()
            .filter_map(|(i, p)| (!p).then_some(i))
            .collect()
    }

    /// Raw value array. Absent slots read as `0.0`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// The presence mask.
    pub fn mask(&self) -> &[bool] {
        &self.present
    }

    /// Number of series combined into this one.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Overrides the combination count.
    pub fn set_count(&mut self, count: u64) {
        self.count = count;
    }

    /// The statistics snapshot, if computed.
    pub fn stats(&self) -> Option<&Statistics> {
        self.stats.as_ref()
    }

    /// Largest value according to the statistics, or `0.0` without them.
    pub fn max(&self) -> f64 {
        self.stats.map_or(0.0, |s| s.max)
    }

    /// Fills every absent slot, weighting interior gaps by slot position.
    ///
    /// Returns the number of slots that were filled. Calling it again is a no-op.
    #[allow(clippy::cast_precision_loss)]
    pub fn interpolate(&mut self) -> Result<usize> {
        self.interpolate_by(|index| index as f64)
    }

    /// Fills every absent slot using `position` to weight interior gaps.
    ///
    /// Leading absent slots take the first observation, trailing ones the last.
    /// A slot `j` inside a gap bounded by `before` and `after` becomes
    /// `v[before] + (pos(j) - pos(before)) / (pos(after) - pos(before)) * (v[after] - v[before])`.
    /// A series with no observation at all is filled with the configured
    /// `empty_fill` value.
    pub(crate) fn interpolate_by(&mut self, position: impl Fn(usize) -> f64) -> Result<usize> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        let filled = fill_gaps(&mut self.values, &mut self.present, &position);
        let filled = match filled {
            Some(filled) => filled,
            None => {
                self.values.fill(self.config.empty_fill);
                self.present.fill(true);
                self.values.len()
            }
        };
        if let Some(index) = self.present.iter().position(|p| !p) {
            return Err(SeriesError::UnfilledSlot {
                series: self.name.clone(),
                index,
            });
        }
        Ok(filled)
    }

    /// Replaces the values with their first difference; slot 0 becomes `0.0`.
    ///
    /// Fails if any slot is still absent.
    pub fn differential(&mut self) -> Result<()> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        let absent = self.absent_count();
        if absent > 0 {
            return Err(SeriesError::AbsentSlots {
                series: self.name.clone(),
                count: absent,
            });
        }
        difference_in_place(&mut self.values);
        Ok(())
    }

    /// Divides every slot but the first by the matching delta.
    pub(crate) fn divide_by(&mut self, deltas: &[f64]) {
        for (value, delta) in self.values.iter_mut().skip(1).zip(deltas) {
            *value /= delta;
        }
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Makes this series a copy of `other`'s data, count and statistics.
    ///
    /// Name, units and settings are kept.
    pub fn copy_from(&mut self, other: &Series) {
        self.allocated = other.allocated;
        self.values.clone_from(&other.values);
        self.present.clone_from(&other.present);
        self.count = other.count;
        self.stats = other.stats;
    }

    /// Combines `other` into this series as a count-weighted average.
    ///
    /// For every slot present in `other`:
    /// `self[i] = (self.count * self[i] + other.count * other[i]) / (self.count + other.count)`.
    /// A slot absent here takes `other`'s value. A zero count carries no weight,
    /// so a series never passed through [`compute_stats`](Self::compute_stats)
    /// yields to the other side. Two zero counts average unweighted.
    /// An unallocated series simply becomes a copy of `other`.
    pub fn merge(&mut self, other: &Series) -> Result<()> {
        if !self.allocated {
            self.copy_from(other);
            return Ok(());
        }
        self.check_shape(other)?;
        let (wa, wb) = merge_weights(self.count, other.count);
        for i in 0..self.values.len() {
            if !other.present[i] {
                continue;
            }
            if self.present[i] {
                self.values[i] = (wa * self.values[i] + wb * other.values[i]) / (wa + wb);
            } else {
                self.values[i] = other.values[i];
                self.present[i] = true;
            }
        }
        self.count += other.count;
        self.stats = None;
        Ok(())
    }

    /// Adds `other` into this series slot by slot and sums the counts.
    ///
    /// Used to build totals from per-server series. An unallocated series
    /// becomes a copy of `other`.
    pub fn accumulate(&mut self, other: &Series) -> Result<()> {
        if !self.allocated {
            self.copy_from(other);
            return Ok(());
        }
        self.check_shape(other)?;
        for i in 0..self.values.len() {
            if !other.present[i] {
                continue;
            }
            if self.present[i] {
                self.values[i] += other.values[i];
            } else {
                self.values[i] = other.values[i];
                self.present[i] = true;
            }
        }
        self.count += other.count;
        self.stats = None;
        Ok(())
    }

    /// Builds the statistics snapshot and sets the count to 1.
    ///
    /// From then on the series can be combined into aggregates.
    pub fn compute_stats(&mut self) -> Result<&Statistics> {
        self.refresh_stats()?;
        self.count = 1;
        Ok(&*self.stats.get_or_insert_with(Statistics::default))
    }

    /// Rebuilds the statistics snapshot without touching the count.
    pub fn refresh_stats(&mut self) -> Result<&Statistics> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        let observed: Vec<f64> = self
            .values
            .iter()
            .zip(&self.present)
            .filter_map(|(v, p)| p.then_some(*v))
            .collect();
        Ok(&*self.stats.insert(Statistics::from_values(&observed)))
    }

    fn check_shape(&self, other: &Series) -> Result<()> {
        if other.values.len() != self.values.len() {
            return Err(SeriesError::ShapeMismatch {
                expected: (1, self.values.len()),
                found: (1, other.values.len()),
            });
        }
        Ok(())
    }
}

/// Closes the gaps in one row of values.
///
/// Returns the number of slots filled, or `None` if the row has no observation.
pub(crate) fn fill_gaps(
    values: &mut [f64],
    present: &mut [bool],
    position: &impl Fn(usize) -> f64,
) -> Option<usize> {
    let len = values.len();
    if len == 0 {
        return Some(0);
    }
    let first = present.iter().position(|p| *p)?;
    let last = present.iter().rposition(|p| *p)?;
    let mut filled = 0;

    for i in 0..first {
        values[i] = values[first];
        present[i] = true;
        filled += 1;
    }
    for i in last + 1..len {
        values[i] = values[last];
        present[i] = true;
        filled += 1;
    }

    let mut before = first;
    let mut i = first + 1;
    while i <= last {
        if present[i] {
            before = i;
            i += 1;
            continue;
        }
        let mut after = i;
        while !present[after] {
            after += 1;
        }
        #[cfg(feature = "logging")]
        log::trace!("interpolating gap {}..{} between {before} and {after}", i, after);

        let span = position(after) - position(before);
        let rise = values[after] - values[before];
        for j in i..after {
            let frac = (position(j) - position(before)) / span;
            values[j] = values[before] + frac * rise;
            present[j] = true;
            filled += 1;
        }
        before = after;
        i = after + 1;
    }
    Some(filled)
}

/// Weights for a count-weighted merge. Two zero counts weigh equally.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn merge_weights(a: u64, b: u64) -> (f64, f64) {
    if a == 0 && b == 0 {
        (1.0, 1.0)
    } else {
        (a as f64, b as f64)
    }
}

/// First difference in place with slot 0 set to zero.
pub(crate) fn difference_in_place(values: &mut [f64]) {
    for i in (1..values.len()).rev() {
        values[i] -= values[i - 1];
    }
    if let Some(first) = values.first_mut() {
        *first = 0.0;
    }
}
