//! Bounded two-dimensional series: one row per bucket, one column per time step.
//!
//! Every row is an independent 1-D problem. Interpolation and differencing run
//! row by row over the same column positions, so a row with no observations at
//! all does not disturb its neighbours.

use crate::config::{EmptyRowPolicy, NormalizeConfig};
use crate::error::{Result, SeriesError};
use crate::series::{difference_in_place, fill_gaps, merge_weights};
use crate::stats::Statistics;

/// Outcome of interpolating one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFill {
    /// The row had observations; this many slots were filled.
    Filled(usize),
    /// The row had no observation and was left absent.
    Empty,
}

/// A `rows × cols` matrix of optional values, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Series2D {
    name: String,
    units: String,
    config: NormalizeConfig,
    allocated: bool,
    rows: usize,
    cols: usize,
    values: Vec<f64>,
    present: Vec<bool>,
    count: u64,
    stats: Option<Statistics>,
}

impl Series2D {
    /// Creates an unallocated matrix.
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            config: NormalizeConfig::default(),
            allocated: false,
            rows: 0,
            cols: 0,
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

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Creates `rows × cols` absent slots.
    pub fn allocate(&mut self, rows: usize, cols: usize) -> Result<()> {
        if self.allocated {
            return Err(SeriesError::AlreadyAllocated(self.name.clone()));
        }
        self.rows = rows;
        self.cols = cols;
        self.values = vec![0.0; rows * cols];
        self.present = vec![false; rows * cols];
        self.allocated = true;
        Ok(())
    }

    /// Drops storage, count and statistics.
    pub fn clear(&mut self) {
        self.allocated = false;
        self.rows = 0;
        self.cols = 0;
        self.values.clear();
        self.present.clear();
        self.count = 0;
        self.stats = None;
    }

    /// Writes `value` at `(row, col)`. Last write wins.
    pub fn register(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let offset = self.offset(row, col)?;
        self.values[offset] = value;
        self.present[offset] = true;
        Ok(())
    }

    /// Value at `(row, col)`, or `None` if absent or out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let offset = row * self.cols + col;
        self.present[offset].then(|| self.values[offset])
    }

    /// Number of absent slots across all rows.
    pub fn absent_count(&self) -> usize {
        self.present.iter().filter(|p| !**p).count()
    }

    /// Row-major raw values. Absent slots read as `0.0`.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// One row's raw values.
    pub fn row(&self, row: usize) -> Result<&[f64]> {
        if row >= self.rows {
            return Err(SeriesError::IndexOutOfBounds {
                index: row,
                length: self.rows,
            });
        }
        Ok(&self.values[row * self.cols..(row + 1) * self.cols])
    }

    /// One column's raw values, top row first.
    pub fn column(&self, col: usize) -> Result<Vec<f64>> {
        if col >= self.cols {
            return Err(SeriesError::IndexOutOfBounds {
                index: col,
                length: self.cols,
            });
        }
        Ok(self.values.iter().skip(col).step_by(self.cols).copied().collect())
    }

    /// Sum of present values in each row.
    pub fn row_totals(&self) -> Vec<f64> {
        self.row_chunks()
            .map(|(values, present)| {
                values
                    .iter()
                    .zip(present)
                    .filter_map(|(v, p)| p.then_some(*v))
                    .sum()
            })
            .collect()
    }

    /// Sum of present values in each column.
    pub fn column_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.cols];
        for (values, present) in self.row_chunks() {
            for (col, total) in totals.iter_mut().enumerate() {
                if present[col] {
                    *total += values[col];
                }
            }
        }
        totals
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

    /// Interpolates every row over slot positions.
    #[allow(clippy::cast_precision_loss)]
    pub fn interpolate(&mut self) -> Result<Vec<RowFill>> {
        self.interpolate_by(|col| col as f64)
    }

    /// Interpolates every row, weighting gaps by `position(col)`.
    ///
    /// A row with no observation follows [`NormalizeConfig::empty_row_policy`].
    pub(crate) fn interpolate_by(&mut self, position: impl Fn(usize) -> f64) -> Result<Vec<RowFill>> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        let cols = self.cols;
        let mut outcome = Vec::with_capacity(self.rows);
        if cols == 0 {
            outcome.resize(self.rows, RowFill::Filled(0));
            return Ok(outcome);
        }
        for (row, (values, present)) in self
            .values
            .chunks_mut(cols)
            .zip(self.present.chunks_mut(cols))
            .enumerate()
        {
            match fill_gaps(values, present, &position) {
                Some(filled) => {
                    if let Some(col) = present.iter().position(|p| !p) {
                        return Err(SeriesError::UnfilledSlot {
                            series: self.name.clone(),
                            index: row * cols + col,
                        });
                    }
                    outcome.push(RowFill::Filled(filled));
                }
                None => match self.config.empty_row_policy {
                    EmptyRowPolicy::Leave => {
                        #[cfg(feature = "logging")]
                        log::warn!("series '{}' row {row} has no values to interpolate", self.name);
                        outcome.push(RowFill::Empty);
                    }
                    EmptyRowPolicy::Fill => {
                        values.fill(self.config.empty_fill);
                        present.fill(true);
                        outcome.push(RowFill::Filled(cols));
                    }
                },
            }
        }
        Ok(outcome)
    }

    /// Replaces every row with its first difference; column 0 becomes `0.0`.
    ///
    /// Fails if any slot is absent, including rows left empty by interpolation.
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
        if self.cols == 0 {
            return Ok(());
        }
        for row in self.values.chunks_mut(self.cols) {
            difference_in_place(row);
        }
        Ok(())
    }

    /// Divides every column but the first by the matching delta, in every row.
    pub(crate) fn divide_by(&mut self, deltas: &[f64]) {
        if self.cols == 0 {
            return;
        }
        for row in self.values.chunks_mut(self.cols) {
            for (value, delta) in row.iter_mut().skip(1).zip(deltas) {
                *value /= delta;
            }
        }
    }

    /// Makes this matrix a copy of `other`'s data, count and statistics.
    pub fn copy_from(&mut self, other: &Series2D) {
        self.allocated = other.allocated;
        self.rows = other.rows;
        self.cols = other.cols;
        self.values.clone_from(&other.values);
        self.present.clone_from(&other.present);
        self.count = other.count;
        self.stats = other.stats;
    }

    /// Count-weighted average of `other` into this matrix, slot by slot.
    ///
    /// Same rules as [`crate::Series::merge`].
    pub fn merge(&mut self, other: &Series2D) -> Result<()> {
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

    /// Adds `other` into this matrix slot by slot and sums the counts.
    pub fn accumulate(&mut self, other: &Series2D) -> Result<()> {
        if !self.allocated {
            self.copy_from(other);
            return Ok(());
        }
        self.check_shape(other)?;
        for ((value, present), (other_value, other_present)) in self
            .values
            .iter_mut()
            .zip(self.present.iter_mut())
            .zip(other.values.iter().zip(&other.present))
        {
            if !other_present {
                continue;
            }
            if *present {
                *value += other_value;
            } else {
                *value = *other_value;
                *present = true;
            }
        }
        self.count += other.count;
        self.stats = None;
        Ok(())
    }

    /// Statistics over one row's present values.
    pub fn row_stats(&self, row: usize) -> Result<Statistics> {
        if row >= self.rows {
            return Err(SeriesError::IndexOutOfBounds {
                index: row,
                length: self.rows,
            });
        }
        let span = row * self.cols..(row + 1) * self.cols;
        let observed: Vec<f64> = self.values[span.clone()]
            .iter()
            .zip(&self.present[span])
            .filter_map(|(v, p)| p.then_some(*v))
            .collect();
        Ok(Statistics::from_values(&observed))
    }

    /// Builds the statistics snapshot over the column totals and sets the count to 1.
    pub fn compute_stats(&mut self) -> Result<&Statistics> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        let totals = self.column_totals();
        self.count = 1;
        Ok(&*self.stats.insert(Statistics::from_values(&totals)))
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if !self.allocated {
            return Err(SeriesError::NotAllocated(self.name.clone()));
        }
        if row >= self.rows {
            return Err(SeriesError::IndexOutOfBounds {
                index: row,
                length: self.rows,
            });
        }
        if col >= self.cols {
            return Err(SeriesError::IndexOutOfBounds {
                index: col,
                length: self.cols,
            });
        }
        Ok(row * self.cols + col)
    }

    fn row_chunks(&self) -> impl Iterator<Item = (&[f64], &[bool])> {
        let cols = self.cols.max(1);
        self.values.chunks(cols).zip(self.present.chunks(cols))
    }

    fn check_shape(&self, other: &Series2D) -> Result<()> {
        if other.shape() != self.shape() {
            return Err(SeriesError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocated(rows: usize, cols: usize) -> Series2D {
        let mut series = Series2D::new("hist", "count");
        series.allocate(rows, cols).unwrap();
        series
    }

    #[test]
    fn test_register_bounds() {
        let mut series = allocated(2, 3);
        series.register(1, 2, 4.0).unwrap();
        assert_eq!(series.get(1, 2), Some(4.0));
        assert_eq!(
            series.register(2, 0, 1.0),
            Err(SeriesError::IndexOutOfBounds { index: 2, length: 2 })
        );
        assert_eq!(
            series.register(0, 3, 1.0),
            Err(SeriesError::IndexOutOfBounds { index: 3, length: 3 })
        );
    }

    #[test]
    fn test_register_before_allocate_fails() {
        let mut series = Series2D::new("hist", "count");
        assert!(matches!(
            series.register(0, 0, 1.0),
            Err(SeriesError::NotAllocated(_))
        ));
    }

    #[test]
    fn test_rows_interpolate_independently() {
        let mut series = allocated(3, 4);
        series.register(0, 0, 1.0).unwrap();
        series.register(0, 3, 4.0).unwrap();
        series.register(2, 1, 9.0).unwrap();

        let outcome = series.interpolate().unwrap();
        assert_eq!(outcome, vec![RowFill::Filled(2), RowFill::Empty, RowFill::Filled(3)]);
        assert_eq!(series.row(0).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.row(2).unwrap(), &[9.0; 4]);
        assert_eq!(series.get(1, 0), None);
        assert_eq!(series.absent_count(), 4);
    }

    #[test]
    fn test_empty_row_blocks_differential() {
        let mut series = allocated(2, 2);
        series.register(0, 0, 1.0).unwrap();
        series.interpolate().unwrap();
        assert!(matches!(
            series.differential(),
            Err(SeriesError::AbsentSlots { count: 2, .. })
        ));
    }

    #[test]
    fn test_fill_policy_fills_empty_rows() {
        let config = NormalizeConfig::builder()
            .empty_row_policy(EmptyRowPolicy::Fill)
            .build()
            .unwrap();
        let mut series = Series2D::new("hist", "count").with_config(config);
        series.allocate(2, 3).unwrap();
        series.register(0, 1, 5.0).unwrap();
        let outcome = series.interpolate().unwrap();
        assert_eq!(outcome, vec![RowFill::Filled(2), RowFill::Filled(3)]);
        assert_eq!(series.row(1).unwrap(), &[0.0; 3]);
        series.differential().unwrap();
        assert_eq!(series.values(), &[0.0; 6]);
    }

    #[test]
    fn test_differential_per_row() {
        let mut series = allocated(2, 3);
        for (col, v) in [1.0, 2.0, 4.0].into_iter().enumerate() {
            series.register(0, col, v).unwrap();
        }
        for (col, v) in [10.0, 7.0, 7.0].into_iter().enumerate() {
            series.register(1, col, v).unwrap();
        }
        series.differential().unwrap();
        assert_eq!(series.row(0).unwrap(), &[0.0, 1.0, 2.0]);
        assert_eq!(series.row(1).unwrap(), &[0.0, -3.0, 0.0]);
    }

    #[test]
    fn test_column_and_totals() {
        let mut series = allocated(2, 2);
        series.register(0, 0, 1.0).unwrap();
        series.register(0, 1, 2.0).unwrap();
        series.register(1, 0, 3.0).unwrap();
        series.register(1, 1, 4.0).unwrap();
        assert_eq!(series.column(1).unwrap(), vec![2.0, 4.0]);
        assert_eq!(series.row_totals(), vec![3.0, 7.0]);
        assert_eq!(series.column_totals(), vec![4.0, 6.0]);
        assert!(series.column(2).is_err());

        let stats = series.row_stats(1).unwrap();
        assert_eq!(stats.total, 7.0);
        assert_eq!(stats.max, 4.0);

        let stats = *series.compute_stats().unwrap();
        assert_eq!(stats.total, 10.0);
        assert_eq!(series.count(), 1);
    }

    #[test]
    fn test_accumulate_and_merge() {
        let mut a = allocated(1, 2);
        a.register(0, 0, 2.0).unwrap();
        a.register(0, 1, 2.0).unwrap();
        a.set_count(1);
        let mut b = allocated(1, 2);
        b.register(0, 0, 4.0).unwrap();
        b.set_count(1);

        let mut sum = a.clone();
        sum.accumulate(&b).unwrap();
        assert_eq!(sum.values(), &[6.0, 2.0]);
        assert_eq!(sum.count(), 2);

        a.merge(&b).unwrap();
        assert_eq!(a.values(), &[3.0, 2.0]);
        assert_eq!(a.count(), 2);

        let mut fresh = allocated(1, 2);
        fresh.register(0, 0, 50.0).unwrap();
        fresh.merge(&a).unwrap();
        assert_eq!(fresh.values(), &[3.0, 2.0]);
        assert_eq!(fresh.count(), 2);

        let c = allocated(2, 2);
        assert_eq!(
            a.merge(&c),
            Err(SeriesError::ShapeMismatch {
                expected: (1, 2),
                found: (2, 2)
            })
        );
    }
}
