//! # lmt-series
//!
//! Normalization engine for irregular file-system telemetry.
//!
//! Collectors hand this crate sparse `(time, value)` and `(bucket, time, value)`
//! samples taken at uneven intervals. The crate turns them into gap-free,
//! per-second rate series with summary statistics, ready for reports and plots.
//!
//! ## Pipeline
//!
//! 1. Feed every distinct key to an [`AxisBuilder`] and [`finalize`](AxisBuilder::finalize) it.
//! 2. Bind the shared [`Axis`] to one or more series, which sizes their storage.
//! 3. Register samples by key. Unknown keys are dropped and reported to an
//!    optional [`DiagnosticSink`].
//! 4. [`interpolate`](TimeSeries::interpolate) to close gaps, weighted by elapsed time.
//! 5. [`differential`](TimeSeries::differential) to turn cumulative values into rates.
//!    [`CounterSeries`] does this on its own and suppresses counter resets.
//! 6. Compute [`Statistics`] and combine series with `merge` or `accumulate`.
//!
//! ## Quick Start
//!
//! ```rust
//! use lmt_series::{CounterSeries, TimeAxisBuilder};
//!
//! # fn main() -> Result<(), lmt_series::SeriesError> {
//! let samples = [(0, 100.0), (5, 105.0), (10, 80.0), (15, 95.0)];
//!
//! let mut steps = TimeAxisBuilder::new();
//! for (key, _) in &samples {
//!     steps.examine(*key)?;
//! }
//! let axis = steps.finalize()?;
//!
//! let mut bytes = CounterSeries::new("Bulk read", "bytes/sec");
//! bytes.bind_axis(axis)?;
//! for (key, value) in samples {
//!     bytes.register(key, value)?;
//! }
//! bytes.interpolate()?;
//!
//! assert_eq!(bytes.resets(), &[2]);
//! assert_eq!(bytes.values(), &[0.0, 1.0, 0.0, 3.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `logging`: emit `log` records for dropped samples, resets and empty rows
//! - `chrono_v0_4`: the `timestamp` module and timestamp lookup on time axes
//!
//! ## Architecture
//!
//! This crate does **not** query databases, persist data or render plots. It is a
//! synchronous, in-memory batch transform over one bounded window of samples.

#![deny(missing_docs)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod axis;
pub mod config;
pub mod counter;
pub mod diagnostics;
pub mod error;
pub mod histogram;
pub mod report;
pub mod series;
pub mod series2;
pub mod stats;
#[cfg(feature = "chrono_v0_4")]
pub mod timestamp;
pub mod timeseries;

pub use axis::{
    Axis, AxisBuilder, AxisKey, AxisLabel, BucketAxis, BucketAxisBuilder, BucketKey, TimeAxis,
    TimeAxisBuilder, TimeKey,
};
pub use config::{EmptyRowPolicy, NormalizeConfig, NormalizeConfigBuilder};
pub use counter::{CounterSeries, CounterState};
pub use diagnostics::{CollectingSink, DiagnosticSink, LookupMiss, MissedKey, NoopSink};
pub use error::{ErrorKind, Result, SeriesError};
pub use histogram::HistogramSeries;
pub use report::Reportable;
pub use series::Series;
pub use series2::{RowFill, Series2D};
pub use stats::Statistics;
pub use timeseries::{IndexedSeries, TimeSeries};
