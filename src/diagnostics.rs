//! Non-fatal lookup misses and the sinks that collect them.
//!
//! Samples that arrive for a key the axis never examined are expected in sparse
//! telemetry. They are dropped rather than failing the window, and reported here
//! so a caller can count or print them if it cares.

use std::fmt;

use crate::axis::{BucketKey, TimeKey};

/// The key that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissedKey {
    /// A time key absent from the time axis.
    Time(TimeKey),
    /// A bucket key absent from the bucket axis.
    Bucket(BucketKey),
}

impl fmt::Display for MissedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissedKey::Time(key) => write!(f, "time key {key}"),
            MissedKey::Bucket(key) => write!(f, "bucket key {key}"),
        }
    }
}

/// A sample that was dropped because one of its keys was not on the axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupMiss {
    /// Name of the series the sample was meant for.
    pub series: String,
    /// The key that failed to resolve.
    pub key: MissedKey,
    /// The dropped value.
    pub value: f64,
}

impl fmt::Display for LookupMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "series '{}': dropped value {} at unknown {}",
            self.series, self.value, self.key
        )
    }
}

/// Receives lookup misses from `register` calls.
pub trait DiagnosticSink {
    /// Records one dropped sample.
    fn lookup_miss(&mut self, miss: LookupMiss);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn lookup_miss(&mut self, _miss: LookupMiss) {}
}

/// Sink that keeps every miss in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    misses: Vec<LookupMiss>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected misses.
    pub fn misses(&self) -> &[LookupMiss] {
        &self.misses
    }

    /// Number of collected misses.
    pub fn len(&self) -> usize {
        self.misses.len()
    }

    /// Returns `true` if nothing was dropped.
    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }

    /// Takes the collected misses, leaving the sink empty.
    pub fn drain(&mut self) -> Vec<LookupMiss> {
        std::mem::take(&mut self.misses)
    }
}

impl DiagnosticSink for CollectingSink {
    fn lookup_miss(&mut self, miss: LookupMiss) {
        self.misses.push(miss);
    }
}

impl<F: FnMut(LookupMiss)> DiagnosticSink for F {
    fn lookup_miss(&mut self, miss: LookupMiss) {
        self(miss);
    }
}

/// Logs the miss at debug level and hands it to the sink.
pub(crate) fn report_miss<S: DiagnosticSink + ?Sized>(sink: &mut S, miss: LookupMiss) {
    #[cfg(feature = "logging")]
    log::debug!("{miss}");
    sink.lookup_miss(miss);
}
