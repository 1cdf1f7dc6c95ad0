//! Index builders for the time and bucket axes.
//!
//! An axis is built in two phases. Keys are first fed to an [`AxisBuilder`] with
//! [`examine`](AxisBuilder::examine) in any order and with duplicates. Then
//! [`finalize`](AxisBuilder::finalize) sorts the distinct keys, assigns each an
//! index and produces an immutable [`Axis`]. Only the finished axis offers key to
//! index lookup, so a series can never be sized against a half-built axis.
//!
//! The finished axis is handed out behind an [`Arc`] and shared by every series
//! built for the same window.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::diagnostics::MissedKey;
use crate::error::{Result, SeriesError};
#[cfg(feature = "chrono_v0_4")]
use crate::timestamp::{self, TimestampError};

/// Seconds in epoch identifying a sample's time slot.
pub type TimeKey = i64;

/// Value identifying a histogram bucket, e.g. an I/O size threshold in bytes.
pub type BucketKey = u64;

/// A key type that can index an axis.
pub trait AxisKey: Copy + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Numeric position used for gap weighting and deltas.
    fn position(self) -> f64;

    /// Wraps the key for a lookup-miss report.
    fn missed(self) -> MissedKey;
}

impl AxisKey for TimeKey {
    #[allow(clippy::cast_precision_loss)]
    fn position(self) -> f64 {
        self as f64
    }

    fn missed(self) -> MissedKey {
        MissedKey::Time(self)
    }
}

impl AxisKey for BucketKey {
    #[allow(clippy::cast_precision_loss)]
    fn position(self) -> f64 {
        self as f64
    }

    fn missed(self) -> MissedKey {
        MissedKey::Bucket(self)
    }
}

/// Descriptive metadata carried by an axis, e.g. the bucket set of a histogram.
///
/// Every field is optional text; an empty string means unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisLabel {
    /// Identifier of the axis in the telemetry source.
    pub id: String,
    /// Short display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Units of the keys, e.g. `"bytes"`.
    pub units: String,
}

impl AxisLabel {
    /// Creates a label with a name and units.
    pub fn new(name: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            ..Self::default()
        }
    }

    /// Sets the source identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Collects distinct keys until [`finalize`](Self::finalize) is called.
#[derive(Debug, Clone)]
pub struct AxisBuilder<K: AxisKey> {
    seen: HashSet<K>,
    keys: Vec<K>,
    window: Option<(K, K)>,
    label: Option<AxisLabel>,
    sealed: bool,
}

/// Builder for a time axis.
pub type TimeAxisBuilder = AxisBuilder<TimeKey>;

/// Builder for a bucket axis.
pub type BucketAxisBuilder = AxisBuilder<BucketKey>;

impl<K: AxisKey> AxisBuilder<K> {
    /// Creates a builder that accepts any key.
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            keys: Vec::new(),
            window: None,
            label: None,
            sealed: false,
        }
    }

    /// Creates a builder that rejects keys outside `[begin, end]`.
    pub fn windowed(begin: K, end: K) -> Self {
        Self {
            window: Some((begin, end)),
            ..Self::new()
        }
    }

    /// Attaches metadata that the finished axis will carry.
    #[must_use]
    pub fn with_label(mut self, label: AxisLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Records `key` if it has not been seen yet.
    ///
    /// Returns `true` if the key was new. Fails once the builder is finalized, or if
    /// the key lies outside the builder's window.
    pub fn examine(&mut self, key: K) -> Result<bool> {
        if self.sealed {
            return Err(SeriesError::AxisSealed);
        }
        if self.seen.contains(&key) {
            return Ok(false);
        }
        if let Some((begin, end)) = self.window
            && (key < begin || key > end)
        {
            return Err(SeriesError::KeyOutOfWindow {
                key: key.position(),
                begin: begin.position(),
                end: end.position(),
            });
        }
        self.seen.insert(key);
        self.keys.push(key);
        Ok(true)
    }

    /// Number of distinct keys examined so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if no key has been examined.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Returns `true` once [`finalize`](Self::finalize) has succeeded.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Sorts the distinct keys and builds the finished axis.
    ///
    /// May be called once. A second build needs [`reset`](Self::reset) first.
    pub fn finalize(&mut self) -> Result<Arc<Axis<K>>> {
        if self.sealed {
            return Err(SeriesError::AxisSealed);
        }
        let mut sorted = self.keys.clone();
        sorted.sort_unstable();

        let mut slots: Vec<Option<K>> = vec![None; sorted.len()];
        let mut lookup = HashMap::with_capacity(sorted.len());
        for (index, key) in sorted.into_iter().enumerate() {
            slots[index] = Some(key);
            lookup.insert(key, index);
        }
        let mut keys = Vec::with_capacity(slots.len());
        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(key) => keys.push(key),
                None => return Err(SeriesError::UnfilledAxisSlot { index }),
            }
        }

        let deltas = keys
            .windows(2)
            .map(|pair| pair[1].position() - pair[0].position())
            .collect();

        self.sealed = true;

        #[cfg(feature = "logging")]
        log::debug!(
            "axis finalized with {} keys ({:?}..={:?})",
            keys.len(),
            keys.first(),
            keys.last()
        );

        Ok(Arc::new(Axis {
            keys,
            lookup,
            deltas,
            label: self.label.clone(),
        }))
    }

    /// Discards every examined key so the builder can be used for a new window.
    ///
    /// The window bounds and label, if any, are kept.
    pub fn reset(&mut self) {
        self.seen.clear();
        self.keys.clear();
        self.sealed = false;
    }
}

impl<K: AxisKey> Default for AxisBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished, immutable axis: distinct keys in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis<K: AxisKey> {
    keys: Vec<K>,
    lookup: HashMap<K, usize>,
    deltas: Vec<f64>,
    label: Option<AxisLabel>,
}

/// Axis of time keys.
pub type TimeAxis = Axis<TimeKey>;

/// Axis of histogram bucket keys.
pub type BucketAxis = Axis<BucketKey>;

impl<K: AxisKey> Axis<K> {
    /// Builds an axis in one step from an iterator of keys.
    pub fn from_keys(keys: impl IntoIterator<Item = K>) -> Result<Arc<Self>> {
        let mut builder = AxisBuilder::new();
        for key in keys {
            builder.examine(key)?;
        }
        builder.finalize()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Metadata attached by [`AxisBuilder::with_label`].
    pub fn label(&self) -> Option<&AxisLabel> {
        self.label.as_ref()
    }

    /// Returns `true` if the axis has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys in ascending order.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Index of `key`, or `None` if it was never examined.
    pub fn index_of(&self, key: K) -> Option<usize> {
        self.lookup.get(&key).copied()
    }

    /// Key at `index`, or `None` if out of range.
    pub fn key_at(&self, index: usize) -> Option<K> {
        self.keys.get(index).copied()
    }

    /// First (smallest) key.
    pub fn first(&self) -> Option<K> {
        self.keys.first().copied()
    }

    /// Last (largest) key.
    pub fn last(&self) -> Option<K> {
        self.keys.last().copied()
    }

    /// Distance between the first and last key, `0.0` for fewer than two keys.
    pub fn span(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last.position() - first.position(),
            _ => 0.0,
        }
    }

    pub(crate) fn position(&self, index: usize) -> f64 {
        self.keys[index].position()
    }
}

/// Fails unless two optional bindings index the same keys.
///
/// Unbound sides are compatible with anything. Separate axes with equal keys
/// are accepted.
pub(crate) fn check_compatible<K: AxisKey>(
    name: &str,
    mine: Option<&Arc<Axis<K>>>,
    theirs: Option<&Arc<Axis<K>>>,
) -> Result<()> {
    match (mine, theirs) {
        (Some(a), Some(b)) if !Arc::ptr_eq(a, b) && a.keys != b.keys => {
            Err(SeriesError::AxisMismatch(name.to_string()))
        }
        _ => Ok(()),
    }
}

impl Axis<TimeKey> {
    /// Elapsed seconds between consecutive keys; `len() - 1` entries, all positive.
    pub fn deltas(&self) -> &[f64] {
        &self.deltas
    }

    /// Index of the slot for a `YYYY-MM-DD hh:mm:ss` timestamp.
    ///
    /// `Ok(None)` if the timestamp parses but was never examined.
    #[cfg(feature = "chrono_v0_4")]
    pub fn index_of_timestamp(
        &self,
        text: &str,
    ) -> std::result::Result<Option<usize>, TimestampError> {
        timestamp::parse(text).map(|key| self.index_of(key))
    }
}
