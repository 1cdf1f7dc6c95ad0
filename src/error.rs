//! Error types for series and axis operations.

use std::fmt;

/// Broad classification of a [`SeriesError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An operation was invoked out of lifecycle order.
    State,
    /// An index or key fell outside the valid range.
    Bounds,
    /// An internal invariant was broken. Indicates a builder bug, not bad input.
    DataInvariant,
}

/// Errors that can occur while building axes or normalizing series.
///
/// All variants are fail-fast: the window being processed should be treated as
/// unusable. Unknown keys are not errors; see [`crate::diagnostics::LookupMiss`].
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// A value was registered before storage was allocated.
    NotAllocated(String),
    /// Storage was allocated twice without an intervening `clear()`.
    AlreadyAllocated(String),
    /// `examine()` or `finalize()` was called on an axis builder that was already finalized.
    AxisSealed,
    /// A keyed operation was attempted on a series with no axis bound.
    AxisNotBound(String),
    /// A counter was asked to differentiate a second time.
    AlreadyDifferentiated(String),
    /// A counter was asked for its rate before it was interpolated.
    NotInterpolated(String),
    /// Two counters in different lifecycle states were combined.
    CounterStateMismatch {
        /// Name of the receiving counter.
        counter: String,
        /// Name of the counter being combined into it.
        other: String,
    },
    /// Two series bound to different axes were combined.
    AxisMismatch(String),
    /// A counter received a registration after it was interpolated.
    CounterClosed(String),
    /// Statistics were merged from an absent snapshot.
    MissingStatistics,
    /// A configuration value cannot be applied.
    InvalidConfig(String),
    /// Two series with different shapes were combined.
    ShapeMismatch {
        /// Shape of the receiving series.
        expected: (usize, usize),
        /// Shape of the series being combined into it.
        found: (usize, usize),
    },
    /// An index fell outside `[0, length)`.
    IndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Length of the indexed dimension.
        length: usize,
    },
    /// A key fell outside the window the axis was built for.
    KeyOutOfWindow {
        /// Position of the offending key.
        key: f64,
        /// Position of the first key of the window.
        begin: f64,
        /// Position of the last key of the window.
        end: f64,
    },
    /// Differencing found slots that were never filled. Interpolate first.
    AbsentSlots {
        /// Name of the series.
        series: String,
        /// Number of absent slots.
        count: usize,
    },
    /// An axis finalized with a slot that never received a key.
    UnfilledAxisSlot {
        /// Index of the empty slot.
        index: usize,
    },
    /// Interpolation finished with a slot still absent.
    UnfilledSlot {
        /// Name of the series.
        series: String,
        /// Index of the absent slot.
        index: usize,
    },
}

impl SeriesError {
    /// Returns the taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeriesError::NotAllocated(_)
            | SeriesError::AlreadyAllocated(_)
            | SeriesError::AxisSealed
            | SeriesError::AxisNotBound(_)
            | SeriesError::AlreadyDifferentiated(_)
            | SeriesError::NotInterpolated(_)
            | SeriesError::CounterStateMismatch { .. }
            | SeriesError::AxisMismatch(_)
            | SeriesError::CounterClosed(_)
            | SeriesError::MissingStatistics
            | SeriesError::InvalidConfig(_)
            | SeriesError::ShapeMismatch { .. } => ErrorKind::State,
            SeriesError::IndexOutOfBounds { .. } | SeriesError::KeyOutOfWindow { .. } => {
                ErrorKind::Bounds
            }
            SeriesError::AbsentSlots { .. }
            | SeriesError::UnfilledAxisSlot { .. }
            | SeriesError::UnfilledSlot { .. } => ErrorKind::DataInvariant,
        }
    }
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::NotAllocated(name) => {
                write!(f, "series '{name}' has no storage; bind an axis or allocate first")
            }
            SeriesError::AlreadyAllocated(name) => {
                write!(f, "series '{name}' is already allocated; clear it before reallocating")
            }
            SeriesError::AxisSealed => {
                write!(f, "axis builder is already finalized; reset it before rebuilding")
            }
            SeriesError::AxisNotBound(name) => write!(f, "series '{name}' has no axis bound"),
            SeriesError::AlreadyDifferentiated(name) => {
                write!(f, "counter '{name}' was already differentiated")
            }
            SeriesError::NotInterpolated(name) => {
                write!(f, "counter '{name}' has not been interpolated yet")
            }
            SeriesError::CounterStateMismatch { counter, other } => write!(
                f,
                "counter '{other}' is not in the same state as '{counter}'; finish both first"
            ),
            SeriesError::AxisMismatch(name) => {
                write!(f, "series '{name}' is bound to a different axis")
            }
            SeriesError::CounterClosed(name) => {
                write!(f, "counter '{name}' no longer accepts registrations")
            }
            SeriesError::MissingStatistics => write!(f, "no statistics to merge from"),
            SeriesError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            SeriesError::ShapeMismatch { expected, found } => write!(
                f,
                "shape mismatch: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            SeriesError::IndexOutOfBounds { index, length } => {
                write!(f, "index {index} out of range for length {length}")
            }
            SeriesError::KeyOutOfWindow { key, begin, end } => {
                write!(f, "key {key} outside window [{begin}, {end}]")
            }
            SeriesError::AbsentSlots { series, count } => write!(
                f,
                "series '{series}' has {count} absent slots; interpolate before differencing"
            ),
            SeriesError::UnfilledAxisSlot { index } => {
                write!(f, "axis slot {index} never received a key")
            }
            SeriesError::UnfilledSlot { series, index } => {
                write!(f, "series '{series}' slot {index} still absent after interpolation")
            }
        }
    }
}

impl std::error::Error for SeriesError {}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SeriesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(SeriesError::AxisSealed.kind(), ErrorKind::State);
        assert_eq!(
            SeriesError::AxisMismatch(String::from("cpu")).kind(),
            ErrorKind::State
        );
        assert_eq!(
            SeriesError::NotInterpolated(String::from("ops")).kind(),
            ErrorKind::State
        );
        assert_eq!(
            SeriesError::IndexOutOfBounds { index: 4, length: 4 }.kind(),
            ErrorKind::Bounds
        );
        assert_eq!(
            SeriesError::UnfilledAxisSlot { index: 0 }.kind(),
            ErrorKind::DataInvariant
        );
    }

    #[test]
    fn test_display_carries_context() {
        let err = SeriesError::AbsentSlots {
            series: String::from("Bulk read"),
            count: 3,
        };
        let display = format!("{err}");
        assert!(display.contains("Bulk read"));
        assert!(display.contains('3'));

        let err = SeriesError::KeyOutOfWindow {
            key: 20.0,
            begin: 0.0,
            end: 15.0,
        };
        assert!(format!("{err}").contains("[0, 15]"));

        let err = SeriesError::CounterStateMismatch {
            counter: String::from("total"),
            other: String::from("ost0"),
        };
        let display = format!("{err}");
        assert!(display.contains("total"));
        assert!(display.contains("ost0"));
        assert_eq!(err.kind(), ErrorKind::State);
    }
}
