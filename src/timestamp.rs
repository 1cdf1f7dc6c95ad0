//! Conversion between `YYYY-MM-DD hh:mm:ss` timestamps (UTC) and time keys.

use std::fmt;

use chrono_v0_4::{DateTime, NaiveDateTime};

use crate::axis::TimeKey;

/// Layout of timestamps as stored by the collectors.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Failure to convert a timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// The text did not match [`TIMESTAMP_FORMAT`].
    Parse {
        /// The rejected text.
        input: String,
        /// Parser message.
        reason: String,
    },
    /// The key is outside the range chrono can represent.
    OutOfRange(TimeKey),
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampError::Parse { input, reason } => {
                write!(f, "cannot parse timestamp '{input}': {reason}")
            }
            TimestampError::OutOfRange(key) => write!(f, "time key {key} is out of range"),
        }
    }
}

impl std::error::Error for TimestampError {}

/// Parses `"2013-04-22 13:05:00"` into seconds since the epoch.
pub fn parse(text: &str) -> Result<TimeKey, TimestampError> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|e| TimestampError::Parse {
            input: text.to_string(),
            reason: e.to_string(),
        })
}

/// Formats seconds since the epoch as a UTC timestamp.
pub fn format(key: TimeKey) -> Result<String, TimestampError> {
    DateTime::from_timestamp(key, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .ok_or(TimestampError::OutOfRange(key))
}
