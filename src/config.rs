//! Normalization settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeriesError};

/// What 2-D interpolation does with a bucket row that never received a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRowPolicy {
    /// Leave the row absent and warn. A later `differential()` will fail on it.
    #[default]
    Leave,
    /// Fill the row with [`NormalizeConfig::empty_fill`], as 1-D series do.
    Fill,
}

/// Settings shared by every series kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Value written to every slot of a series that never received one.
    ///
    /// Default: `0.0` (no activity in the window)
    pub empty_fill: f64,

    /// Handling of empty rows in bucket × time matrices.
    ///
    /// Default: [`EmptyRowPolicy::Leave`]
    pub empty_row_policy: EmptyRowPolicy,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            empty_fill: 0.0,
            empty_row_policy: EmptyRowPolicy::Leave,
        }
    }
}

impl NormalizeConfig {
    /// Returns a builder seeded with the defaults.
    pub fn builder() -> NormalizeConfigBuilder {
        NormalizeConfigBuilder::new()
    }

    /// Checks that the settings can be applied.
    pub fn validate(&self) -> Result<()> {
        if !self.empty_fill.is_finite() {
            return Err(SeriesError::InvalidConfig(format!(
                "empty_fill must be finite, got {}",
                self.empty_fill
            )));
        }
        Ok(())
    }
}

/// Builder for [`NormalizeConfig`].
///
/// # Example
///
/// ```
/// use lmt_series::{EmptyRowPolicy, NormalizeConfig};
///
/// let config = NormalizeConfig::builder()
///     .empty_row_policy(EmptyRowPolicy::Fill)
///     .build()
///     .unwrap();
/// assert_eq!(config.empty_fill, 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NormalizeConfigBuilder {
    config: NormalizeConfig,
}

impl NormalizeConfigBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value used for series with no observations.
    #[must_use]
    pub fn empty_fill(mut self, value: f64) -> Self {
        self.config.empty_fill = value;
        self
    }

    /// Sets the policy for empty histogram rows.
    #[must_use]
    pub fn empty_row_policy(mut self, policy: EmptyRowPolicy) -> Self {
        self.config.empty_row_policy = policy;
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> Result<NormalizeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
