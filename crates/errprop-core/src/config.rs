//! Configuration shared by uncertainty contexts.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PropError};

fn default_error_stddevs() -> f64 {
    2.0
}

fn default_first_source_id() -> u64 {
    1
}

/// Tunables for an uncertainty calculus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculusConfig {
    /// Number of standard deviations an error handed to `provide` represents.
    #[serde(default = "default_error_stddevs")]
    pub error_stddevs: f64,
    /// First identifier a freshly created generator issues.
    #[serde(default = "default_first_source_id")]
    pub first_source_id: u64,
}

impl Default for CalculusConfig {
    fn default() -> Self {
        Self {
            error_stddevs: default_error_stddevs(),
            first_source_id: default_first_source_id(),
        }
    }
}

impl CalculusConfig {
    /// Builds a configuration with a custom error convention.
    pub fn with_error_stddevs(error_stddevs: f64) -> Self {
        Self {
            error_stddevs,
            ..Self::default()
        }
    }

    /// Checks every field for range errors.
    pub fn validate(&self) -> Result<(), PropError> {
        if !self.error_stddevs.is_finite() || self.error_stddevs <= 0.0 {
            return Err(PropError::Config(
                ErrorInfo::new(
                    "invalid-error-stddevs",
                    "error_stddevs must be finite and positive",
                )
                .with_context("error_stddevs", self.error_stddevs.to_string()),
            ));
        }
        if self.first_source_id == 0 {
            return Err(PropError::Config(
                ErrorInfo::new(
                    "invalid-first-source-id",
                    "source id 0 is reserved for empty slots",
                )
                .with_hint("start at 1 or above"),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, PropError> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            PropError::Config(
                ErrorInfo::new("config-parse", "failed to parse calculus config")
                    .with_context("reason", err.to_string()),
            )
        })?;
        config.validate()?;
        Ok(config)
    }
}
