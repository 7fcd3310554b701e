//! Explicit home of the source-id generator and the calculus settings.

use std::sync::Arc;

use errprop_core::{CalculusConfig, NumArray, PropError, SourceIdGenerator};

use crate::value::UncertainValue;

/// Issues fresh sources for new uncertain values.
///
/// Values built through different contexts may only be combined when the
/// contexts share one generator (see [`with_generator`](Self::with_generator)),
/// otherwise unrelated sources can end up with the same id.
#[derive(Debug, Clone)]
pub struct UncertaintyContext {
    ids: Arc<SourceIdGenerator>,
    config: CalculusConfig,
}

impl UncertaintyContext {
    /// Validates `config` and starts a private generator at its first id.
    pub fn new(config: CalculusConfig) -> Result<Self, PropError> {
        config.validate()?;
        let ids = Arc::new(SourceIdGenerator::starting_at(config.first_source_id));
        Ok(Self { ids, config })
    }

    /// Context drawing ids from a shared generator.
    pub fn with_generator(
        ids: Arc<SourceIdGenerator>,
        config: CalculusConfig,
    ) -> Result<Self, PropError> {
        config.validate()?;
        Ok(Self { ids, config })
    }

    /// The shared generator.
    pub fn ids(&self) -> &Arc<SourceIdGenerator> {
        &self.ids
    }

    /// Active settings.
    pub fn config(&self) -> &CalculusConfig {
        &self.config
    }

    /// One new independent source per element of `nominal`.
    pub fn uncertain(
        &self,
        nominal: impl Into<NumArray>,
        stddev: impl Into<NumArray>,
    ) -> Result<UncertainValue, PropError> {
        UncertainValue::from_stddev(&self.ids, nominal.into(), stddev.into())
    }

    /// Zero-nominal value whose stddev is `error` divided by the configured
    /// number of standard deviations an error stands for.
    pub fn provide(&self, error: impl Into<NumArray>) -> Result<UncertainValue, PropError> {
        let error = error.into();
        let scale = self.config.error_stddevs;
        let stddev = error.map(|e| e / scale, |e| e / scale);
        let nominal = NumArray::zeros(error.dtype(), error.shape());
        UncertainValue::from_stddev(&self.ids, nominal, stddev)
    }

    /// Exactly known value.
    pub fn exact(&self, nominal: impl Into<NumArray>) -> UncertainValue {
        UncertainValue::exact(nominal.into())
    }
}

impl Default for UncertaintyContext {
    fn default() -> Self {
        Self {
            ids: Arc::new(SourceIdGenerator::new()),
            config: CalculusConfig::default(),
        }
    }
}
