//! Depth units resolver
//!
//! Device-side fallback used when a frame carries no usable metadata value:
//! cached option value, then a live query, then the configured default.

use std::sync::Arc;

use contracts::{CachedValue, DepthUnits, DepthUnitsConfig, OptionId, OptionSource};
use tracing::{trace, warn};

use crate::source::DepthUnitsSource;

/// Resolved value together with the link that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub value: DepthUnits,
    pub source: DepthUnitsSource,
}

impl Resolution {
    fn new(value: DepthUnits, source: DepthUnitsSource) -> Self {
        Self { value, source }
    }
}

/// Produces depth units from the device option, never failing.
///
/// Order:
/// 1. No handle for the option: configured default
/// 2. Handle keeps a cache: the last known value, without touching the control channel.
///    Nothing reported yet also means the default, not a query.
/// 3. Handle without a cache: synchronous query
///
/// Any value that is not finite and positive, and any query error, yields the default.
pub struct DepthUnitsResolver {
    options: Arc<dyn OptionSource>,
    option_id: OptionId,
    default: DepthUnits,
}

impl DepthUnitsResolver {
    /// Resolver for the `depth-units` option with the built-in default
    pub fn new(options: Arc<dyn OptionSource>) -> Self {
        Self {
            options,
            option_id: OptionId::depth_units(),
            default: DepthUnits::DEFAULT,
        }
    }

    /// Resolver using the option id and default from configuration
    pub fn from_config(options: Arc<dyn OptionSource>, config: &DepthUnitsConfig) -> Self {
        Self {
            options,
            option_id: config.option_id.clone(),
            default: config.default_units(),
        }
    }

    /// Builder: override the fallback value
    pub fn with_default(mut self, default: DepthUnits) -> Self {
        self.default = default;
        self
    }

    /// Builder: consult a different option
    pub fn with_option_id(mut self, option_id: OptionId) -> Self {
        self.option_id = option_id;
        self
    }

    pub fn option_id(&self) -> &OptionId {
        &self.option_id
    }

    pub fn default_value(&self) -> DepthUnits {
        self.default
    }

    /// Current depth units
    #[inline]
    pub fn resolve(&self) -> DepthUnits {
        self.resolve_detailed().value
    }

    /// Current depth units and the link of the chain that produced them
    pub fn resolve_detailed(&self) -> Resolution {
        let Some(handle) = self.options.option_handle(&self.option_id) else {
            // Some device variants simply don't expose the option
            trace!(option_id = %self.option_id, "option not available, using default");
            return Resolution::new(self.default, DepthUnitsSource::Default);
        };

        // Kept current out-of-band; a control-reply cycle would only add latency
        match handle.cached_value() {
            CachedValue::Known(cached) => return self.accept(cached, DepthUnitsSource::LastKnown),
            CachedValue::Pending => {
                trace!(option_id = %self.option_id, "no option report yet, using default");
                return Resolution::new(self.default, DepthUnitsSource::Default);
            }
            CachedValue::Uncached => {}
        }

        match handle.query() {
            Ok(value) => self.accept(value, DepthUnitsSource::Query),
            Err(e) => {
                warn!(option_id = %self.option_id, error = %e, "depth units query failed, using default");
                Resolution::new(self.default, DepthUnitsSource::Default)
            }
        }
    }

    fn accept(&self, value: f32, source: DepthUnitsSource) -> Resolution {
        match DepthUnits::new(value) {
            Ok(units) => {
                trace!(option_id = %self.option_id, %source, value, "depth units resolved");
                Resolution::new(units, source)
            }
            Err(_) => {
                warn!(
                    option_id = %self.option_id,
                    %source,
                    value,
                    "option reported invalid depth units, using default"
                );
                Resolution::new(self.default, DepthUnitsSource::Default)
            }
        }
    }
}
