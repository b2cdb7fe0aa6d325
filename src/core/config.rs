//! Engine configuration.
//!
//! Risk parameters are fixed when an engine is constructed. They default to
//! the values in `utils::constants` and can be loaded from JSON. The
//! fixed-point scale is not configurable: health factors and prices always
//! use `PRECISION`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Risk and bookkeeping parameters of an engine instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Engine version
    pub version: String,

    /// Share of collateral value counted toward the safety margin,
    /// over `liquidation_precision` (50/100 = 200% overcollateralization)
    pub liquidation_threshold: u128,

    /// Liquidator reward over `liquidation_precision`
    pub liquidation_bonus: u128,

    /// Denominator of threshold and bonus
    pub liquidation_precision: u128,

    /// Health factor below which a position is unsafe
    pub min_health_factor: u128,

    /// Maximum age of a price round in seconds
    pub max_price_staleness_secs: u64,

    /// Events retained in the engine's log
    pub max_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            liquidation_threshold: LIQUIDATION_THRESHOLD,
            liquidation_bonus: LIQUIDATION_BONUS,
            liquidation_precision: LIQUIDATION_PRECISION,
            min_health_factor: MIN_HEALTH_FACTOR,
            max_price_staleness_secs: MAX_PRICE_STALENESS_SECS,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl EngineConfig {
    /// Override the liquidation threshold
    pub fn with_threshold(mut self, threshold: u128) -> Self {
        self.liquidation_threshold = threshold;
        self
    }

    /// Override the liquidation bonus
    pub fn with_bonus(mut self, bonus: u128) -> Self {
        self.liquidation_bonus = bonus;
        self
    }

    /// Override the event retention
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = max_events;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        fn invalid(name: &str, reason: &str) -> Error {
            Error::InvalidParameter {
                name: name.into(),
                reason: reason.into(),
            }
        }

        if self.liquidation_precision == 0 {
            return Err(invalid("liquidation_precision", "must be greater than zero"));
        }
        if self.liquidation_threshold == 0 || self.liquidation_threshold > self.liquidation_precision {
            return Err(invalid(
                "liquidation_threshold",
                "must be in (0, liquidation_precision]",
            ));
        }
        if self.liquidation_bonus >= self.liquidation_precision {
            return Err(invalid("liquidation_bonus", "must be below liquidation_precision"));
        }
        if self.min_health_factor == 0 {
            return Err(invalid("min_health_factor", "must be greater than zero"));
        }
        if self.max_price_staleness_secs == 0 {
            return Err(invalid("max_price_staleness_secs", "must be greater than zero"));
        }
        if self.max_events == 0 {
            return Err(invalid("max_events", "must be greater than zero"));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOADING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}
