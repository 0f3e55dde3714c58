//! Runtime configuration.
//!
//! Balancing numbers are configuration, not code. Every field has a
//! default, so a partial JSON document only overrides what it names.

use crate::attribute::StatValue;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one gear session.
///
/// # Examples
///
/// ```rust
/// use zzgear::GearConfig;
///
/// let config = GearConfig::from_json_str(r#"{ "inventory_capacity": 12 }"#).unwrap();
/// assert_eq!(config.inventory_capacity, 12);
/// assert_eq!(config.debounce_delay_ms, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearConfig {
    /// Number of inventory slots per hero.
    pub inventory_capacity: usize,
    /// Idle window before a burst of equipment changes triggers a recompute.
    pub debounce_delay_ms: u64,
    /// Leadership every hero starts from before armor contributions.
    pub leadership_base: StatValue,
    /// Value substituted for rolled stats that land at or below zero.
    pub min_roll_floor: StatValue,
    /// Keep non-positive rolls for every generator, regardless of its own flag.
    pub allow_zero_rolls: bool,
}

impl GearConfig {
    pub const DEFAULT_CAPACITY: usize = 40;
    pub const DEFAULT_DEBOUNCE_MS: u64 = 100;
    pub const DEFAULT_LEADERSHIP: StatValue = 700.0;

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inventory_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inventory_capacity must be at least 1".to_string(),
            ));
        }
        if self.min_roll_floor <= 0.0 && !self.allow_zero_rolls {
            return Err(ConfigError::Invalid(
                "min_roll_floor must be positive unless allow_zero_rolls is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }
}

impl Default for GearConfig {
    fn default() -> Self {
        Self {
            inventory_capacity: Self::DEFAULT_CAPACITY,
            debounce_delay_ms: Self::DEFAULT_DEBOUNCE_MS,
            leadership_base: Self::DEFAULT_LEADERSHIP,
            min_roll_floor: 1.0,
            allow_zero_rolls: false,
        }
    }
}
