//! Monitor Configuration
//!
//! Layered: built-in defaults, then an optional file, then `SAFETY__*`
//! environment variables (`SAFETY__ALERTS__COOLDOWN_SECONDS=10`).

use crate::rate_limit::RateLimitConfig;
use crate::MonitorError;
use alerting::LifecycleConfig;
use config::{Config, Environment, File};
use risk_engine::{ZoneError, ZoneSensitivityTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::Level;

/// Full monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Cooldown, escalation deadline and scope
    pub alerts: LifecycleConfig,
    /// Silence after which a worker is presumed unconscious (seconds)
    pub inactivity_timeout_seconds: u64,
    pub rate_limit: RateLimitConfig,
    /// Zone name to sensitivity factor in (0, 1]
    pub zones: BTreeMap<String, f64>,
    pub log_level: String,
    /// Reading history window returned to workers and operators
    pub history_minutes: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let zones = [
            ("NORMAL", 1.0),
            ("CHEMICAL", 0.7),
            ("MINING", 0.8),
            ("FIRE-RESCUE", 0.85),
        ]
        .into_iter()
        .map(|(zone, factor)| (zone.to_string(), factor))
        .collect();

        Self {
            alerts: LifecycleConfig::default(),
            inactivity_timeout_seconds: 45,
            rate_limit: RateLimitConfig::default(),
            zones,
            log_level: "info".to_string(),
            history_minutes: 6,
        }
    }
}

impl MonitorConfig {
    /// Load configuration, with `path` optional and allowed to be missing
    pub fn load(path: Option<&str>) -> Result<Self, MonitorError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("SAFETY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validated zone table
    pub fn zone_table(&self) -> Result<ZoneSensitivityTable, ZoneError> {
        ZoneSensitivityTable::from_factors(self.zones.iter().map(|(zone, factor)| (zone, *factor)))
    }

    /// Parsed log level, INFO when unrecognized
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}
