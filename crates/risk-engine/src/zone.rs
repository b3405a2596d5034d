//! Zone Sensitivity
//!
//! Hazardous zones inflate the gas and SpO2 risk for the same raw reading.
//! A factor below 1.0 divides the risk, capped at the top band value.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Zone assumed when a reading carries none
pub const DEFAULT_ZONE: &str = "NORMAL";

/// Adjusted risk never exceeds the highest band
const ADJUSTED_RISK_CAP: f64 = 95.0;

/// Zone table errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ZoneError {
    #[error("zone {zone} has factor {factor}, expected a value in (0, 1]")]
    InvalidFactor { zone: String, factor: f64 },

    #[error("zone name must not be empty")]
    EmptyName,
}

/// Resolved sensitivity for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFactor {
    /// Normalized (upper-case) zone name
    pub zone: String,
    /// Divisor in (0, 1]
    pub factor: f64,
}

impl ZoneFactor {
    /// Factor that leaves risks unchanged
    pub fn neutral() -> Self {
        Self {
            zone: DEFAULT_ZONE.to_string(),
            factor: 1.0,
        }
    }

    /// Apply the zone to a raw gas or SpO2 risk: `min(95, floor(risk / factor))`
    pub fn adjust(&self, risk: u8) -> u8 {
        (f64::from(risk) / self.factor)
            .min(ADJUSTED_RISK_CAP)
            .floor() as u8
    }
}

/// Case-insensitive zone name to sensitivity factor mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSensitivityTable {
    factors: HashMap<String, f64>,
}

impl ZoneSensitivityTable {
    /// Create an empty table (every zone resolves to 1.0)
    pub fn empty() -> Self {
        Self {
            factors: HashMap::new(),
        }
    }

    /// Build a table from configured factors, rejecting any outside (0, 1]
    pub fn from_factors<I, S>(factors: I) -> Result<Self, ZoneError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        factors
            .into_iter()
            .try_fold(Self::empty(), |table, (zone, factor)| {
                table.with_zone(zone.as_ref(), factor)
            })
    }

    /// Add or replace one zone
    pub fn with_zone(mut self, zone: &str, factor: f64) -> Result<Self, ZoneError> {
        let key = normalize(zone);
        if key.is_empty() {
            return Err(ZoneError::EmptyName);
        }
        if !(factor > 0.0 && factor <= 1.0) {
            return Err(ZoneError::InvalidFactor { zone: key, factor });
        }
        self.factors.insert(key, factor);
        Ok(self)
    }

    /// Resolve a zone, defaulting unknown zones to 1.0
    pub fn factor(&self, zone: &str) -> ZoneFactor {
        let mut key = normalize(zone);
        if key.is_empty() {
            key = DEFAULT_ZONE.to_string();
        }
        let factor = self.factors.get(&key).copied().unwrap_or(1.0);
        ZoneFactor { zone: key, factor }
    }

    /// Number of configured zones
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

impl Default for ZoneSensitivityTable {
    fn default() -> Self {
        let mut factors = HashMap::new();
        factors.insert("NORMAL".to_string(), 1.0);
        factors.insert("CHEMICAL".to_string(), 0.7);
        factors.insert("MINING".to_string(), 0.8);
        factors.insert("FIRE-RESCUE".to_string(), 0.85);
        Self { factors }
    }
}

fn normalize(zone: &str) -> String {
    zone.trim().to_uppercase()
}
