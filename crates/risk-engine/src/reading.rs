//! Validated worker readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Self-reported or inferred fatigue level.
///
/// Values outside the known vocabulary are kept verbatim so they can be
/// reported back; they score at the highest fatigue band.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fatigue {
    Low,
    Medium,
    High,
    Unrecognized(String),
}

impl Fatigue {
    /// Map a numeric ordinal (0, 1, 2) onto a level
    pub fn from_ordinal(ordinal: i64) -> Self {
        match ordinal {
            0 => Fatigue::Low,
            1 => Fatigue::Medium,
            2 => Fatigue::High,
            other => Fatigue::Unrecognized(other.to_string()),
        }
    }

    /// Parse textual input: `low`/`medium`/`high` in any case, or a numeric ordinal
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "low" => Fatigue::Low,
            "medium" => Fatigue::Medium,
            "high" => Fatigue::High,
            _ => match trimmed.parse::<i64>() {
                Ok(ordinal) => Self::from_ordinal(ordinal),
                Err(_) => Fatigue::Unrecognized(trimmed.to_string()),
            },
        }
    }

    /// Ordinal for recognized levels
    pub fn ordinal(&self) -> Option<u8> {
        match self {
            Fatigue::Low => Some(0),
            Fatigue::Medium => Some(1),
            Fatigue::High => Some(2),
            Fatigue::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for Fatigue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fatigue::Unrecognized(raw) => write!(f, "{}", raw),
            level => write!(f, "{}", level.ordinal().unwrap_or_default()),
        }
    }
}

/// One timestamped sample of a worker's physiological and environmental state.
///
/// Only constructed from complete input; range clamping happens in the scorers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub worker_id: String,
    pub timestamp: DateTime<Utc>,
    /// Beats per minute
    pub heart_rate: i64,
    /// Oxygen saturation (%)
    pub spo2: i64,
    /// Body temperature (°C)
    pub temperature: f64,
    /// Gas concentration (ppm)
    pub gas: i64,
    pub fatigue: Fatigue,
    /// Key into the zone sensitivity table
    pub zone: String,
}
