//! Risk Fusion Decision Engine
//!
//! Turns one worker reading into a safety classification:
//! - Per-parameter risk scoring (heart rate, SpO2, temperature, gas, fatigue)
//! - Zone sensitivity for the environment-coupled signals
//! - Weighted fusion with an ordered override ladder
//!
//! The engine is stateless and safe to share across threads.

pub mod fusion;
pub mod reading;
pub mod scorer;
pub mod zone;

pub use fusion::{
    DecisionDetail, DecisionEngine, Fusion, Parameter, RiskVector, SafetyStatus,
    BASE_FUSION_REASON,
};
pub use reading::{Fatigue, Reading};
pub use scorer::ParameterRisk;
pub use zone::{ZoneError, ZoneFactor, ZoneSensitivityTable, DEFAULT_ZONE};
