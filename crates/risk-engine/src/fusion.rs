//! Fusion & Override Engine
//!
//! Combines the five parameter risks into one score:
//! 1. Weighted baseline (health block, gas, fatigue)
//! 2. Ordered override ladder that only ever raises the score
//! 3. Three-way classification

use crate::reading::Reading;
use crate::scorer::{self, ParameterRisk};
use crate::zone::ZoneSensitivityTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Reason recorded when no override fires
pub const BASE_FUSION_REASON: &str = "Base fusion";

/// Risk at or above which a parameter counts as high
const HIGH_RISK: u8 = 70;

/// Risk at or above which a single parameter forces the hard override
const CRITICAL_RISK: u8 = 95;

/// Scored parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    HeartRate,
    Spo2,
    Temperature,
    Gas,
    Fatigue,
}

impl Parameter {
    pub const ALL: [Parameter; 5] = [
        Parameter::HeartRate,
        Parameter::Spo2,
        Parameter::Temperature,
        Parameter::Gas,
        Parameter::Fatigue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::HeartRate => "heart_rate",
            Parameter::Spo2 => "spo2",
            Parameter::Temperature => "temperature",
            Parameter::Gas => "gas",
            Parameter::Fatigue => "fatigue",
        }
    }
}

/// Worker safety classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Safe,
    Warning,
    Emergency,
}

impl SafetyStatus {
    /// Classify a fused score: <=40 safe, <=70 warning, above is emergency
    pub fn classify(score: u8) -> Self {
        if score <= 40 {
            SafetyStatus::Safe
        } else if score <= 70 {
            SafetyStatus::Warning
        } else {
            SafetyStatus::Emergency
        }
    }

    /// Whether this status opens or refreshes an alert
    pub fn requires_alert(&self) -> bool {
        !matches!(self, SafetyStatus::Safe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyStatus::Safe => "SAFE",
            SafetyStatus::Warning => "WARNING",
            SafetyStatus::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-parameter risks after zone adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RiskVector {
    pub heart_rate: u8,
    pub spo2: u8,
    pub temperature: u8,
    pub gas: u8,
    pub fatigue: u8,
}

impl RiskVector {
    pub fn get(&self, parameter: Parameter) -> u8 {
        match parameter {
            Parameter::HeartRate => self.heart_rate,
            Parameter::Spo2 => self.spo2,
            Parameter::Temperature => self.temperature,
            Parameter::Gas => self.gas,
            Parameter::Fatigue => self.fatigue,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Parameter, u8)> + '_ {
        Parameter::ALL.into_iter().map(move |p| (p, self.get(p)))
    }

    /// Number of parameters at or above `threshold`
    pub fn count_at_least(&self, threshold: u8) -> usize {
        self.iter().filter(|&(_, risk)| risk >= threshold).count()
    }

    /// Weighted baseline before overrides
    pub fn baseline(&self) -> u8 {
        let health = round_half_even(
            f64::from(self.heart_rate) * 0.4
                + f64::from(self.spo2) * 0.4
                + f64::from(self.temperature) * 0.2,
        );
        let fused = round_half_even(
            health * 0.35 + f64::from(self.gas) * 0.35 + f64::from(self.fatigue) * 0.30,
        );
        fused.clamp(0.0, 100.0) as u8
    }
}

fn round_half_even(value: f64) -> f64 {
    value.round_ties_even()
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    /// Raise to at least the floor and take the reason
    Floor(u8),
    /// Raise to at least the floor; take the reason only if no earlier override did
    FloorKeepingReason(u8),
    /// Replace the score outright and take the reason
    Force(u8),
}

struct OverrideRule {
    reason: &'static str,
    applies: fn(&RiskVector) -> bool,
    effect: Effect,
}

/// Evaluated in order; the hard override must stay last
const OVERRIDE_LADDER: [OverrideRule; 5] = [
    OverrideRule {
        reason: "Gas + Low O2",
        applies: |r| r.gas >= 85 && r.spo2 >= 45,
        effect: Effect::Floor(92),
    },
    OverrideRule {
        reason: "Critical fatigue + High HR",
        applies: |r| r.fatigue >= 70 && r.heart_rate >= 60,
        effect: Effect::Floor(90),
    },
    OverrideRule {
        reason: "Heat Stress",
        applies: |r| r.temperature >= 80 && r.heart_rate >= 60,
        effect: Effect::Floor(90),
    },
    OverrideRule {
        reason: "Multiple high risks",
        applies: |r| r.count_at_least(HIGH_RISK) >= 2,
        effect: Effect::FloorKeepingReason(88),
    },
    OverrideRule {
        reason: "Parameter >= 95",
        applies: |r| r.count_at_least(CRITICAL_RISK) >= 1,
        effect: Effect::Force(98),
    },
];

/// Fused score with the reason for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fusion {
    pub score: u8,
    pub reason: String,
}

impl Fusion {
    /// Apply the override ladder on top of the baseline
    pub fn of(risks: &RiskVector) -> Self {
        let mut score = risks.baseline();
        let mut reason: Option<&'static str> = None;

        for rule in OVERRIDE_LADDER.iter().filter(|rule| (rule.applies)(risks)) {
            match rule.effect {
                Effect::Floor(floor) => {
                    score = score.max(floor);
                    reason = Some(rule.reason);
                }
                Effect::FloorKeepingReason(floor) => {
                    score = score.max(floor);
                    reason.get_or_insert(rule.reason);
                }
                Effect::Force(value) => {
                    score = value;
                    reason = Some(rule.reason);
                }
            }
            debug!(rule = rule.reason, score, "Override applied");
        }

        Self {
            score,
            reason: reason.unwrap_or(BASE_FUSION_REASON).to_string(),
        }
    }
}

/// Full decision for one reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionDetail {
    pub parameter_risks: BTreeMap<Parameter, u8>,
    pub reasons: BTreeMap<Parameter, String>,
    pub fusion_reason: String,
    pub final_risk_score: u8,
    pub status: SafetyStatus,
}

impl DecisionDetail {
    /// Risks as a vector, in parameter order
    pub fn risk_vector(&self) -> RiskVector {
        let risk = |p: Parameter| self.parameter_risks.get(&p).copied().unwrap_or_default();
        RiskVector {
            heart_rate: risk(Parameter::HeartRate),
            spo2: risk(Parameter::Spo2),
            temperature: risk(Parameter::Temperature),
            gas: risk(Parameter::Gas),
            fatigue: risk(Parameter::Fatigue),
        }
    }
}

/// Zone-aware decision engine
#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    zones: ZoneSensitivityTable,
}

impl DecisionEngine {
    /// Create an engine with the given zone table
    pub fn new(zones: ZoneSensitivityTable) -> Self {
        Self { zones }
    }

    pub fn zones(&self) -> &ZoneSensitivityTable {
        &self.zones
    }

    /// Score, adjust, fuse and classify one reading
    pub fn evaluate(&self, reading: &Reading) -> DecisionDetail {
        let zone = self.zones.factor(&reading.zone);

        let scored: [(Parameter, ParameterRisk); 5] = [
            (Parameter::HeartRate, scorer::score_heart_rate(reading.heart_rate)),
            (Parameter::Spo2, scorer::score_spo2(reading.spo2, &zone)),
            (Parameter::Temperature, scorer::score_temperature(reading.temperature)),
            (Parameter::Gas, scorer::score_gas(reading.gas, &zone)),
            (Parameter::Fatigue, scorer::score_fatigue(&reading.fatigue)),
        ];

        let mut parameter_risks = BTreeMap::new();
        let mut reasons = BTreeMap::new();
        for (parameter, scored) in scored {
            parameter_risks.insert(parameter, scored.risk);
            reasons.insert(parameter, scored.reason);
        }

        let risks = RiskVector {
            heart_rate: parameter_risks[&Parameter::HeartRate],
            spo2: parameter_risks[&Parameter::Spo2],
            temperature: parameter_risks[&Parameter::Temperature],
            gas: parameter_risks[&Parameter::Gas],
            fatigue: parameter_risks[&Parameter::Fatigue],
        };
        let fusion = Fusion::of(&risks);
        let status = SafetyStatus::classify(fusion.score);

        debug!(
            worker_id = %reading.worker_id,
            zone = %zone.zone,
            score = fusion.score,
            status = %status,
            reason = %fusion.reason,
            "Reading evaluated"
        );

        DecisionDetail {
            parameter_risks,
            reasons,
            fusion_reason: fusion.reason,
            final_risk_score: fusion.score,
            status,
        }
    }
}
