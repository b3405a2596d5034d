//! Parameter Risk Scorers
//!
//! Each scorer clamps its input to a physiologically plausible range and
//! maps it through an ordered band table to a 0-100 risk.

use crate::reading::Fatigue;
use crate::zone::ZoneFactor;
use serde::{Deserialize, Serialize};

/// Risk assigned to fatigue values outside the known vocabulary
pub const FAIL_SAFE_FATIGUE_RISK: u8 = 70;

/// Risk and audit text for one parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRisk {
    /// 0-100
    pub risk: u8,
    pub reason: String,
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    Below(f64),
    AtMost(f64),
    AtLeast(f64),
    Otherwise,
}

impl Edge {
    fn admits(self, value: f64) -> bool {
        match self {
            Edge::Below(limit) => value < limit,
            Edge::AtMost(limit) => value <= limit,
            Edge::AtLeast(limit) => value >= limit,
            Edge::Otherwise => true,
        }
    }
}

/// Clamp range plus bands, checked in order; the first admitting band wins
struct Scale {
    min: f64,
    max: f64,
    bands: &'static [(Edge, u8)],
}

impl Scale {
    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    fn risk(&self, clamped: f64) -> u8 {
        self.bands
            .iter()
            .find(|(edge, _)| edge.admits(clamped))
            .map(|&(_, risk)| risk)
            .unwrap_or(95)
    }
}

const HEART_RATE: Scale = Scale {
    min: 30.0,
    max: 220.0,
    bands: &[
        (Edge::Below(40.0), 80),
        (Edge::Below(50.0), 60),
        (Edge::AtMost(100.0), 10),
        (Edge::AtMost(120.0), 40),
        (Edge::AtMost(140.0), 60),
        (Edge::AtMost(180.0), 85),
        (Edge::Otherwise, 95),
    ],
};

const SPO2: Scale = Scale {
    min: 50.0,
    max: 100.0,
    bands: &[
        (Edge::AtLeast(95.0), 5),
        (Edge::AtLeast(92.0), 20),
        (Edge::AtLeast(90.0), 45),
        (Edge::AtLeast(85.0), 70),
        (Edge::Otherwise, 95),
    ],
};

const TEMPERATURE: Scale = Scale {
    min: 28.0,
    max: 45.0,
    bands: &[
        (Edge::Below(35.0), 30),
        (Edge::AtMost(38.0), 10),
        (Edge::AtMost(39.5), 45),
        (Edge::AtMost(41.0), 80),
        (Edge::Otherwise, 95),
    ],
};

const GAS: Scale = Scale {
    min: 0.0,
    max: 5000.0,
    bands: &[
        (Edge::AtMost(50.0), 5),
        (Edge::AtMost(200.0), 25),
        (Edge::AtMost(400.0), 60),
        (Edge::AtMost(1000.0), 85),
        (Edge::Otherwise, 95),
    ],
};

/// Score heart rate (bpm)
pub fn score_heart_rate(bpm: i64) -> ParameterRisk {
    let bpm = HEART_RATE.clamp(bpm as f64);
    let risk = HEART_RATE.risk(bpm);
    ParameterRisk {
        risk,
        reason: format!("HR {} -> risk {}", bpm, risk),
    }
}

/// Score oxygen saturation (%), adjusted for the zone
pub fn score_spo2(percent: i64, zone: &ZoneFactor) -> ParameterRisk {
    let percent = SPO2.clamp(percent as f64);
    let risk = zone.adjust(SPO2.risk(percent));
    ParameterRisk {
        risk,
        reason: format!("SpO2 {}% -> risk {}", percent, risk),
    }
}

/// Score body temperature (°C)
pub fn score_temperature(celsius: f64) -> ParameterRisk {
    let celsius = TEMPERATURE.clamp(celsius);
    let risk = TEMPERATURE.risk(celsius);
    ParameterRisk {
        risk,
        reason: format!("Temp {:?}C -> risk {}", celsius, risk),
    }
}

/// Score gas concentration (ppm), adjusted for the zone
pub fn score_gas(ppm: i64, zone: &ZoneFactor) -> ParameterRisk {
    let ppm = GAS.clamp(ppm as f64);
    let risk = zone.adjust(GAS.risk(ppm));
    ParameterRisk {
        risk,
        reason: format!("Gas {}ppm zone {} -> risk {}", ppm, zone.zone, risk),
    }
}

/// Score fatigue; unrecognized values take the fail-safe band
pub fn score_fatigue(fatigue: &Fatigue) -> ParameterRisk {
    match fatigue {
        Fatigue::Low => fatigue_risk(fatigue, 5),
        Fatigue::Medium => fatigue_risk(fatigue, 35),
        Fatigue::High => fatigue_risk(fatigue, 70),
        Fatigue::Unrecognized(raw) => ParameterRisk {
            risk: FAIL_SAFE_FATIGUE_RISK,
            reason: format!(
                "Fatigue {} unrecognized -> risk {}",
                raw, FAIL_SAFE_FATIGUE_RISK
            ),
        },
    }
}

fn fatigue_risk(fatigue: &Fatigue, risk: u8) -> ParameterRisk {
    ParameterRisk {
        risk,
        reason: format!("Fatigue {} -> risk {}", fatigue, risk),
    }
}
