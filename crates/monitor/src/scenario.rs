//! Scripted Scenario Replay
//!
//! Drives the monitor with canned worker readings on a fixed tick, the way a
//! fleet of wearables would. Used by the demo binary and the replay tests.

use chrono::{DateTime, Utc};
use data_validator::{FatigueInput, ReadingSubmission};
use risk_engine::SafetyStatus;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::{AlertId, MonitorError, SafetyMonitor};

/// One worker's scripted readings, one per tick
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub worker_id: String,
    pub worker_name: String,
    pub zone: String,
    pub frames: Vec<ReadingSubmission>,
}

/// Totals from a replay run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    pub ticks: usize,
    pub readings: usize,
    pub rate_limited: usize,
    /// Last status seen per worker
    pub last_status: BTreeMap<String, SafetyStatus>,
    pub escalated: Vec<AlertId>,
}

fn frame(heart_rate: f64, spo2: f64, temperature: f64, gas: f64, fatigue: &str) -> ReadingSubmission {
    ReadingSubmission {
        heart_rate: Some(heart_rate),
        spo2: Some(spo2),
        temperature: Some(temperature),
        gas: Some(gas),
        fatigue: Some(FatigueInput::Text(fatigue.to_string())),
    }
}

fn scenario(
    name: &'static str,
    worker_id: &str,
    worker_name: &str,
    zone: &str,
    frames: Vec<ReadingSubmission>,
) -> Scenario {
    Scenario {
        name,
        worker_id: worker_id.to_string(),
        worker_name: worker_name.to_string(),
        zone: zone.to_string(),
        frames,
    }
}

/// Normal shift, SpO2 drift, gas spike, and fatigue collapse
pub fn demo_scenarios() -> Vec<Scenario> {
    vec![
        scenario(
            "normal",
            "W-101",
            "Ravi",
            "NORMAL",
            (0..8u32)
                .map(|i| frame(76.0 + f64::from(i % 3), 98.0, 36.7, 12.0, "low"))
                .collect(),
        ),
        scenario(
            "spo2-warning",
            "W-102",
            "Meera",
            "MINING",
            [
                (97.0, 88.0, 37.0, 20.0, "low"),
                (95.0, 96.0, 37.4, 40.0, "low"),
                (93.0, 104.0, 37.9, 60.0, "low"),
                (92.0, 112.0, 38.3, 90.0, "medium"),
                (91.0, 118.0, 38.8, 120.0, "medium"),
                (90.0, 135.0, 39.2, 180.0, "medium"),
                (90.0, 135.0, 39.2, 180.0, "medium"),
                (90.0, 135.0, 39.2, 180.0, "medium"),
            ]
            .into_iter()
            .map(|(spo2, heart_rate, temperature, gas, fatigue)| {
                frame(heart_rate, spo2, temperature, gas, fatigue)
            })
            .collect(),
        ),
        scenario(
            "gas-spike",
            "W-103",
            "Karthik",
            "CHEMICAL",
            [15.0, 18.0, 40.0, 85.0, 140.0, 260.0, 480.0, 520.0]
                .into_iter()
                .map(|gas| frame(92.0, 97.0, 37.1, gas, "low"))
                .collect(),
        ),
        scenario(
            "fatigue-collapse",
            "W-104",
            "Anita",
            "FIRE-RESCUE",
            [
                (90.0, "low"),
                (104.0, "low"),
                (112.0, "medium"),
                (121.0, "medium"),
                (128.0, "high"),
                (134.0, "high"),
                (141.0, "high"),
                (146.0, "high"),
            ]
            .into_iter()
            .map(|(heart_rate, fatigue)| frame(heart_rate, 95.0, 38.4, 25.0, fatigue))
            .collect(),
        ),
    ]
}

/// Register every scenario's worker
pub fn register_scenarios(
    monitor: &SafetyMonitor,
    scenarios: &[Scenario],
    now: DateTime<Utc>,
) -> Result<(), MonitorError> {
    for s in scenarios {
        monitor.register_worker(&s.worker_id, &s.worker_name, &s.zone, now)?;
    }
    Ok(())
}

/// Replay all scenarios, one frame per worker per tick.
///
/// Reading timestamps advance by `period` from `start` regardless of wall
/// time. After each tick the overview sweep runs. Rate-limited readings are
/// counted and skipped; any other error stops the replay.
pub async fn run_scenarios(
    monitor: &SafetyMonitor,
    scenarios: &[Scenario],
    period: Duration,
    start: DateTime<Utc>,
) -> Result<ReplaySummary, MonitorError> {
    let step = chrono::Duration::from_std(period)
        .map_err(|e| MonitorError::InvalidRequest(format!("replay period: {}", e)))?;
    let ticks = scenarios.iter().map(|s| s.frames.len()).max().unwrap_or(0);
    let mut interval = tokio::time::interval(period);
    let mut summary = ReplaySummary::default();

    info!(scenarios = scenarios.len(), ticks, "Starting scenario replay");

    let mut now = start;
    for tick in 0..ticks {
        interval.tick().await;

        for s in scenarios {
            let Some(submission) = s.frames.get(tick) else {
                continue;
            };

            match monitor.submit_reading(&s.worker_id, submission, now) {
                Ok(outcome) => {
                    info!(
                        scenario = s.name,
                        worker_id = %s.worker_id,
                        tick,
                        status = %outcome.status,
                        score = outcome.risk_score,
                        reason = %outcome.detail.fusion_reason,
                        play_sound = outcome.play_sound,
                        "Reading evaluated"
                    );
                    summary.readings += 1;
                    summary.last_status.insert(s.worker_id.clone(), outcome.status);
                }
                Err(MonitorError::RateLimited(worker_id)) => {
                    warn!(scenario = s.name, worker_id = %worker_id, tick, "Reading dropped");
                    summary.rate_limited += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let overview = monitor.overview(now)?;
        summary.escalated.extend(overview.escalated);
        summary.ticks += 1;
        now = now + step;
    }

    info!(
        readings = summary.readings,
        rate_limited = summary.rate_limited,
        escalated = summary.escalated.len(),
        "Scenario replay finished"
    );
    Ok(summary)
}
