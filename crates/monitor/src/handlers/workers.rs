//! Worker Status Operations

use alerting::{AlertId, WorkerActivity};
use chrono::{DateTime, Utc};
use metrics::counter;
use risk_engine::SafetyStatus;
use serde::Serialize;
use storage::{MessageRecord, ReadingRecord};
use tracing::debug;

use super::alerts::record_transition;
use crate::{MonitorError, SafetyMonitor};

/// One row of the operator overview
#[derive(Debug, Clone, Serialize)]
pub struct WorkerOverview {
    pub worker_id: String,
    pub name: String,
    pub zone: String,
    pub last_seen: Option<DateTime<Utc>>,
    /// `None` until the first reading
    pub status: Option<SafetyStatus>,
    pub risk_score: Option<u8>,
    pub heart_rate: Option<i64>,
    pub spo2: Option<i64>,
    pub temperature: Option<f64>,
    pub gas: Option<i64>,
    pub fatigue: Option<u8>,
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// Response for the operator overview
#[derive(Debug, Clone, Serialize)]
pub struct OverviewResponse {
    pub workers: Vec<WorkerOverview>,
    /// UNCONSCIOUS alerts opened or refreshed by this sweep
    pub inactivity_alerts: Vec<AlertId>,
    /// Alerts escalated by this sweep
    pub escalated: Vec<AlertId>,
}

/// Response for a worker device poll
#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    /// Latest status, SAFE before any reading
    pub status: SafetyStatus,
    pub history: Vec<ReadingRecord>,
    /// Operator messages delivered by this poll
    pub messages: Vec<MessageRecord>,
    pub play_sound: bool,
    pub banner: bool,
}

impl SafetyMonitor {
    /// Device poll: marks the worker as seen and returns recent state
    pub fn heartbeat(&self, worker_id: &str, now: DateTime<Utc>) -> Result<PollResponse, MonitorError> {
        self.worker(worker_id)?;
        self.repository.touch_worker(worker_id, now)?;

        let history = self.worker_history(worker_id, now)?;
        let messages = self.repository.take_pending_messages(worker_id)?;
        let status = self
            .repository
            .latest_reading(worker_id)?
            .map(|r| r.status)
            .unwrap_or(SafetyStatus::Safe);
        let alerting = status.requires_alert();

        Ok(PollResponse {
            status,
            history,
            messages,
            play_sound: alerting,
            banner: alerting,
        })
    }

    /// Operator overview. Runs the inactivity and escalation sweeps first,
    /// so every overview request doubles as a watchdog tick.
    pub fn overview(&self, now: DateTime<Utc>) -> Result<OverviewResponse, MonitorError> {
        let workers = self.repository.workers()?;

        let mut latest = Vec::with_capacity(workers.len());
        for worker in &workers {
            latest.push(self.repository.latest_reading(&worker.worker_id)?);
        }

        let activity: Vec<WorkerActivity> = workers
            .iter()
            .zip(&latest)
            .map(|(worker, reading)| WorkerActivity {
                worker_id: worker.worker_id.clone(),
                last_seen: worker.last_seen,
                last_status: reading.as_ref().map(|r| r.status),
            })
            .collect();

        let inactivity = self.inactivity.sweep(&self.lifecycle, &activity, now);
        inactivity.iter().for_each(record_transition);

        let escalated = self.lifecycle.escalate_overdue_default(now);
        if !escalated.is_empty() {
            counter!("safety_escalations_total").increment(escalated.len() as u64);
        }
        self.limiter.retain_recent();

        debug!(
            workers = workers.len(),
            inactivity = inactivity.len(),
            escalated = escalated.len(),
            "Overview sweep complete"
        );

        let rows = workers
            .into_iter()
            .zip(latest)
            .map(|(worker, reading)| WorkerOverview {
                worker_id: worker.worker_id,
                name: worker.name,
                zone: worker.zone,
                last_seen: worker.last_seen,
                status: reading.as_ref().map(|r| r.status),
                risk_score: reading.as_ref().map(|r| r.risk_score),
                heart_rate: reading.as_ref().map(|r| r.heart_rate),
                spo2: reading.as_ref().map(|r| r.spo2),
                temperature: reading.as_ref().map(|r| r.temperature),
                gas: reading.as_ref().map(|r| r.gas),
                fatigue: reading.as_ref().and_then(|r| r.fatigue),
                last_reading_at: reading.as_ref().map(|r| r.timestamp),
            })
            .collect();

        Ok(OverviewResponse {
            workers: rows,
            inactivity_alerts: inactivity.iter().map(|o| o.alert.id).collect(),
            escalated,
        })
    }
}
