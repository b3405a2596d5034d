//! Reading Submission

use alerting::{AlertId, AlertTrigger, AlertType, Priority};
use chrono::{DateTime, Utc};
use data_validator::ReadingSubmission;
use metrics::counter;
use risk_engine::{DecisionDetail, SafetyStatus};
use serde::Serialize;
use storage::ReadingRecord;
use tracing::{debug, warn};

use crate::{MonitorError, SafetyMonitor};

/// Response for a submitted reading
#[derive(Debug, Clone, Serialize)]
pub struct ReadingOutcome {
    pub worker_id: String,
    pub status: SafetyStatus,
    pub risk_score: u8,
    pub detail: DecisionDetail,
    /// Device should sound the alarm
    pub play_sound: bool,
    /// Device should show the alert banner
    pub banner: bool,
    /// AI alert opened or refreshed by this reading
    pub alert_id: Option<AlertId>,
}

impl SafetyMonitor {
    /// Validate, admit, evaluate and persist one reading, then raise an AI
    /// alert when the status is WARNING or EMERGENCY.
    ///
    /// The sound plays on every EMERGENCY and on the first trigger of a
    /// WARNING episode; repeats inside the cooldown only keep the banner.
    pub fn submit_reading(
        &self,
        worker_id: &str,
        submission: &ReadingSubmission,
        now: DateTime<Utc>,
    ) -> Result<ReadingOutcome, MonitorError> {
        let worker = self.worker(worker_id)?;
        let reading = self
            .validator
            .validate(submission, &worker.worker_id, &worker.zone, now)?;

        if !self.limiter.check(worker_id) {
            counter!("safety_rate_limited_total").increment(1);
            warn!(worker_id, "Reading rejected by rate limiter");
            return Err(MonitorError::RateLimited(worker_id.to_string()));
        }

        let detail = self.engine.evaluate(&reading);
        self.repository
            .insert_reading(ReadingRecord::from_decision(&reading, &detail))?;
        self.repository.touch_worker(worker_id, now)?;
        counter!("safety_readings_total", "status" => detail.status.as_str()).increment(1);

        let (play_sound, banner, alert_id) = match Priority::for_status(detail.status) {
            Some(priority) => {
                let outcome = self.raise(
                    &AlertTrigger {
                        worker_id: worker_id.to_string(),
                        alert_type: AlertType::Ai,
                        priority,
                        reason: detail.fusion_reason.clone(),
                    },
                    now,
                );
                let play_sound =
                    detail.status == SafetyStatus::Emergency || outcome.is_fresh_episode();
                (play_sound, true, Some(outcome.alert.id))
            }
            None => (false, false, None),
        };

        debug!(
            worker_id,
            status = %detail.status,
            score = detail.final_risk_score,
            play_sound,
            "Reading processed"
        );

        Ok(ReadingOutcome {
            worker_id: worker_id.to_string(),
            status: detail.status,
            risk_score: detail.final_risk_score,
            detail,
            play_sound,
            banner,
            alert_id,
        })
    }

    /// Most recent reading for a worker
    pub fn latest_reading(&self, worker_id: &str) -> Result<Option<ReadingRecord>, MonitorError> {
        self.worker(worker_id)?;
        Ok(self.repository.latest_reading(worker_id)?)
    }

    /// Readings inside the configured history window, oldest first
    pub fn worker_history(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReadingRecord>, MonitorError> {
        self.worker(worker_id)?;
        Ok(self
            .repository
            .readings_since(worker_id, now - self.history_window)?)
    }
}
