//! Inactivity detection
//!
//! A worker who stops reporting may be unconscious. When the last contact is
//! older than the timeout and the worker is not already known to be in an
//! emergency, an UNCONSCIOUS alert is raised through the normal lifecycle.

use crate::alert::{AlertTrigger, AlertType, Priority};
use crate::lifecycle::{AlertLifecycle, AlertOutcome};
use chrono::{DateTime, Duration, Utc};
use risk_engine::SafetyStatus;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const UNCONSCIOUS_REASON: &str = "No recent activity - possible unconsciousness";

/// What is known about a worker's most recent contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerActivity {
    pub worker_id: String,
    /// Last reading or poll; `None` if never seen
    pub last_seen: Option<DateTime<Utc>>,
    /// Status of the latest reading, if any
    pub last_status: Option<SafetyStatus>,
}

/// Raises UNCONSCIOUS triggers for silent workers
#[derive(Debug, Clone)]
pub struct InactivityDetector {
    timeout: Duration,
}

impl InactivityDetector {
    pub fn new(timeout_seconds: u64) -> Self {
        let seconds = i64::try_from(timeout_seconds)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        Self {
            timeout: Duration::seconds(seconds),
        }
    }

    /// Trigger for this worker, if silent past the timeout
    pub fn check(&self, activity: &WorkerActivity, now: DateTime<Utc>) -> Option<AlertTrigger> {
        let last_seen = activity.last_seen?;
        if now - last_seen <= self.timeout {
            return None;
        }
        if activity.last_status == Some(SafetyStatus::Emergency) {
            return None;
        }

        Some(AlertTrigger {
            worker_id: activity.worker_id.clone(),
            alert_type: AlertType::Unconscious,
            priority: Priority::Emergency,
            reason: UNCONSCIOUS_REASON.to_string(),
        })
    }

    /// Check every worker and feed triggers through the lifecycle
    pub fn sweep<'a, I>(
        &self,
        lifecycle: &AlertLifecycle,
        workers: I,
        now: DateTime<Utc>,
    ) -> Vec<AlertOutcome>
    where
        I: IntoIterator<Item = &'a WorkerActivity>,
    {
        workers
            .into_iter()
            .filter_map(|activity| self.check(activity, now))
            .map(|trigger| {
                warn!(worker_id = %trigger.worker_id, "No recent activity from worker");
                lifecycle.fire(&trigger, now)
            })
            .collect()
    }
}

impl Default for InactivityDetector {
    fn default() -> Self {
        Self::new(45)
    }
}
