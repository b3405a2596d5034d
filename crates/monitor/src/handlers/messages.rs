//! Operator ↔ Device Messaging

use alerting::{AlertTrigger, AlertType, Priority};
use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::MessageRecord;
use tracing::info;

use super::alerts::{AlertNotice, STOP_WORK_COMMAND};
use crate::{MonitorError, SafetyMonitor};

const STOP_WORK_REASON: &str = "Admin issued STOP WORK";

/// Response for an operator message
#[derive(Debug, Clone, Serialize)]
pub struct MessageReceipt {
    pub message: MessageRecord,
    /// ADMIN alert raised by a stop-work command
    pub alert: Option<AlertNotice>,
}

impl SafetyMonitor {
    /// Queue a free-text message for a worker's device. With `stop_work`
    /// the message carries the stop-work command and raises an ADMIN
    /// emergency.
    pub fn send_message(
        &self,
        worker_id: &str,
        text: &str,
        stop_work: bool,
        now: DateTime<Utc>,
    ) -> Result<MessageReceipt, MonitorError> {
        self.worker(worker_id)?;
        if text.trim().is_empty() && !stop_work {
            return Err(MonitorError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let command = stop_work.then_some(STOP_WORK_COMMAND);
        let message = self.repository.queue_message(worker_id, text, command, now)?;

        let alert = stop_work.then(|| {
            let outcome = self.raise(
                &AlertTrigger {
                    worker_id: worker_id.to_string(),
                    alert_type: AlertType::Admin,
                    priority: Priority::Emergency,
                    reason: STOP_WORK_REASON.to_string(),
                },
                now,
            );
            AlertNotice::urgent(&outcome)
        });

        info!(worker_id, message_id = message.id, stop_work, "Message sent");
        Ok(MessageReceipt { message, alert })
    }

    /// Device confirms it has shown a message
    pub fn acknowledge_message(&self, id: u64) -> Result<MessageRecord, MonitorError> {
        self.repository
            .mark_delivered(id)
            .map_err(MonitorError::from_lookup)
    }
}
