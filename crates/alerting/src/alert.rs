//! Alert records

use chrono::{DateTime, Utc};
use risk_engine::SafetyStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential alert identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What raised the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    /// Decision engine classification
    Ai,
    /// Worker pressed the emergency button
    Manual,
    /// Worker went silent
    Unconscious,
    /// Worker reported a hazard
    Hazard,
    /// Operator action
    Admin,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Ai => "AI",
            AlertType::Manual => "MANUAL",
            AlertType::Unconscious => "UNCONSCIOUS",
            AlertType::Hazard => "HAZARD",
            AlertType::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert priority, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Info,
    Warning,
    Emergency,
}

impl Priority {
    /// Priority for a classified reading; safe readings raise nothing
    pub fn for_status(status: SafetyStatus) -> Option<Self> {
        match status {
            SafetyStatus::Safe => None,
            SafetyStatus::Warning => Some(Priority::Warning),
            SafetyStatus::Emergency => Some(Priority::Emergency),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "INFO",
            Priority::Warning => "WARNING",
            Priority::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduplication key: one unresolved alert per pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub worker_id: String,
    pub alert_type: AlertType,
}

impl AlertKey {
    pub fn new(worker_id: impl Into<String>, alert_type: AlertType) -> Self {
        Self {
            worker_id: worker_id.into(),
            alert_type,
        }
    }
}

/// Request to raise an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertTrigger {
    pub worker_id: String,
    pub alert_type: AlertType,
    pub priority: Priority,
    pub reason: String,
}

/// Stored alert record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub worker_id: String,
    pub alert_type: AlertType,
    pub priority: Priority,
    pub reason: String,
    /// Last time the record was created or refreshed
    pub timestamp: DateTime<Utc>,
    /// Triggers folded into this record
    pub count: u32,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub escalation_flag: bool,
}

impl Alert {
    pub(crate) fn open(id: AlertId, trigger: &AlertTrigger, now: DateTime<Utc>) -> Self {
        Self {
            id,
            worker_id: trigger.worker_id.clone(),
            alert_type: trigger.alert_type,
            priority: trigger.priority,
            reason: trigger.reason.clone(),
            timestamp: now,
            count: 1,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved: false,
            escalation_flag: false,
        }
    }

    pub fn key(&self) -> AlertKey {
        AlertKey::new(self.worker_id.clone(), self.alert_type)
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }

    /// Open, unseen by an operator, and not yet escalated
    pub fn awaiting_escalation(&self) -> bool {
        !self.resolved && !self.is_acknowledged() && !self.escalation_flag
    }
}
