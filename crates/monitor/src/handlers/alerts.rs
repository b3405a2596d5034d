//! Alert Operations
//!
//! Worker-initiated alerts (hazard, emergency button), operator actions, and
//! the operator's acknowledge/resolve flow.

use alerting::{Alert, AlertId, AlertOutcome, AlertTrigger, AlertType, Priority, Transition};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::{MonitorError, SafetyMonitor};

/// Device command sent with an admin STOP
pub const STOP_WORK_COMMAND: &str = "STOP WORK";

const MANUAL_EMERGENCY_REASON: &str = "Manual emergency button pressed";

/// Hazard a worker can report from the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HazardKind {
    GasLeak,
    Fire,
    OxygenDrop,
    HeatBurst,
}

impl HazardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardKind::GasLeak => "GAS_LEAK",
            HazardKind::Fire => "FIRE",
            HazardKind::OxygenDrop => "OXYGEN_DROP",
            HazardKind::HeatBurst => "HEAT_BURST",
        }
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HazardKind {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GAS_LEAK" => Ok(HazardKind::GasLeak),
            "FIRE" => Ok(HazardKind::Fire),
            "OXYGEN_DROP" => Ok(HazardKind::OxygenDrop),
            "HEAT_BURST" => Ok(HazardKind::HeatBurst),
            other => Err(MonitorError::InvalidRequest(format!(
                "invalid hazard type: {}",
                other
            ))),
        }
    }
}

/// Operator action on a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminAction {
    Allow,
    Restrict,
    Stop,
}

impl AdminAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Allow => "ALLOW",
            AdminAction::Restrict => "RESTRICT",
            AdminAction::Stop => "STOP",
        }
    }

    fn priority(&self) -> Priority {
        match self {
            AdminAction::Stop => Priority::Emergency,
            AdminAction::Allow | AdminAction::Restrict => Priority::Warning,
        }
    }

    fn command(&self) -> Option<&'static str> {
        match self {
            AdminAction::Stop => Some(STOP_WORK_COMMAND),
            AdminAction::Allow | AdminAction::Restrict => None,
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminAction {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW" => Ok(AdminAction::Allow),
            "RESTRICT" => Ok(AdminAction::Restrict),
            "STOP" => Ok(AdminAction::Stop),
            other => Err(MonitorError::InvalidRequest(format!(
                "invalid action: {}",
                other
            ))),
        }
    }
}

/// Response for an explicitly raised alert
#[derive(Debug, Clone, Serialize)]
pub struct AlertNotice {
    pub alert_id: AlertId,
    pub transition: Transition,
    pub play_sound: bool,
    pub banner: bool,
}

impl AlertNotice {
    pub(crate) fn urgent(outcome: &AlertOutcome) -> Self {
        Self {
            alert_id: outcome.alert.id,
            transition: outcome.transition,
            play_sound: true,
            banner: true,
        }
    }
}

/// Response for the active alert listing
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub data: Vec<Alert>,
    pub count: usize,
    pub unacknowledged_count: usize,
}

impl SafetyMonitor {
    /// Feed a trigger through the lifecycle and count the transition
    pub(crate) fn raise(&self, trigger: &AlertTrigger, now: DateTime<Utc>) -> AlertOutcome {
        let outcome = self.lifecycle.fire(trigger, now);
        record_transition(&outcome);
        outcome
    }

    /// Worker reported a hazard in the field
    pub fn report_hazard(
        &self,
        worker_id: &str,
        kind: HazardKind,
        now: DateTime<Utc>,
    ) -> Result<AlertNotice, MonitorError> {
        self.worker(worker_id)?;
        let outcome = self.raise(
            &AlertTrigger {
                worker_id: worker_id.to_string(),
                alert_type: AlertType::Hazard,
                priority: Priority::Emergency,
                reason: format!("Hazard reported: {}", kind),
            },
            now,
        );
        Ok(AlertNotice::urgent(&outcome))
    }

    /// Worker pressed the emergency button
    pub fn manual_emergency(
        &self,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<AlertNotice, MonitorError> {
        self.worker(worker_id)?;
        let outcome = self.raise(
            &AlertTrigger {
                worker_id: worker_id.to_string(),
                alert_type: AlertType::Manual,
                priority: Priority::Emergency,
                reason: MANUAL_EMERGENCY_REASON.to_string(),
            },
            now,
        );
        Ok(AlertNotice::urgent(&outcome))
    }

    /// Operator action: raises an ADMIN alert and queues a message for the
    /// worker's device, with a stop-work command for STOP
    pub fn admin_action(
        &self,
        worker_id: &str,
        action: AdminAction,
        now: DateTime<Utc>,
    ) -> Result<AlertNotice, MonitorError> {
        self.worker(worker_id)?;
        let reason = format!("Admin action: {}", action);
        let outcome = self.raise(
            &AlertTrigger {
                worker_id: worker_id.to_string(),
                alert_type: AlertType::Admin,
                priority: action.priority(),
                reason: reason.clone(),
            },
            now,
        );
        self.repository
            .queue_message(worker_id, &reason, action.command(), now)?;
        info!(worker_id, action = %action, "Admin action applied");

        Ok(AlertNotice {
            alert_id: outcome.alert.id,
            transition: outcome.transition,
            play_sound: action == AdminAction::Stop,
            banner: true,
        })
    }

    /// Unresolved alerts, most recently touched first
    pub fn active_alerts(&self) -> AlertSummary {
        let data = self.lifecycle.active();
        let unacknowledged_count = data.iter().filter(|a| !a.is_acknowledged()).count();
        AlertSummary {
            count: data.len(),
            unacknowledged_count,
            data,
        }
    }

    pub fn acknowledge_alert(
        &self,
        id: AlertId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, MonitorError> {
        Ok(self.lifecycle.acknowledge(id, actor, now)?)
    }

    pub fn resolve_alert(&self, id: AlertId) -> Result<Alert, MonitorError> {
        Ok(self.lifecycle.resolve(id)?)
    }
}

pub(crate) fn record_transition(outcome: &AlertOutcome) {
    let transition = match outcome.transition {
        Transition::Created => "created",
        Transition::Refreshed => "refreshed",
        Transition::Renewed => "renewed",
    };
    counter!(
        "safety_alert_transitions_total",
        "type" => outcome.alert.alert_type.as_str(),
        "transition" => transition
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hazard_kind_parse() {
        assert_eq!("GAS_LEAK".parse::<HazardKind>().unwrap(), HazardKind::GasLeak);
        assert_eq!("HEAT_BURST".parse::<HazardKind>().unwrap(), HazardKind::HeatBurst);
        assert!(matches!(
            "FLOOD".parse::<HazardKind>(),
            Err(MonitorError::InvalidRequest(_))
        ));
        assert_eq!(HazardKind::OxygenDrop.to_string(), "OXYGEN_DROP");
    }

    #[test]
    fn test_admin_action_mapping() {
        assert_eq!("STOP".parse::<AdminAction>().unwrap(), AdminAction::Stop);
        assert!("stop".parse::<AdminAction>().is_err());
        assert_eq!(AdminAction::Stop.priority(), Priority::Emergency);
        assert_eq!(AdminAction::Restrict.priority(), Priority::Warning);
        assert_eq!(AdminAction::Stop.command(), Some(STOP_WORK_COMMAND));
        assert_eq!(AdminAction::Allow.command(), None);
    }
}
