//! Alert Lifecycle State Machine

use crate::alert::{Alert, AlertId, AlertKey, AlertTrigger, AlertType, Priority};
use crate::AlertError;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which priorities the escalation sweep covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationScope {
    #[default]
    EmergencyOnly,
    AllPriorities,
}

impl EscalationScope {
    fn covers(self, priority: Priority) -> bool {
        match self {
            EscalationScope::EmergencyOnly => priority == Priority::Emergency,
            EscalationScope::AllPriorities => true,
        }
    }
}

/// Lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Window in which a repeat trigger refreshes the open alert (seconds)
    pub cooldown_seconds: u64,
    /// Age after which an unacknowledged alert is escalated (seconds)
    pub escalate_after_seconds: u64,
    /// Priorities covered by the escalation sweep
    pub escalation_scope: EscalationScope,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 30,
            escalate_after_seconds: 60,
            escalation_scope: EscalationScope::EmergencyOnly,
        }
    }
}

impl LifecycleConfig {
    fn cooldown(&self) -> Duration {
        seconds(self.cooldown_seconds)
    }

    fn escalation_deadline(&self) -> Duration {
        seconds(self.escalate_after_seconds)
    }
}

fn seconds(value: u64) -> Duration {
    // chrono caps durations at i64::MAX milliseconds
    let capped = i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1_000);
    Duration::seconds(capped)
}

/// How a trigger was folded into the alert records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// No unresolved record existed; a new one was opened
    Created,
    /// Repeat trigger inside the cooldown window
    Refreshed,
    /// Repeat trigger after the cooldown lapsed on a still-open record
    Renewed,
}

/// Result of a create-or-update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertOutcome {
    /// Snapshot of the record after the transition
    pub alert: Alert,
    pub transition: Transition,
}

impl AlertOutcome {
    /// A new record was inserted
    pub fn created(&self) -> bool {
        self.transition == Transition::Created
    }

    /// The trigger starts a new episode (new record or lapsed cooldown)
    pub fn is_fresh_episode(&self) -> bool {
        self.transition != Transition::Refreshed
    }
}

/// Records for one key, oldest first
type Slot = Arc<Mutex<Vec<Alert>>>;

/// Keyed alert state.
///
/// Each (worker, alert type) pair owns a slot whose mutex guards the full
/// read-decide-write of every transition on that pair. Different pairs never
/// wait on each other beyond the slot map lookup.
pub struct AlertLifecycle {
    config: LifecycleConfig,
    next_id: AtomicU64,
    slots: RwLock<HashMap<AlertKey, Slot>>,
    index: RwLock<HashMap<AlertId, AlertKey>>,
}

impl AlertLifecycle {
    /// Create an empty lifecycle
    pub fn new(config: LifecycleConfig) -> Self {
        info!("Creating alert lifecycle with config: {:?}", config);
        Self {
            config,
            next_id: AtomicU64::new(1),
            slots: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    fn slot(&self, key: &AlertKey) -> Slot {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(key.clone()).or_default())
    }

    fn slot_for_id(&self, id: AlertId) -> Result<Slot, AlertError> {
        let key = self
            .index
            .read()
            .get(&id)
            .cloned()
            .ok_or(AlertError::NotFound(id))?;
        Ok(self.slot(&key))
    }

    /// Open a new alert or fold the trigger into the open one for the same key
    pub fn create_or_update(
        &self,
        worker_id: &str,
        alert_type: AlertType,
        priority: Priority,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AlertOutcome {
        self.fire(
            &AlertTrigger {
                worker_id: worker_id.to_string(),
                alert_type,
                priority,
                reason: reason.to_string(),
            },
            now,
        )
    }

    /// Same as [`create_or_update`](Self::create_or_update) for a prepared trigger
    pub fn fire(&self, trigger: &AlertTrigger, now: DateTime<Utc>) -> AlertOutcome {
        let key = AlertKey::new(trigger.worker_id.clone(), trigger.alert_type);
        let slot = self.slot(&key);
        let mut records = slot.lock();

        if let Some(open) = records.iter_mut().rev().find(|alert| !alert.resolved) {
            let within_cooldown = now - open.timestamp <= self.config.cooldown();
            let transition = if within_cooldown {
                Transition::Refreshed
            } else {
                Transition::Renewed
            };

            // A renewal takes the new reason unless it would describe a lower priority
            let takes_reason = match transition {
                Transition::Renewed => trigger.priority >= open.priority,
                _ => trigger.priority > open.priority,
            };
            if takes_reason {
                open.priority = open.priority.max(trigger.priority);
                open.reason = trigger.reason.clone();
            }
            open.timestamp = now;
            open.count = open.count.saturating_add(1);

            debug!(
                alert_id = %open.id,
                worker_id = %open.worker_id,
                alert_type = %open.alert_type,
                count = open.count,
                ?transition,
                "Alert updated"
            );
            return AlertOutcome {
                alert: open.clone(),
                transition,
            };
        }

        let id = AlertId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let alert = Alert::open(id, trigger, now);
        records.push(alert.clone());
        self.index.write().insert(id, key);

        info!(
            alert_id = %id,
            worker_id = %alert.worker_id,
            alert_type = %alert.alert_type,
            priority = %alert.priority,
            reason = %alert.reason,
            "Alert created"
        );
        AlertOutcome {
            alert,
            transition: Transition::Created,
        }
    }

    /// Flag open, unacknowledged alerts older than the escalation deadline.
    ///
    /// Returns the ids flagged by this sweep; already-flagged alerts are skipped.
    pub fn escalate_overdue(&self, now: DateTime<Utc>, scope: EscalationScope) -> Vec<AlertId> {
        let deadline = self.config.escalation_deadline();
        let slots: Vec<Slot> = self.slots.read().values().cloned().collect();
        let mut escalated = Vec::new();

        for slot in slots {
            let mut records = slot.lock();
            for alert in records.iter_mut() {
                if alert.awaiting_escalation()
                    && scope.covers(alert.priority)
                    && now - alert.timestamp > deadline
                {
                    alert.escalation_flag = true;
                    escalated.push(alert.id);
                    warn!(
                        alert_id = %alert.id,
                        worker_id = %alert.worker_id,
                        alert_type = %alert.alert_type,
                        "Alert escalated: unacknowledged past deadline"
                    );
                }
            }
        }

        escalated.sort();
        escalated
    }

    /// Sweep with the configured scope
    pub fn escalate_overdue_default(&self, now: DateTime<Utc>) -> Vec<AlertId> {
        self.escalate_overdue(now, self.config.escalation_scope)
    }

    /// Record that an operator has seen the alert
    pub fn acknowledge(
        &self,
        id: AlertId,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Alert, AlertError> {
        let slot = self.slot_for_id(id)?;
        let mut records = slot.lock();
        let alert = records
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or(AlertError::NotFound(id))?;

        if alert.resolved {
            return Err(AlertError::AlreadyResolved(id));
        }

        alert.acknowledged_by = Some(actor.to_string());
        alert.acknowledged_at = Some(now);
        info!(alert_id = %id, acknowledged_by = actor, "Alert acknowledged");
        Ok(alert.clone())
    }

    /// Close the alert; a later trigger opens a fresh record
    pub fn resolve(&self, id: AlertId) -> Result<Alert, AlertError> {
        let slot = self.slot_for_id(id)?;
        let mut records = slot.lock();
        let alert = records
            .iter_mut()
            .find(|alert| alert.id == id)
            .ok_or(AlertError::NotFound(id))?;

        if !alert.resolved {
            alert.resolved = true;
            info!(alert_id = %id, worker_id = %alert.worker_id, "Alert resolved");
        }
        Ok(alert.clone())
    }

    /// Look up one alert
    pub fn get(&self, id: AlertId) -> Option<Alert> {
        let slot = self.slot_for_id(id).ok()?;
        let records = slot.lock();
        records.iter().find(|alert| alert.id == id).cloned()
    }

    /// The unresolved alert for a key, if any
    pub fn open_alert(&self, worker_id: &str, alert_type: AlertType) -> Option<Alert> {
        let key = AlertKey::new(worker_id, alert_type);
        let slot = self.slots.read().get(&key).cloned()?;
        let records = slot.lock();
        records.iter().rev().find(|alert| !alert.resolved).cloned()
    }

    /// All unresolved alerts, most recently touched first
    pub fn active(&self) -> Vec<Alert> {
        self.collect(|alert| !alert.resolved)
    }

    /// Unresolved alerts no operator has acknowledged yet
    pub fn unacknowledged(&self) -> Vec<Alert> {
        self.collect(|alert| !alert.resolved && !alert.is_acknowledged())
    }

    /// Every alert ever raised for a worker, most recently touched first
    pub fn history(&self, worker_id: &str) -> Vec<Alert> {
        self.collect(|alert| alert.worker_id == worker_id)
    }

    fn collect(&self, keep: impl Fn(&Alert) -> bool) -> Vec<Alert> {
        let slots: Vec<Slot> = self.slots.read().values().cloned().collect();
        let mut alerts: Vec<Alert> = slots
            .iter()
            .flat_map(|slot| {
                slot.lock()
                    .iter()
                    .filter(|alert| keep(alert))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        alerts
    }

    /// Total records held, resolved included
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AlertLifecycle {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn test_first_trigger_creates() {
        let lifecycle = AlertLifecycle::default();
        let outcome =
            lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        assert!(outcome.created());
        assert_eq!(outcome.alert.count, 1);
        assert_eq!(outcome.alert.timestamp, t0());
        assert_eq!(lifecycle.len(), 1);
    }

    #[test]
    fn test_repeat_within_cooldown_refreshes() {
        let lifecycle = AlertLifecycle::default();
        let first = lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        let second = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Warning,
            "x",
            t0() + secs(5),
        );
        assert!(!second.created());
        assert_eq!(second.transition, Transition::Refreshed);
        assert_eq!(second.alert.count, 2);
        assert_eq!(second.alert.id, first.alert.id);
        assert_eq!(second.alert.timestamp, t0() + secs(5));
        assert_eq!(lifecycle.len(), 1);
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let lifecycle = AlertLifecycle::default();
        lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        let at_edge = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Warning,
            "x",
            t0() + secs(30),
        );
        assert_eq!(at_edge.transition, Transition::Refreshed);
    }

    #[test]
    fn test_lapsed_cooldown_renews_open_record() {
        let lifecycle = AlertLifecycle::default();
        let first = lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "old", t0());
        let later = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Warning,
            "new",
            t0() + secs(31),
        );
        assert_eq!(later.transition, Transition::Renewed);
        assert!(!later.created());
        assert!(later.is_fresh_episode());
        assert_eq!(later.alert.id, first.alert.id);
        assert_eq!(later.alert.count, 2);
        assert_eq!(later.alert.reason, "new");
        assert_eq!(lifecycle.active().len(), 1);
    }

    #[test]
    fn test_renewal_keeps_reason_of_higher_priority() {
        let lifecycle = AlertLifecycle::default();
        lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Emergency, "Gas + Low O2", t0());
        let renewed = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Warning,
            "Base fusion",
            t0() + secs(31),
        );
        assert_eq!(renewed.transition, Transition::Renewed);
        assert_eq!(renewed.alert.priority, Priority::Emergency);
        assert_eq!(renewed.alert.reason, "Gas + Low O2");
        assert_eq!(renewed.alert.timestamp, t0() + secs(31));
        assert_eq!(renewed.alert.count, 2);
    }

    #[test]
    fn test_resolved_record_never_blocks() {
        let lifecycle = AlertLifecycle::default();
        let first = lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        lifecycle.resolve(first.alert.id).unwrap();

        let next = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Warning,
            "x",
            t0() + secs(1),
        );
        assert!(next.created());
        assert_ne!(next.alert.id, first.alert.id);
        assert_eq!(next.alert.count, 1);
        assert_eq!(lifecycle.history("W-1").len(), 2);
        assert_eq!(lifecycle.active().len(), 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let lifecycle = AlertLifecycle::default();
        let ai = lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        let manual =
            lifecycle.create_or_update("W-1", AlertType::Manual, Priority::Emergency, "y", t0());
        let other = lifecycle.create_or_update("W-2", AlertType::Ai, Priority::Warning, "x", t0());
        assert!(ai.created() && manual.created() && other.created());
        assert_eq!(lifecycle.active().len(), 3);
    }

    #[test]
    fn test_refresh_upgrades_priority() {
        let lifecycle = AlertLifecycle::default();
        lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "Base fusion", t0());
        let upgraded = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Emergency,
            "Gas + Low O2",
            t0() + secs(2),
        );
        assert_eq!(upgraded.alert.priority, Priority::Emergency);
        assert_eq!(upgraded.alert.reason, "Gas + Low O2");

        let downgraded = lifecycle.create_or_update(
            "W-1",
            AlertType::Ai,
            Priority::Warning,
            "Base fusion",
            t0() + secs(4),
        );
        assert_eq!(downgraded.alert.priority, Priority::Emergency);
        assert_eq!(downgraded.alert.reason, "Gas + Low O2");
    }

    #[test]
    fn test_escalation_is_idempotent() {
        let lifecycle = AlertLifecycle::default();
        let outcome =
            lifecycle.create_or_update("W-1", AlertType::Manual, Priority::Emergency, "sos", t0());

        assert!(lifecycle
            .escalate_overdue(t0() + secs(60), EscalationScope::EmergencyOnly)
            .is_empty());

        let first = lifecycle.escalate_overdue(t0() + secs(61), EscalationScope::EmergencyOnly);
        assert_eq!(first, vec![outcome.alert.id]);
        let second = lifecycle.escalate_overdue(t0() + secs(90), EscalationScope::EmergencyOnly);
        assert!(second.is_empty());

        let alert = lifecycle.get(outcome.alert.id).unwrap();
        assert!(alert.escalation_flag);
        assert_eq!(alert.count, 1);
        assert_eq!(alert.timestamp, t0());
    }

    #[test]
    fn test_escalation_scope() {
        let lifecycle = AlertLifecycle::default();
        let warning = lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        let later = t0() + secs(120);

        assert!(lifecycle
            .escalate_overdue(later, EscalationScope::EmergencyOnly)
            .is_empty());
        assert_eq!(
            lifecycle.escalate_overdue(later, EscalationScope::AllPriorities),
            vec![warning.alert.id]
        );
    }

    #[test]
    fn test_acknowledged_and_resolved_alerts_not_escalated() {
        let lifecycle = AlertLifecycle::default();
        let acked = lifecycle.create_or_update("W-1", AlertType::Manual, Priority::Emergency, "a", t0());
        let resolved =
            lifecycle.create_or_update("W-2", AlertType::Manual, Priority::Emergency, "b", t0());
        lifecycle.acknowledge(acked.alert.id, "supervisor", t0() + secs(10)).unwrap();
        lifecycle.resolve(resolved.alert.id).unwrap();

        assert!(lifecycle.escalate_overdue_default(t0() + secs(300)).is_empty());
    }

    #[test]
    fn test_acknowledge_keeps_escalation_and_stays_open() {
        let lifecycle = AlertLifecycle::default();
        let outcome =
            lifecycle.create_or_update("W-1", AlertType::Hazard, Priority::Emergency, "fire", t0());
        lifecycle.escalate_overdue_default(t0() + secs(61));

        let acked = lifecycle
            .acknowledge(outcome.alert.id, "supervisor", t0() + secs(70))
            .unwrap();
        assert!(acked.escalation_flag);
        assert!(!acked.resolved);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("supervisor"));
        assert_eq!(acked.acknowledged_at, Some(t0() + secs(70)));
        assert_eq!(lifecycle.unacknowledged().len(), 0);
        assert_eq!(lifecycle.active().len(), 1);
    }

    #[test]
    fn test_resolve_keeps_history() {
        let lifecycle = AlertLifecycle::default();
        let outcome =
            lifecycle.create_or_update("W-1", AlertType::Hazard, Priority::Emergency, "fire", t0());
        lifecycle.escalate_overdue_default(t0() + secs(61));
        lifecycle.acknowledge(outcome.alert.id, "ops", t0() + secs(62)).unwrap();

        let resolved = lifecycle.resolve(outcome.alert.id).unwrap();
        assert!(resolved.resolved);
        assert!(resolved.escalation_flag);
        assert_eq!(resolved.acknowledged_by.as_deref(), Some("ops"));

        // resolving twice is harmless
        assert!(lifecycle.resolve(outcome.alert.id).unwrap().resolved);
        assert_eq!(
            lifecycle.acknowledge(outcome.alert.id, "ops", t0() + secs(63)),
            Err(AlertError::AlreadyResolved(outcome.alert.id))
        );
        assert!(lifecycle.open_alert("W-1", AlertType::Hazard).is_none());
    }

    #[test]
    fn test_unknown_ids() {
        let lifecycle = AlertLifecycle::default();
        assert_eq!(
            lifecycle.resolve(AlertId(99)),
            Err(AlertError::NotFound(AlertId(99)))
        );
        assert_eq!(
            lifecycle.acknowledge(AlertId(99), "ops", t0()),
            Err(AlertError::NotFound(AlertId(99)))
        );
        assert!(lifecycle.get(AlertId(99)).is_none());
    }

    #[test]
    fn test_active_sorted_by_recency() {
        let lifecycle = AlertLifecycle::default();
        lifecycle.create_or_update("W-1", AlertType::Ai, Priority::Warning, "x", t0());
        lifecycle.create_or_update("W-2", AlertType::Ai, Priority::Warning, "x", t0() + secs(3));
        let active = lifecycle.active();
        assert_eq!(active[0].worker_id, "W-2");
        assert_eq!(active[1].worker_id, "W-1");
    }
}
