//! Alerting System
//!
//! Owns the alert records for every (worker, alert type) pair:
//! - Create-or-refresh with a cooldown window
//! - Escalation of overdue, unacknowledged alerts
//! - Operator acknowledgement and resolution
//! - Inactivity (possible unconsciousness) triggers
//!
//! Every operation takes the current time explicitly.

mod alert;
mod inactivity;
mod lifecycle;

pub use alert::{Alert, AlertId, AlertKey, AlertTrigger, AlertType, Priority};
pub use inactivity::{InactivityDetector, WorkerActivity, UNCONSCIOUS_REASON};
pub use lifecycle::{AlertLifecycle, AlertOutcome, EscalationScope, LifecycleConfig, Transition};

use thiserror::Error;

/// Alert lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("Alert {0} not found")]
    NotFound(AlertId),
    #[error("Alert {0} is already resolved")]
    AlreadyResolved(AlertId),
}
