//! Worker Safety Monitor
//!
//! Transport-agnostic service over the risk engine, alert lifecycle and
//! repository. Every operation takes `now` explicitly and returns a
//! serializable response, so an HTTP layer or a replay loop can sit on top.

use alerting::{AlertLifecycle, InactivityDetector};
use chrono::{DateTime, Duration, Utc};
use data_validator::Validator;
use risk_engine::DecisionEngine;
use storage::{Repository, WorkerRecord};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod error;
mod handlers;
mod rate_limit;
pub mod scenario;

pub use crate::config::MonitorConfig;
pub use alerting::AlertId;
pub use error::MonitorError;
pub use handlers::alerts::{AdminAction, AlertNotice, AlertSummary, HazardKind, STOP_WORK_COMMAND};
pub use handlers::messages::MessageReceipt;
pub use handlers::readings::ReadingOutcome;
pub use handlers::workers::{OverviewResponse, PollResponse, WorkerOverview};
pub use rate_limit::{RateLimitConfig, ReadingLimiter};

/// Service state shared by every operation
pub struct SafetyMonitor {
    engine: DecisionEngine,
    validator: Validator,
    lifecycle: AlertLifecycle,
    inactivity: InactivityDetector,
    repository: Repository,
    limiter: ReadingLimiter,
    history_window: Duration,
}

impl SafetyMonitor {
    /// Build the service from configuration
    pub fn new(config: &MonitorConfig) -> Result<Self, MonitorError> {
        let zones = config.zone_table()?;
        info!(zones = zones.len(), "Initializing safety monitor");

        Ok(Self {
            engine: DecisionEngine::new(zones),
            validator: Validator::new(),
            lifecycle: AlertLifecycle::new(config.alerts.clone()),
            inactivity: InactivityDetector::new(config.inactivity_timeout_seconds),
            repository: Repository::new(),
            limiter: ReadingLimiter::new(&config.rate_limit),
            history_window: Duration::minutes(i64::from(config.history_minutes)),
        })
    }

    /// Register a worker, or update name and zone of a known one.
    ///
    /// A new worker counts as seen at registration, so a device that never
    /// reports is still caught by the inactivity sweep.
    pub fn register_worker(
        &self,
        worker_id: &str,
        name: &str,
        zone: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MonitorError> {
        if worker_id.trim().is_empty() {
            return Err(MonitorError::InvalidRequest(
                "worker id must not be empty".to_string(),
            ));
        }

        let mut record = WorkerRecord::new(worker_id, name, zone);
        record.last_seen = match self.repository.worker(worker_id) {
            Ok(existing) => existing.last_seen,
            Err(_) => Some(now),
        };
        self.repository.register_worker(record)?;
        info!(worker_id, zone, "Worker registered");
        Ok(())
    }

    pub fn lifecycle(&self) -> &AlertLifecycle {
        &self.lifecycle
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub(crate) fn worker(&self, worker_id: &str) -> Result<WorkerRecord, MonitorError> {
        self.repository
            .worker(worker_id)
            .map_err(MonitorError::from_lookup)
    }
}

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
