//! Monitor Error Types

use alerting::AlertError;
use data_validator::ValidationError;
use risk_engine::ZoneError;
use storage::StorageError;
use thiserror::Error;

/// Errors surfaced by monitor operations
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Zone configuration error: {0}")]
    Zone(#[from] ZoneError),

    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Submission dropped before evaluation
    #[error("Rate limit exceeded for worker {0}")]
    RateLimited(String),

    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    #[error("Unknown message: {0}")]
    UnknownMessage(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl MonitorError {
    /// Storage lookups of missing workers or messages surface as `Unknown*`
    pub(crate) fn from_lookup(err: StorageError) -> Self {
        match err {
            StorageError::WorkerNotFound(worker_id) => MonitorError::UnknownWorker(worker_id),
            StorageError::MessageNotFound(id) => MonitorError::UnknownMessage(id),
            other => MonitorError::Storage(other),
        }
    }
}
