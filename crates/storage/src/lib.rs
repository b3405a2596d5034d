//! Storage Layer
//!
//! Worker registry, reading log, and operator message outbox behind a
//! repository interface.

mod repository;

pub use repository::{MessageRecord, ReadingRecord, Repository, WorkerRecord};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Worker not found: {0}")]
    WorkerNotFound(String),
    #[error("Message not found: {0}")]
    MessageNotFound(u64),
}
