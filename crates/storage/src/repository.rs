//! Repository Implementation

use crate::StorageError;
use chrono::{DateTime, Utc};
use risk_engine::{DecisionDetail, Reading, SafetyStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Registered field worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: String,
    pub name: String,
    pub zone: String,
    /// Last reading or poll
    pub last_seen: Option<DateTime<Utc>>,
}

impl WorkerRecord {
    pub fn new(worker_id: impl Into<String>, name: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            name: name.into(),
            zone: zone.into(),
            last_seen: None,
        }
    }
}

/// Evaluated reading log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingRecord {
    pub worker_id: String,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: i64,
    pub spo2: i64,
    pub temperature: f64,
    pub gas: i64,
    /// Ordinal; `None` for unrecognized fatigue input
    pub fatigue: Option<u8>,
    pub risk_score: u8,
    pub status: SafetyStatus,
}

impl ReadingRecord {
    /// Combine a reading with its decision
    pub fn from_decision(reading: &Reading, detail: &DecisionDetail) -> Self {
        Self {
            worker_id: reading.worker_id.clone(),
            timestamp: reading.timestamp,
            heart_rate: reading.heart_rate,
            spo2: reading.spo2,
            temperature: reading.temperature,
            gas: reading.gas,
            fatigue: reading.fatigue.ordinal(),
            risk_score: detail.final_risk_score,
            status: detail.status,
        }
    }
}

/// Operator message queued for a worker device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: u64,
    pub to_worker_id: String,
    pub message: String,
    /// Device command, e.g. "STOP WORK"
    pub command: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub delivered: bool,
}

/// Repository for data access (in-memory)
pub struct Repository {
    /// Reading log, oldest first
    reading_log: Mutex<VecDeque<ReadingRecord>>,
    /// Workers by id
    workers: Mutex<BTreeMap<String, WorkerRecord>>,
    /// Operator messages, oldest first
    messages: Mutex<VecDeque<MessageRecord>>,
    next_message_id: AtomicU64,
    /// Max reading records kept
    max_reading_records: usize,
    /// Max messages kept, delivered ones dropped first
    max_message_records: usize,
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::DatabaseError(format!("Lock error: {}", e))
}

impl Repository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            reading_log: Mutex::new(VecDeque::with_capacity(10000)),
            workers: Mutex::new(BTreeMap::new()),
            messages: Mutex::new(VecDeque::new()),
            next_message_id: AtomicU64::new(1),
            max_reading_records: 100_000,
            max_message_records: 10_000,
        }
    }

    /// Create a repository with a custom reading retention cap
    pub fn with_retention(max_reading_records: usize) -> Self {
        Self {
            max_reading_records: max_reading_records.max(1),
            ..Self::new()
        }
    }

    /// Set the message retention cap
    pub fn with_message_retention(mut self, max_message_records: usize) -> Self {
        self.max_message_records = max_message_records.max(1);
        self
    }

    /// Register or replace a worker
    pub fn register_worker(&self, record: WorkerRecord) -> Result<(), StorageError> {
        let mut workers = self.workers.lock().map_err(lock_error)?;
        debug!(worker_id = %record.worker_id, zone = %record.zone, "Registering worker");
        workers.insert(record.worker_id.clone(), record);
        Ok(())
    }

    /// Look up a worker
    pub fn worker(&self, worker_id: &str) -> Result<WorkerRecord, StorageError> {
        let workers = self.workers.lock().map_err(lock_error)?;
        workers
            .get(worker_id)
            .cloned()
            .ok_or_else(|| StorageError::WorkerNotFound(worker_id.to_string()))
    }

    /// Record contact from a worker
    pub fn touch_worker(&self, worker_id: &str, now: DateTime<Utc>) -> Result<(), StorageError> {
        let mut workers = self.workers.lock().map_err(lock_error)?;
        let worker = workers
            .get_mut(worker_id)
            .ok_or_else(|| StorageError::WorkerNotFound(worker_id.to_string()))?;
        worker.last_seen = Some(now);
        Ok(())
    }

    /// All workers, ordered by id
    pub fn workers(&self) -> Result<Vec<WorkerRecord>, StorageError> {
        let workers = self.workers.lock().map_err(lock_error)?;
        Ok(workers.values().cloned().collect())
    }

    /// Insert a reading record
    pub fn insert_reading(&self, record: ReadingRecord) -> Result<(), StorageError> {
        let mut log = self.reading_log.lock().map_err(lock_error)?;

        // Enforce retention
        while log.len() >= self.max_reading_records {
            log.pop_front();
        }

        log.push_back(record);
        Ok(())
    }

    /// Most recent reading for a worker
    pub fn latest_reading(&self, worker_id: &str) -> Result<Option<ReadingRecord>, StorageError> {
        let log = self.reading_log.lock().map_err(lock_error)?;
        Ok(log.iter().rev().find(|r| r.worker_id == worker_id).cloned())
    }

    /// A worker's readings since a timestamp, oldest first
    pub fn readings_since(
        &self,
        worker_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ReadingRecord>, StorageError> {
        let log = self.reading_log.lock().map_err(lock_error)?;
        Ok(log
            .iter()
            .filter(|r| r.worker_id == worker_id && r.timestamp >= since)
            .cloned()
            .collect())
    }

    /// Most recent readings across all workers, newest first
    pub fn recent_readings(&self, limit: usize) -> Result<Vec<ReadingRecord>, StorageError> {
        let log = self.reading_log.lock().map_err(lock_error)?;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }

    /// Queue a message for a worker
    pub fn queue_message(
        &self,
        to_worker_id: &str,
        message: &str,
        command: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MessageRecord, StorageError> {
        let mut messages = self.messages.lock().map_err(lock_error)?;

        // Enforce retention, delivered messages first
        if messages.len() >= self.max_message_records {
            messages.retain(|m| !m.delivered);
        }
        while messages.len() >= self.max_message_records {
            if let Some(dropped) = messages.pop_front() {
                warn!(message_id = dropped.id, to_worker_id = %dropped.to_worker_id, "Dropping undelivered message");
            }
        }

        let record = MessageRecord {
            id: self.next_message_id.fetch_add(1, Ordering::Relaxed),
            to_worker_id: to_worker_id.to_string(),
            message: message.to_string(),
            command: command.map(str::to_string),
            timestamp: now,
            delivered: false,
        };
        debug!(to_worker_id, message_id = record.id, "Message queued");
        messages.push_back(record.clone());
        Ok(record)
    }

    /// Mark one message delivered by id
    pub fn mark_delivered(&self, id: u64) -> Result<MessageRecord, StorageError> {
        let mut messages = self.messages.lock().map_err(lock_error)?;
        let message = messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StorageError::MessageNotFound(id))?;
        message.delivered = true;
        Ok(message.clone())
    }

    /// Get total message count
    pub fn message_count(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Undelivered messages for a worker, marked delivered on return
    pub fn take_pending_messages(&self, worker_id: &str) -> Result<Vec<MessageRecord>, StorageError> {
        let mut messages = self.messages.lock().map_err(lock_error)?;
        Ok(messages
            .iter_mut()
            .filter(|m| m.to_worker_id == worker_id && !m.delivered)
            .map(|m| {
                m.delivered = true;
                m.clone()
            })
            .collect())
    }

    /// Get total reading count
    pub fn reading_count(&self) -> usize {
        self.reading_log.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Get total worker count
    pub fn worker_count(&self) -> usize {
        self.workers.lock().map(|w| w.len()).unwrap_or(0)
    }

    /// Clear all data (for testing)
    pub fn clear(&self) {
        if let Ok(mut log) = self.reading_log.lock() {
            log.clear();
        }
        if let Ok(mut workers) = self.workers.lock() {
            workers.clear();
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.clear();
        }
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn record(worker_id: &str, seconds: i64, status: SafetyStatus) -> ReadingRecord {
        ReadingRecord {
            worker_id: worker_id.to_string(),
            timestamp: at(seconds),
            heart_rate: 80,
            spo2: 98,
            temperature: 36.8,
            gas: 20,
            fatigue: Some(0),
            risk_score: 6,
            status,
        }
    }

    #[test]
    fn test_worker_register_and_touch() {
        let repo = Repository::new();
        repo.register_worker(WorkerRecord::new("W-001", "Asha", "CHEMICAL"))
            .unwrap();

        assert_eq!(repo.worker("W-001").unwrap().last_seen, None);
        repo.touch_worker("W-001", at(5)).unwrap();
        assert_eq!(repo.worker("W-001").unwrap().last_seen, Some(at(5)));
        assert_eq!(repo.worker_count(), 1);
    }

    #[test]
    fn test_unknown_worker() {
        let repo = Repository::new();
        assert!(matches!(
            repo.worker("W-404"),
            Err(StorageError::WorkerNotFound(_))
        ));
        assert!(repo.touch_worker("W-404", at(0)).is_err());
    }

    #[test]
    fn test_latest_reading_per_worker() {
        let repo = Repository::new();
        repo.insert_reading(record("W-001", 0, SafetyStatus::Safe)).unwrap();
        repo.insert_reading(record("W-002", 1, SafetyStatus::Warning)).unwrap();
        repo.insert_reading(record("W-001", 2, SafetyStatus::Emergency)).unwrap();

        let latest = repo.latest_reading("W-001").unwrap().unwrap();
        assert_eq!(latest.status, SafetyStatus::Emergency);
        assert!(repo.latest_reading("W-003").unwrap().is_none());
    }

    #[test]
    fn test_readings_since() {
        let repo = Repository::new();
        for s in 0..10 {
            repo.insert_reading(record("W-001", s * 60, SafetyStatus::Safe)).unwrap();
        }
        let history = repo.readings_since("W-001", at(6 * 60)).unwrap();
        assert_eq!(history.len(), 4);
        assert!(history[0].timestamp < history[3].timestamp);
        assert_eq!(repo.recent_readings(3).unwrap()[0].timestamp, at(9 * 60));
    }

    #[test]
    fn test_retention_limit() {
        let repo = Repository::with_retention(5);

        for i in 0..10 {
            repo.insert_reading(record("W-001", i, SafetyStatus::Safe)).unwrap();
        }

        assert_eq!(repo.reading_count(), 5);
        assert_eq!(repo.recent_readings(10).unwrap().last().unwrap().timestamp, at(5));
    }

    #[test]
    fn test_messages_delivered_once() {
        let repo = Repository::new();
        repo.queue_message("W-001", "Admin action: STOP", Some("STOP WORK"), at(0))
            .unwrap();
        repo.queue_message("W-002", "Admin action: ALLOW", None, at(1)).unwrap();

        let pending = repo.take_pending_messages("W-001").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].command.as_deref(), Some("STOP WORK"));
        assert!(pending[0].delivered);
        assert!(repo.take_pending_messages("W-001").unwrap().is_empty());
        assert_eq!(repo.take_pending_messages("W-002").unwrap().len(), 1);
    }

    #[test]
    fn test_mark_delivered() {
        let repo = Repository::new();
        let sent = repo.queue_message("W-001", "Move to exit B", None, at(0)).unwrap();

        let acked = repo.mark_delivered(sent.id).unwrap();
        assert!(acked.delivered);
        assert!(repo.take_pending_messages("W-001").unwrap().is_empty());
        assert!(matches!(
            repo.mark_delivered(404),
            Err(StorageError::MessageNotFound(404))
        ));
    }

    #[test]
    fn test_message_retention_drops_delivered_first() {
        let repo = Repository::new().with_message_retention(3);
        for i in 0..3 {
            repo.queue_message("W-001", "check in", None, at(i)).unwrap();
        }
        repo.take_pending_messages("W-001").unwrap();
        let stop = repo
            .queue_message("W-002", "Admin action: STOP", Some("STOP WORK"), at(3))
            .unwrap();
        assert_eq!(repo.message_count(), 1);

        for i in 4..7 {
            repo.queue_message("W-003", "check in", None, at(i)).unwrap();
        }
        assert_eq!(repo.message_count(), 3);
        // Oldest undelivered is dropped once nothing delivered is left
        assert!(repo.take_pending_messages("W-002").unwrap().is_empty());
        assert_eq!(repo.take_pending_messages("W-003").unwrap().len(), 3);

        // Ids keep increasing after pruning
        let next = repo.queue_message("W-001", "check in", None, at(7)).unwrap();
        assert_eq!(stop.id, 4);
        assert_eq!(next.id, 8);
    }

    #[test]
    fn test_clear() {
        let repo = Repository::new();
        repo.register_worker(WorkerRecord::new("W-001", "Asha", "NORMAL")).unwrap();
        repo.insert_reading(record("W-001", 0, SafetyStatus::Safe)).unwrap();
        repo.clear();
        assert_eq!(repo.reading_count(), 0);
        assert_eq!(repo.worker_count(), 0);
    }
}
