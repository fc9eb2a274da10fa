//! Lifecycle tracking for background ingestion jobs.
//!
//! The tracker is an explicit store object injected into whatever schedules
//! jobs; records are kept in memory for the lifetime of the process and are
//! never deleted.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Lifecycle state of an ingestion job.
///
/// Moves monotonically: `Started` → `Processing` → `Completed` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Started,
    Processing,
    Completed,
    Error,
}

impl TaskStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one tracked job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub status: TaskStatus,
    pub repository: String,
    pub message: String,
    /// Seconds since the Unix epoch at the last transition.
    pub timestamp: f64,
}

/// In-memory job-status store shared between the service surface and
/// background jobs. Mutation happens under a lock because jobs run on a
/// multi-threaded runtime.
#[derive(Debug, Default)]
pub struct TaskTracker {
    records: RwLock<HashMap<String, TaskRecord>>,
}

fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

impl TaskTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `started` record and return its id.
    ///
    /// Ids are `<kind>_<uuid-v4>`, so rapid successive jobs for the same
    /// repository cannot collide.
    pub fn create(&self, kind: &str, repository: &str, resource: &str) -> String {
        let id = format!("{kind}_{}", uuid::Uuid::new_v4());
        let record = TaskRecord {
            status: TaskStatus::Started,
            repository: repository.to_owned(),
            message: format!("Started {kind} of {resource}"),
            timestamp: epoch_secs(),
        };
        if let Ok(mut records) = self.records.write() {
            records.insert(id.clone(), record);
        }
        id
    }

    /// Overwrite status, message, and timestamp of an existing record.
    ///
    /// Unknown ids and records already in a terminal state are left
    /// untouched; this never fails.
    pub fn update(&self, id: &str, status: TaskStatus, message: impl Into<String>) {
        let Ok(mut records) = self.records.write() else {
            return;
        };
        let Some(record) = records.get_mut(id) else {
            tracing::debug!(id, "update for unknown task ignored");
            return;
        };
        if record.status.is_terminal() {
            tracing::debug!(id, status = %record.status, "update for terminal task ignored");
            return;
        }
        record.status = status;
        record.message = message.into();
        record.timestamp = epoch_secs();
    }

    /// Current snapshot of a record, or `None` for unknown ids.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.records.read().ok()?.get(id).cloned()
    }
}
