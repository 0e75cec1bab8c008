//! Task record type
//!
//! TaskRecord is the unit of tracked work: one scraping job for one
//! hashtag, from admission through its terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Admitted, waiting in the queue
    #[default]
    Queued,
    /// Picked up by a worker, executor in flight
    Running,
    /// Executor returned without fault
    Completed,
    /// Executor raised a fault
    Failed,
    /// Cancelled by operator action before reaching a terminal state
    Cancelled,
}

impl TaskStatus {
    /// Check if this status is terminal (no further transitions except deletion)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Which subsystem created a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrigin {
    /// Manual API call
    #[default]
    Api,
    /// Scheduled timer
    Cron,
    /// LLM-derived request
    LlmApi,
}

impl std::fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Cron => write!(f, "cron"),
            Self::LlmApi => write!(f, "llm_api"),
        }
    }
}

/// A tracked scraping job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique identifier
    pub id: String,

    /// Hashtag to scrape
    pub hashtag: String,

    /// Requested number of profiles
    pub num_profiles: u32,

    /// Subsystem that created the task
    pub origin: TaskOrigin,

    /// Scheduling priority (lower = more urgent)
    pub priority: i32,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// When the task was admitted
    pub request_time: DateTime<Utc>,

    /// When the task started running
    pub start_time: Option<DateTime<Utc>>,

    /// When the task reached a terminal state
    pub end_time: Option<DateTime<Utc>>,

    /// Fault message for failed tasks
    pub error: Option<String>,

    /// Retries attempted so far
    pub retry_count: u32,

    /// Retry ceiling (declared for interface compatibility; no retry loop
    /// consumes it yet)
    pub max_retries: u32,
}

impl TaskRecord {
    /// Create a new record in the queued state
    pub fn new(
        id: impl Into<String>,
        hashtag: impl Into<String>,
        num_profiles: u32,
        origin: TaskOrigin,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            hashtag: hashtag.into(),
            num_profiles,
            origin,
            priority,
            status: TaskStatus::Queued,
            request_time: Utc::now(),
            start_time: None,
            end_time: None,
            error: None,
            retry_count: 0,
            max_retries: 3,
        }
    }

    /// Check if the record is in a terminal state
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status transition, stamping timestamps as a side effect
    ///
    /// Returns false without mutating anything if the record is already
    /// terminal: transitions are monotonic, so a late executor callback
    /// cannot overwrite a cancel. Timestamps already set are never changed.
    pub fn apply_status(&mut self, status: TaskStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = status;

        if status == TaskStatus::Running && self.start_time.is_none() {
            self.start_time = Some(Utc::now());
        }
        if status.is_terminal() && self.end_time.is_none() {
            self.end_time = Some(Utc::now());
        }
        if let Some(error) = error {
            self.error = Some(error);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_queued() {
        let record = TaskRecord::new("t-1", "cricket", 500, TaskOrigin::Api, 1);
        assert_eq!(record.status, TaskStatus::Queued);
        assert!(record.start_time.is_none());
        assert!(record.end_time.is_none());
        assert!(record.error.is_none());
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.max_retries, 3);
    }

    #[test]
    fn test_apply_status_stamps_times() {
        let mut record = TaskRecord::new("t-1", "cricket", 500, TaskOrigin::Api, 1);

        assert!(record.apply_status(TaskStatus::Running, None));
        assert!(record.start_time.is_some());
        assert!(record.end_time.is_none());

        assert!(record.apply_status(TaskStatus::Completed, None));
        assert!(record.end_time.is_some());
    }

    #[test]
    fn test_apply_status_failed_records_error() {
        let mut record = TaskRecord::new("t-1", "cricket", 500, TaskOrigin::Api, 1);
        record.apply_status(TaskStatus::Running, None);

        assert!(record.apply_status(TaskStatus::Failed, Some("browser crashed".to_string())));
        assert_eq!(record.error.as_deref(), Some("browser crashed"));
        assert!(record.end_time.is_some());
    }

    #[test]
    fn test_terminal_status_not_overwritten() {
        let mut record = TaskRecord::new("t-1", "cricket", 500, TaskOrigin::Api, 1);
        record.apply_status(TaskStatus::Running, None);
        record.apply_status(TaskStatus::Cancelled, None);
        let cancelled_at = record.end_time;

        // A late executor completion must not revive the record
        assert!(!record.apply_status(TaskStatus::Completed, None));
        assert_eq!(record.status, TaskStatus::Cancelled);
        assert_eq!(record.end_time, cancelled_at);
    }

    #[test]
    fn test_cancel_from_queued_keeps_start_unset() {
        let mut record = TaskRecord::new("t-1", "cricket", 500, TaskOrigin::Cron, 1);
        assert!(record.apply_status(TaskStatus::Cancelled, None));
        assert!(record.start_time.is_none());
        assert!(record.end_time.is_some());
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_origin_serde() {
        let json = serde_json::to_string(&TaskOrigin::LlmApi).unwrap();
        assert_eq!(json, "\"llm_api\"");

        let origin: TaskOrigin = serde_json::from_str("\"cron\"").unwrap();
        assert_eq!(origin, TaskOrigin::Cron);
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let mut record = TaskRecord::new("t-1", "cricket", 500, TaskOrigin::Api, 2);
        record.apply_status(TaskStatus::Running, None);

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: TaskRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record.id, deserialized.id);
        assert_eq!(record.status, deserialized.status);
        assert_eq!(record.priority, deserialized.priority);
        assert_eq!(record.start_time, deserialized.start_time);
    }
}
