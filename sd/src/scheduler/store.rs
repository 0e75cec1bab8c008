//! Task record store
//!
//! Exclusive owner of all TaskRecords. Every read hands out a snapshot
//! copy; no caller ever holds a reference into the map.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{TaskRecord, TaskStatus};

use super::error::TaskError;

/// Aggregate counts over the store
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct TaskStats {
    pub total_tasks: usize,
    /// Count per status, keyed by status name
    pub status_counts: BTreeMap<String, usize>,
}

/// Thread-safe owner of all task records
#[derive(Default)]
pub struct TaskStore {
    tasks: Mutex<HashMap<String, TaskRecord>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record
    ///
    /// Fails with DuplicateTask if the ID already exists. The generation
    /// scheme makes collisions unreachable in practice, so this is an
    /// invariant check, not a recovery path.
    pub async fn create(&self, record: TaskRecord) -> Result<(), TaskError> {
        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&record.id) {
            return Err(TaskError::DuplicateTask(record.id));
        }
        debug!(task_id = %record.id, hashtag = %record.hashtag, "Task added to store");
        tasks.insert(record.id.clone(), record);
        Ok(())
    }

    /// Apply a status transition to a record
    ///
    /// Returns false with a warning if the ID is unknown (tolerates late
    /// callbacks after eviction) or the record is already terminal.
    pub async fn update_status(&self, task_id: &str, status: TaskStatus, error: Option<String>) -> bool {
        let mut tasks = self.tasks.lock().await;
        let Some(record) = tasks.get_mut(task_id) else {
            warn!(task_id, %status, "Status update for unknown task");
            return false;
        };

        if record.apply_status(status, error) {
            debug!(task_id, %status, "Task status updated");
            true
        } else {
            warn!(task_id, %status, current = %record.status, "Ignoring transition out of terminal state");
            false
        }
    }

    /// Get a snapshot of one record
    pub async fn get(&self, task_id: &str) -> Option<TaskRecord> {
        self.tasks.lock().await.get(task_id).cloned()
    }

    /// Get a snapshot of all records
    pub async fn list_all(&self) -> HashMap<String, TaskRecord> {
        self.tasks.lock().await.clone()
    }

    /// Remove a record outright; returns whether it existed
    pub async fn remove(&self, task_id: &str) -> bool {
        let removed = self.tasks.lock().await.remove(task_id).is_some();
        if removed {
            debug!(task_id, "Task removed from store");
        }
        removed
    }

    /// Evict terminal records whose end_time predates now − max_age
    ///
    /// Queued and running tasks are never evicted regardless of age.
    pub async fn evict_older_than(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(max_age.as_secs() as i64);
        let mut tasks = self.tasks.lock().await;

        let stale: Vec<String> = tasks
            .values()
            .filter(|t| t.is_terminal() && t.end_time.is_some_and(|end| end <= cutoff))
            .map(|t| t.id.clone())
            .collect();

        for task_id in &stale {
            tasks.remove(task_id);
        }

        if !stale.is_empty() {
            info!(evicted = stale.len(), "Evicted old terminal tasks");
        }
        stale.len()
    }

    /// Aggregate counts per status
    pub async fn stats(&self) -> TaskStats {
        let tasks = self.tasks.lock().await;
        let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
        for record in tasks.values() {
            *status_counts.entry(record.status.to_string()).or_default() += 1;
        }
        TaskStats {
            total_tasks: tasks.len(),
            status_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskOrigin;

    fn record(id: &str) -> TaskRecord {
        TaskRecord::new(id, "cricket", 500, TaskOrigin::Api, 1)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = TaskStore::new();
        store.create(record("t-1")).await.unwrap();

        let fetched = store.get("t-1").await.unwrap();
        assert_eq!(fetched.hashtag, "cricket");
        assert!(store.get("t-2").await.is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_rejected() {
        let store = TaskStore::new();
        store.create(record("t-1")).await.unwrap();

        let result = store.create(record("t-1")).await;
        assert!(matches!(result, Err(TaskError::DuplicateTask(_))));
    }

    #[tokio::test]
    async fn test_update_status_unknown_task_is_noop() {
        let store = TaskStore::new();
        assert!(!store.update_status("missing", TaskStatus::Running, None).await);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let store = TaskStore::new();
        store.create(record("t-1")).await.unwrap();

        let mut snapshot = store.list_all().await;
        snapshot.get_mut("t-1").unwrap().status = TaskStatus::Failed;

        // Mutating the snapshot must not touch the store
        assert_eq!(store.get("t-1").await.unwrap().status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn test_evict_only_old_terminal() {
        let store = TaskStore::new();

        store.create(record("t-done")).await.unwrap();
        store.update_status("t-done", TaskStatus::Running, None).await;
        store.update_status("t-done", TaskStatus::Completed, None).await;

        store.create(record("t-queued")).await.unwrap();

        store.create(record("t-running")).await.unwrap();
        store.update_status("t-running", TaskStatus::Running, None).await;

        // max_age = 0: everything terminal is old enough
        let evicted = store.evict_older_than(Duration::ZERO).await;
        assert_eq!(evicted, 1);
        assert!(store.get("t-done").await.is_none());
        assert!(store.get("t-queued").await.is_some());
        assert!(store.get("t-running").await.is_some());
    }

    #[tokio::test]
    async fn test_evict_respects_age() {
        let store = TaskStore::new();
        store.create(record("t-1")).await.unwrap();
        store.update_status("t-1", TaskStatus::Running, None).await;
        store.update_status("t-1", TaskStatus::Failed, Some("boom".to_string())).await;

        // Just finished; a 1-hour retention keeps it
        let evicted = store.evict_older_than(Duration::from_secs(3600)).await;
        assert_eq!(evicted, 0);
        assert!(store.get("t-1").await.is_some());
    }

    #[tokio::test]
    async fn test_stats() {
        let store = TaskStore::new();
        store.create(record("t-1")).await.unwrap();
        store.create(record("t-2")).await.unwrap();
        store.update_status("t-2", TaskStatus::Running, None).await;

        let stats = store.stats().await;
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.status_counts.get("queued"), Some(&1));
        assert_eq!(stats.status_counts.get("running"), Some(&1));
    }
}
