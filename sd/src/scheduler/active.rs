//! Active-run registry
//!
//! Tracks currently executing tasks for concurrency-limit enforcement
//! and long-running-job detection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

/// One currently executing task
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRunEntry {
    pub task_id: String,
    /// Worker label, e.g. `scrape-<task_id>`
    pub worker: String,
    pub started_at: DateTime<Utc>,
}

impl ActiveRunEntry {
    pub fn new(task_id: impl Into<String>, worker: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            worker: worker.into(),
            started_at: Utc::now(),
        }
    }

    /// Wall-clock time since the run started
    pub fn runtime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

/// Registry of in-flight runs, keyed by task ID
#[derive(Default)]
pub struct ActiveRuns {
    runs: Mutex<HashMap<String, ActiveRunEntry>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, entry: ActiveRunEntry) {
        debug!(task_id = %entry.task_id, worker = %entry.worker, "Active run registered");
        self.runs.lock().await.insert(entry.task_id.clone(), entry);
    }

    pub async fn remove(&self, task_id: &str) {
        if self.runs.lock().await.remove(task_id).is_some() {
            debug!(task_id, "Active run removed");
        }
    }

    /// Snapshot copy of all in-flight runs
    pub async fn snapshot(&self) -> HashMap<String, ActiveRunEntry> {
        self.runs.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.runs.lock().await.len()
    }
}
