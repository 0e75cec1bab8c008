//! Priority queue for pending jobs

use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::debug;

/// An admission-time projection of a task, alive only while queued
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub task_id: String,
    pub hashtag: String,
    pub num_profiles: u32,
    /// Lower = more urgent
    pub priority: i32,
    /// Admission counter; breaks ties within a priority so dispatch is FIFO
    pub seq: u64,
    pub enqueued_at: DateTime<Utc>,
}

impl Eq for QueueEntry {}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.task_id == other.task_id
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // BinaryHeap is a max-heap: reverse so the lowest (priority, seq)
        // pair pops first
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of pending jobs, ordered by (priority, admission order)
pub struct TaskQueue {
    heap: Mutex<BinaryHeap<QueueEntry>>,
    seq: AtomicU64,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::new()),
            seq: AtomicU64::new(0),
        }
    }

    /// Push a new entry, assigning its admission sequence number
    pub async fn push(
        &self,
        task_id: impl Into<String>,
        hashtag: impl Into<String>,
        num_profiles: u32,
        priority: i32,
    ) {
        let entry = QueueEntry {
            task_id: task_id.into(),
            hashtag: hashtag.into(),
            num_profiles,
            priority,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            enqueued_at: Utc::now(),
        };
        debug!(task_id = %entry.task_id, priority, seq = entry.seq, "Queued entry");
        self.heap.lock().await.push(entry);
    }

    /// Pop the most urgent entry, or None if the queue is empty
    pub async fn try_pop(&self) -> Option<QueueEntry> {
        self.heap.lock().await.pop()
    }

    /// Remove a specific entry by task ID; returns whether it was present
    pub async fn remove(&self, task_id: &str) -> bool {
        let mut heap = self.heap.lock().await;
        let original_len = heap.len();
        let retained: Vec<_> = heap.drain().filter(|e| e.task_id != task_id).collect();
        *heap = retained.into_iter().collect();
        original_len != heap.len()
    }

    /// Current queue depth
    pub async fn len(&self) -> usize {
        self.heap.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.heap.lock().await.is_empty()
    }
}
