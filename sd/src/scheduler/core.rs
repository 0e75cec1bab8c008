//! Scheduler implementation
//!
//! One dispatch loop drains the priority queue while the active-run count
//! stays below the concurrency ceiling; each dispatched job runs as its
//! own tokio task. Cancellation is advisory (status flag only) and jobs
//! have no per-job timeout; a slot is held until the executor returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::Result;
use serde::Serialize;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, info, warn};

use crate::domain::{TaskOrigin, TaskRecord, TaskStatus, generate_task_id};
use crate::executor::ScrapeExecutor;

use super::active::{ActiveRunEntry, ActiveRuns};
use super::config::SchedulerConfig;
use super::error::TaskError;
use super::queue::{QueueEntry, TaskQueue};
use super::store::TaskStore;

/// Read-only health aggregate for observability
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub total_tasks: usize,
    pub status_counts: std::collections::BTreeMap<String, usize>,
    pub queue_size: usize,
    pub active_workers: usize,
    pub timers_alive: bool,
}

/// The Scheduler owns admission, dispatch, and lifecycle tracking
pub struct Scheduler {
    config: SchedulerConfig,
    store: Arc<TaskStore>,
    queue: TaskQueue,
    active: Arc<ActiveRuns>,
    executor: Arc<dyn ScrapeExecutor>,
    /// Signalled on submit and on job completion to wake the dispatcher
    notify: Arc<Notify>,
    /// Set while the periodic enqueuer/sweeper timers are running
    timers_alive: AtomicBool,
}

impl Scheduler {
    /// Create a new scheduler with the given configuration and executor
    pub fn new(config: SchedulerConfig, executor: Arc<dyn ScrapeExecutor>) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self {
            config,
            store: Arc::new(TaskStore::new()),
            queue: TaskQueue::new(),
            active: Arc::new(ActiveRuns::new()),
            executor,
            notify: Arc::new(Notify::new()),
            timers_alive: AtomicBool::new(false),
        }
    }

    /// Admit a new job: create its record and queue it for dispatch
    pub async fn submit(
        &self,
        hashtag: &str,
        num_profiles: u32,
        origin: TaskOrigin,
        priority: i32,
    ) -> Result<String, TaskError> {
        let task_id = generate_task_id(hashtag);
        let record = TaskRecord::new(&task_id, hashtag, num_profiles, origin, priority);
        self.store.create(record).await?;
        self.queue.push(&task_id, hashtag, num_profiles, priority).await;
        self.notify.notify_waiters();

        info!(%task_id, hashtag, num_profiles, %origin, priority, "Task queued");
        Ok(task_id)
    }

    /// Get the last known state of a task
    pub async fn status(&self, task_id: &str) -> Result<TaskRecord, TaskError> {
        self.store
            .get(task_id)
            .await
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    /// Snapshot of all tracked tasks
    pub async fn list_all(&self) -> std::collections::HashMap<String, TaskRecord> {
        self.store.list_all().await
    }

    /// Snapshot of currently executing runs
    pub async fn list_active(&self) -> std::collections::HashMap<String, ActiveRunEntry> {
        self.active.snapshot().await
    }

    /// Mark a task as cancelled
    ///
    /// A queued task is also removed from the queue. A running task keeps
    /// running: only its bookkeeping status changes, the in-flight
    /// execution is never interrupted.
    pub async fn cancel(&self, task_id: &str) -> Result<(), TaskError> {
        let record = self.status(task_id).await?;

        if record.is_terminal() {
            return Err(TaskError::InvalidState {
                id: task_id.to_string(),
                status: record.status,
            });
        }

        if record.status == TaskStatus::Queued {
            self.queue.remove(task_id).await;
        }

        self.store.update_status(task_id, TaskStatus::Cancelled, None).await;
        info!(task_id, previous = %record.status, "Task cancelled");
        Ok(())
    }

    /// Evict terminal tasks older than the given age; returns the count
    pub async fn cleanup(&self, max_age_hours: u64) -> usize {
        self.store
            .evict_older_than(Duration::from_secs(max_age_hours * 3600))
            .await
    }

    /// Read-only health aggregate: store stats, queue depth, active runs
    pub async fn statistics(&self) -> HealthSnapshot {
        let stats = self.store.stats().await;
        HealthSnapshot {
            total_tasks: stats.total_tasks,
            status_counts: stats.status_counts,
            queue_size: self.queue.len().await,
            active_workers: self.active.count().await,
            timers_alive: self.timers_alive.load(Ordering::Relaxed),
        }
    }

    /// Record whether the periodic timers are running (feeds health output)
    pub fn set_timers_alive(&self, alive: bool) {
        self.timers_alive.store(alive, Ordering::Relaxed);
    }

    /// Run the dispatch loop until a shutdown signal arrives
    ///
    /// Wakes on enqueue and on job completion via the Notify; the
    /// two-tier sleep (short when idle, longer at capacity) is only a
    /// fallback so a missed wakeup cannot stall dispatch.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        info!(max_concurrent = self.config.max_concurrent, "Dispatcher started");

        loop {
            self.dispatch_ready().await;

            let backoff = if self.active.count().await >= self.config.max_concurrent {
                self.config.capacity_backoff()
            } else {
                self.config.idle_backoff()
            };

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(backoff) => {}
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.drain().await;
        info!("Dispatcher stopped");
        Ok(())
    }

    /// Launch queued entries while below the concurrency ceiling
    async fn dispatch_ready(&self) {
        while self.active.count().await < self.config.max_concurrent {
            let Some(entry) = self.queue.try_pop().await else {
                break;
            };

            // Mark the record running; refuses if the task was cancelled
            // (or evicted) while it sat in the queue
            if !self.store.update_status(&entry.task_id, TaskStatus::Running, None).await {
                debug!(task_id = %entry.task_id, "Skipping dead queue entry");
                continue;
            }

            self.launch(entry).await;
        }
    }

    /// Spawn the worker task for one dispatched entry
    async fn launch(&self, entry: QueueEntry) {
        let worker = format!("scrape-{}", entry.task_id);
        self.active.insert(ActiveRunEntry::new(&entry.task_id, &worker)).await;

        let store = Arc::clone(&self.store);
        let active = Arc::clone(&self.active);
        let notify = Arc::clone(&self.notify);
        let executor = Arc::clone(&self.executor);
        let task_id = entry.task_id.clone();

        info!(%task_id, hashtag = %entry.hashtag, "Worker launched");

        tokio::spawn(async move {
            // The executor runs in a nested task so a panic surfaces here
            // as a JoinError instead of killing the worker wrapper; the
            // registry cleanup below runs on every exit path.
            let hashtag = entry.hashtag.clone();
            let num_profiles = entry.num_profiles;
            let outcome = tokio::spawn(async move { executor.run(&hashtag, num_profiles).await }).await;

            match outcome {
                Ok(Ok(())) => {
                    store.update_status(&task_id, TaskStatus::Completed, None).await;
                    info!(%task_id, "Task completed");
                }
                Ok(Err(fault)) => {
                    store
                        .update_status(&task_id, TaskStatus::Failed, Some(fault.to_string()))
                        .await;
                    warn!(%task_id, error = %fault, "Task failed");
                }
                Err(join_error) => {
                    store
                        .update_status(&task_id, TaskStatus::Failed, Some(format!("worker aborted: {join_error}")))
                        .await;
                    warn!(%task_id, error = %join_error, "Worker aborted");
                }
            }

            active.remove(&task_id).await;
            notify.notify_waiters();
        });
    }

    /// Wait for in-flight jobs to drain, up to the shutdown timeout
    ///
    /// Best effort: after the timeout the remaining jobs are logged and
    /// left to die with the process rather than interrupted.
    async fn drain(&self) {
        let active = self.active.count().await;
        if active == 0 {
            return;
        }

        info!(active, "Waiting for active jobs to complete");
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout();

        while self.active.count().await > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        let remaining = self.active.count().await;
        if remaining > 0 {
            warn!(remaining, "Jobs still in flight after shutdown timeout");
        } else {
            info!("All active jobs completed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct InstantExecutor;

    #[async_trait]
    impl ScrapeExecutor for InstantExecutor {
        async fn run(&self, _hashtag: &str, _num_profiles: u32) -> Result<()> {
            Ok(())
        }
    }

    struct FailingExecutor;

    #[async_trait]
    impl ScrapeExecutor for FailingExecutor {
        async fn run(&self, _hashtag: &str, _num_profiles: u32) -> Result<()> {
            Err(eyre::eyre!("selector not found"))
        }
    }

    fn scheduler_with(executor: Arc<dyn ScrapeExecutor>) -> Scheduler {
        let config = SchedulerConfig {
            idle_backoff_ms: 10,
            capacity_backoff_ms: 20,
            ..Default::default()
        };
        Scheduler::new(config, executor)
    }

    async fn wait_for_terminal(scheduler: &Scheduler, task_id: &str) -> TaskRecord {
        for _ in 0..100 {
            let record = scheduler.status(task_id).await.unwrap();
            if record.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never reached a terminal state", task_id);
    }

    #[tokio::test]
    async fn test_submit_then_status_is_queued() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));
        let task_id = scheduler.submit("cricket", 500, TaskOrigin::Api, 1).await.unwrap();

        let record = scheduler.status(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Queued);
        assert!(record.start_time.is_none());
        assert!(record.end_time.is_none());

        let snapshot = scheduler.statistics().await;
        assert_eq!(snapshot.queue_size, 1);
        assert_eq!(snapshot.active_workers, 0);
    }

    #[tokio::test]
    async fn test_status_unknown_task() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));
        assert!(matches!(
            scheduler.status("missing").await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_completes_task() {
        let scheduler = Arc::new(scheduler_with(Arc::new(InstantExecutor)));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let runner = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        let task_id = scheduler.submit("cricket", 10, TaskOrigin::Api, 1).await.unwrap();
        let record = wait_for_terminal(&scheduler, &task_id).await;

        assert_eq!(record.status, TaskStatus::Completed);
        assert!(record.start_time.is_some());
        assert!(record.end_time.is_some());
        assert!(record.error.is_none());

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_executor_fault_marks_failed() {
        let scheduler = Arc::new(scheduler_with(Arc::new(FailingExecutor)));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let runner = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        let task_id = scheduler.submit("cricket", 10, TaskOrigin::Api, 1).await.unwrap();
        let record = wait_for_terminal(&scheduler, &task_id).await;

        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("selector not found"));

        // The fault stayed contained: registry is clean, dispatcher alive
        assert_eq!(scheduler.list_active().await.len(), 0);

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cancel_queued_task() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));
        let task_id = scheduler.submit("cricket", 10, TaskOrigin::Api, 1).await.unwrap();

        scheduler.cancel(&task_id).await.unwrap();

        let record = scheduler.status(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Cancelled);
        assert!(record.start_time.is_none());
        assert_eq!(scheduler.statistics().await.queue_size, 0);
    }

    #[tokio::test]
    async fn test_cancel_terminal_task_is_invalid() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));
        let task_id = scheduler.submit("cricket", 10, TaskOrigin::Api, 1).await.unwrap();

        scheduler.cancel(&task_id).await.unwrap();
        let result = scheduler.cancel(&task_id).await;
        assert!(matches!(result, Err(TaskError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_cancel_unknown_task() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));
        assert!(matches!(
            scheduler.cancel("missing").await,
            Err(TaskError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_queue_entry_never_dispatched() {
        let scheduler = Arc::new(scheduler_with(Arc::new(InstantExecutor)));

        let task_id = scheduler.submit("cricket", 10, TaskOrigin::Api, 1).await.unwrap();
        scheduler.cancel(&task_id).await.unwrap();

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let runner = Arc::clone(&scheduler);
        let handle = tokio::spawn(async move { runner.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Still cancelled, never revived by the dispatcher
        let record = scheduler.status(&task_id).await.unwrap();
        assert_eq!(record.status, TaskStatus::Cancelled);
        assert!(record.start_time.is_none());

        shutdown_tx.send(()).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_zero_evicts_terminal_only() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));

        let done = scheduler.submit("done", 10, TaskOrigin::Api, 1).await.unwrap();
        scheduler.cancel(&done).await.unwrap();
        let queued = scheduler.submit("queued", 10, TaskOrigin::Api, 1).await.unwrap();

        let evicted = scheduler.cleanup(0).await;
        assert_eq!(evicted, 1);
        assert!(scheduler.status(&done).await.is_err());
        assert!(scheduler.status(&queued).await.is_ok());
    }

    #[tokio::test]
    async fn test_statistics_counts() {
        let scheduler = scheduler_with(Arc::new(InstantExecutor));
        scheduler.submit("a", 10, TaskOrigin::Api, 1).await.unwrap();
        scheduler.submit("b", 10, TaskOrigin::Cron, 1).await.unwrap();

        let snapshot = scheduler.statistics().await;
        assert_eq!(snapshot.total_tasks, 2);
        assert_eq!(snapshot.queue_size, 2);
        assert_eq!(snapshot.status_counts.get("queued"), Some(&2));
        assert!(!snapshot.timers_alive);

        scheduler.set_timers_alive(true);
        assert!(scheduler.statistics().await.timers_alive);
    }
}
