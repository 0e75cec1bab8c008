//! scraperd - concurrent scraping-job orchestration daemon
//!
//! scraperd accepts scraping-job requests, queues them by priority,
//! executes at most N jobs concurrently, and tracks each job's lifecycle
//! (queued → running → completed/failed/cancelled) so callers can poll
//! status, gather statistics, and reclaim resources from stale jobs.
//!
//! # Core Concepts
//!
//! - **Priority admission**: lower priority number dispatches first, FIFO
//!   within a priority
//! - **Bounded concurrency**: one dispatch loop holds active workers at or
//!   below the configured ceiling
//! - **Contained faults**: an executor failure is recorded on its task
//!   record and never disturbs the dispatcher or other jobs
//! - **Advisory cancellation**: cancelling a running job flips its status
//!   only; in-flight work is never interrupted
//!
//! # Modules
//!
//! - [`scheduler`] - admission, priority queue, dispatch, lifecycle tracking
//! - [`executor`] - scrape execution seam and command-based implementation
//! - [`worklist`] - active-hashtag discovery seam and Airtable client
//! - [`cron`] - periodic enqueuer, retention sweeper, health monitor
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod cron;
pub mod daemon;
pub mod domain;
pub mod executor;
pub mod scheduler;
pub mod worklist;

// Re-export commonly used types
pub use config::{AirtableConfig, Config, CronConfig, RetentionConfig, ScraperConfig};
pub use cron::{HealthMonitor, PeriodicEnqueuer, RetentionSweeper};
pub use domain::{TaskOrigin, TaskRecord, TaskStatus, generate_task_id};
pub use executor::{CommandExecutor, ScrapeExecutor};
pub use scheduler::{
    ActiveRunEntry, ActiveRuns, HealthSnapshot, QueueEntry, Scheduler, SchedulerConfig, TaskError, TaskQueue,
    TaskStats, TaskStore,
};
pub use worklist::{AirtableWorklist, WorklistProvider};
