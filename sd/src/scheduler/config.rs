//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
///
/// `max_concurrent` is read by the dispatcher on every pass without a
/// lock; it is treated as immutable for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Max concurrently running scrape jobs
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Dispatcher fallback poll when the queue is empty (milliseconds)
    #[serde(rename = "idle-backoff-ms")]
    pub idle_backoff_ms: u64,

    /// Dispatcher fallback poll when at the concurrency ceiling (milliseconds)
    #[serde(rename = "capacity-backoff-ms")]
    pub capacity_backoff_ms: u64,

    /// How long shutdown waits for in-flight jobs to drain (seconds)
    #[serde(rename = "shutdown-timeout-secs")]
    pub shutdown_timeout_secs: u64,

    /// Priority assigned when the caller does not specify one (lower = more urgent)
    #[serde(rename = "default-priority")]
    pub default_priority: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            idle_backoff_ms: 1_000,
            capacity_backoff_ms: 2_000,
            shutdown_timeout_secs: 60,
            default_priority: 1,
        }
    }
}

impl SchedulerConfig {
    /// Get the idle backoff as a Duration
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Get the capacity backoff as a Duration
    pub fn capacity_backoff(&self) -> Duration {
        Duration::from_millis(self.capacity_backoff_ms)
    }

    /// Get the shutdown timeout as a Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
