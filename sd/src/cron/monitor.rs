//! Health monitor
//!
//! Periodically logs scheduler statistics and flags jobs that have been
//! running longer than the warning threshold.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::scheduler::{HealthSnapshot, Scheduler};

pub struct HealthMonitor {
    scheduler: Arc<Scheduler>,
    interval: Duration,
    long_running_warn: chrono::Duration,
}

impl HealthMonitor {
    pub fn new(scheduler: Arc<Scheduler>, config: &Config) -> Self {
        Self {
            scheduler,
            interval: Duration::from_secs(config.cron.monitor_interval_mins * 60),
            long_running_warn: chrono::Duration::seconds(config.cron.long_running_warn_secs as i64),
        }
    }

    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Health monitor started");

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await;

        loop {
            interval.tick().await;
            self.run_once().await;
        }
    }

    /// Run a single monitor pass; returns the snapshot it logged
    pub async fn run_once(&self) -> HealthSnapshot {
        let snapshot = self.scheduler.statistics().await;
        info!(
            active = snapshot.active_workers,
            queued = snapshot.queue_size,
            total = snapshot.total_tasks,
            "Health check"
        );

        for (task_id, run) in self.scheduler.list_active().await {
            let runtime = run.runtime();
            if runtime > self.long_running_warn {
                warn!(
                    %task_id,
                    worker = %run.worker,
                    runtime_secs = runtime.num_seconds(),
                    "Long-running task"
                );
            }
        }

        snapshot
    }
}
