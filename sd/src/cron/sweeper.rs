//! Retention sweeper
//!
//! Periodically evicts terminal task records older than the retention
//! age. Queued and running tasks are never touched.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::scheduler::Scheduler;

pub struct RetentionSweeper {
    scheduler: Arc<Scheduler>,
    interval: Duration,
    max_age_hours: u64,
}

impl RetentionSweeper {
    pub fn new(scheduler: Arc<Scheduler>, config: &Config) -> Self {
        Self {
            scheduler,
            interval: Duration::from_secs(config.cron.sweep_interval_hours * 3600),
            max_age_hours: config.retention.max_age_hours,
        }
    }

    /// Run the timer loop; the first sweep fires one interval after start
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_age_hours = self.max_age_hours,
            "Retention sweeper started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await;

        loop {
            interval.tick().await;
            self.run_once().await;
        }
    }

    /// Run a single sweep; returns the eviction count
    pub async fn run_once(&self) -> usize {
        let evicted = self.scheduler.cleanup(self.max_age_hours).await;
        if evicted > 0 {
            info!(evicted, "Sweep removed old tasks");
        }
        evicted
    }
}
