//! Periodic enqueuer
//!
//! On a fixed interval, discovers the active-hashtag worklist and
//! submits one cron-origin task per hashtag at the default priority.

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::domain::TaskOrigin;
use crate::scheduler::Scheduler;
use crate::worklist::WorklistProvider;

pub struct PeriodicEnqueuer {
    scheduler: Arc<Scheduler>,
    worklist: Arc<dyn WorklistProvider>,
    interval: Duration,
    num_profiles: u32,
    priority: i32,
}

impl PeriodicEnqueuer {
    pub fn new(scheduler: Arc<Scheduler>, worklist: Arc<dyn WorklistProvider>, config: &Config) -> Self {
        Self {
            scheduler,
            worklist,
            interval: Duration::from_secs(config.cron.enqueue_interval_hours * 3600),
            num_profiles: config.scraper.default_num_profiles,
            priority: config.scheduler.default_priority,
        }
    }

    /// Run the timer loop; the first cycle fires one interval after start
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Periodic enqueuer started");

        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await; // completes immediately; cycles start after one period

        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Enqueue cycle failed");
            }
        }
    }

    /// Run a single enqueue cycle; returns the number of tasks queued
    pub async fn run_once(&self) -> Result<usize> {
        let hashtags = self.worklist.active_hashtags().await?;

        if hashtags.is_empty() {
            // Not an error condition: nothing is due this cycle
            info!("No active hashtags found; skipping cycle");
            return Ok(0);
        }

        let mut queued = 0;
        for hashtag in &hashtags {
            match self
                .scheduler
                .submit(hashtag, self.num_profiles, TaskOrigin::Cron, self.priority)
                .await
            {
                Ok(task_id) => {
                    debug!(%task_id, hashtag, "Cron task queued");
                    queued += 1;
                }
                Err(e) => {
                    error!(hashtag, error = %e, "Failed to queue cron task");
                }
            }
        }

        info!(queued, total = hashtags.len(), "Enqueue cycle complete");
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::executor::ScrapeExecutor;
    use crate::scheduler::SchedulerConfig;

    struct NoopExecutor;

    #[async_trait]
    impl ScrapeExecutor for NoopExecutor {
        async fn run(&self, _hashtag: &str, _num_profiles: u32) -> Result<()> {
            Ok(())
        }
    }

    struct FixedWorklist(Vec<String>);

    #[async_trait]
    impl WorklistProvider for FixedWorklist {
        async fn active_hashtags(&self) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenWorklist;

    #[async_trait]
    impl WorklistProvider for BrokenWorklist {
        async fn active_hashtags(&self) -> Result<Vec<String>> {
            Err(eyre::eyre!("airtable unreachable"))
        }
    }

    fn make_enqueuer(worklist: Arc<dyn WorklistProvider>) -> (Arc<Scheduler>, PeriodicEnqueuer) {
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default(), Arc::new(NoopExecutor)));
        let config = Config::default();
        let enqueuer = PeriodicEnqueuer::new(Arc::clone(&scheduler), worklist, &config);
        (scheduler, enqueuer)
    }

    #[tokio::test]
    async fn test_run_once_queues_each_hashtag() {
        let (scheduler, enqueuer) =
            make_enqueuer(Arc::new(FixedWorklist(vec!["cricket".to_string(), "travel".to_string()])));

        let queued = enqueuer.run_once().await.unwrap();
        assert_eq!(queued, 2);

        let tasks = scheduler.list_all().await;
        assert_eq!(tasks.len(), 2);
        assert!(tasks.values().all(|t| t.origin == TaskOrigin::Cron));
        assert!(tasks.values().all(|t| t.num_profiles == 500));
    }

    #[tokio::test]
    async fn test_empty_worklist_skips_cycle() {
        let (scheduler, enqueuer) = make_enqueuer(Arc::new(FixedWorklist(vec![])));

        let queued = enqueuer.run_once().await.unwrap();
        assert_eq!(queued, 0);
        assert!(scheduler.list_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_worklist_fault_propagates() {
        let (scheduler, enqueuer) = make_enqueuer(Arc::new(BrokenWorklist));

        assert!(enqueuer.run_once().await.is_err());
        assert!(scheduler.list_all().await.is_empty());
    }
}
