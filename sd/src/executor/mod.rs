//! Scrape execution seam
//!
//! The scheduler treats scraping as a black box: given a hashtag and a
//! target profile count, the executor performs the network/browser work
//! and reports success or a fault. Runs may take unbounded wall-clock
//! time; there is no per-job timeout.

use std::process::Stdio;

use async_trait::async_trait;
use eyre::{Result, eyre};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ScraperConfig;

/// Executes one scraping job
#[async_trait]
pub trait ScrapeExecutor: Send + Sync {
    /// Run the scrape for `hashtag`, targeting `num_profiles` profiles.
    /// Returns Err for any fault; the message is recorded on the task.
    async fn run(&self, hashtag: &str, num_profiles: u32) -> Result<()>;
}

/// Executor that shells out to a configured scraper command
///
/// `{hashtag}` and `{num_profiles}` placeholders in the configured
/// arguments are substituted per job.
pub struct CommandExecutor {
    command: String,
    args: Vec<String>,
}

impl CommandExecutor {
    /// Create an executor from the scraper section of the config
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    fn render_args(&self, hashtag: &str, num_profiles: u32) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{hashtag}", hashtag)
                    .replace("{num_profiles}", &num_profiles.to_string())
            })
            .collect()
    }
}

#[async_trait]
impl ScrapeExecutor for CommandExecutor {
    async fn run(&self, hashtag: &str, num_profiles: u32) -> Result<()> {
        let args = self.render_args(hashtag, num_profiles);
        debug!(command = %self.command, ?args, "Spawning scraper process");

        let output = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| eyre!("failed to spawn {}: {}", self.command, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("\n");
            return Err(eyre!("scraper exited with {}: {}", output.status, tail.trim()));
        }

        info!(hashtag, num_profiles, "Scraper process finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(command: &str, args: &[&str]) -> CommandExecutor {
        CommandExecutor {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_render_args_substitution() {
        let exec = executor("scrape", &["--hashtag", "{hashtag}", "--count", "{num_profiles}"]);
        let args = exec.render_args("cricket", 500);
        assert_eq!(args, vec!["--hashtag", "cricket", "--count", "500"]);
    }

    #[tokio::test]
    async fn test_successful_command() {
        let exec = executor("true", &[]);
        assert!(exec.run("cricket", 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_command_is_a_fault() {
        let exec = executor("sh", &["-c", "echo 'no such hashtag' >&2; exit 3"]);
        let err = exec.run("cricket", 1).await.unwrap_err();
        assert!(err.to_string().contains("no such hashtag"));
    }

    #[tokio::test]
    async fn test_missing_command_is_a_fault() {
        let exec = executor("definitely-not-a-real-binary", &[]);
        assert!(exec.run("cricket", 1).await.is_err());
    }
}
