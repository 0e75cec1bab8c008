//! scraperd configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main scraperd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scraper command configuration
    pub scraper: ScraperConfig,

    /// Scheduler / dispatcher configuration
    pub scheduler: SchedulerConfig,

    /// Periodic timer configuration
    pub cron: CronConfig,

    /// Terminal-record retention configuration
    pub retention: RetentionConfig,

    /// Airtable worklist configuration
    pub airtable: AirtableConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in daemon startup to fail fast with clear error
    /// messages.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.airtable.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "Airtable API key not found. Set the {} environment variable.",
                self.airtable.api_key_env
            ));
        }
        if self.scraper.command.is_empty() {
            return Err(eyre::eyre!("scraper.command must not be empty"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .scraperd.yml
        let local_config = PathBuf::from(".scraperd.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/scraperd/scraperd.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("scraperd").join("scraperd.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Scraper command configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Executable invoked once per job
    pub command: String,

    /// Arguments; `{hashtag}` and `{num_profiles}` are substituted per job
    pub args: Vec<String>,

    /// Profile count used when a request does not specify one
    #[serde(rename = "default-num-profiles")]
    pub default_num_profiles: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            command: "scrape-tiktok".to_string(),
            args: vec![
                "--hashtag".to_string(),
                "{hashtag}".to_string(),
                "--num-profiles".to_string(),
                "{num_profiles}".to_string(),
            ],
            default_num_profiles: 500,
        }
    }
}

/// Periodic timer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CronConfig {
    /// Interval between worklist enqueue cycles (hours)
    #[serde(rename = "enqueue-interval-hours")]
    pub enqueue_interval_hours: u64,

    /// Interval between retention sweeps (hours)
    #[serde(rename = "sweep-interval-hours")]
    pub sweep_interval_hours: u64,

    /// Interval between health monitor passes (minutes)
    #[serde(rename = "monitor-interval-mins")]
    pub monitor_interval_mins: u64,

    /// Active runs older than this are flagged as long-running (seconds)
    #[serde(rename = "long-running-warn-secs")]
    pub long_running_warn_secs: u64,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            enqueue_interval_hours: 24,
            sweep_interval_hours: 6,
            monitor_interval_mins: 30,
            long_running_warn_secs: 3600,
        }
    }
}

/// Terminal-record retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Terminal records older than this are evicted by the sweeper (hours)
    #[serde(rename = "max-age-hours")]
    pub max_age_hours: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { max_age_hours: 24 }
    }
}

/// Airtable worklist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirtableConfig {
    /// Environment variable containing the personal access token
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Airtable base ID
    #[serde(rename = "base-id")]
    pub base_id: String,

    /// Table holding the hashtag worklist
    #[serde(rename = "hashtags-table")]
    pub hashtags_table: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key_env: "AIRTABLE_PAT".to_string(),
            base_url: "https://api.airtable.com".to_string(),
            base_id: String::new(),
            hashtags_table: "hashtags".to_string(),
            timeout_ms: 30_000,
        }
    }
}
