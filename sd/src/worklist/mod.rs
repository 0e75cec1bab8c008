//! Worklist seam
//!
//! The periodic enqueuer discovers its worklist (active hashtags) through
//! this trait. The production implementation reads the hashtags table in
//! Airtable; tests substitute a fixed list.

use async_trait::async_trait;
use eyre::{Result, eyre};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::AirtableConfig;

/// Supplies the list of hashtags due for scraping
#[async_trait]
pub trait WorklistProvider: Send + Sync {
    async fn active_hashtags(&self) -> Result<Vec<String>>;
}

/// One page of the Airtable records API
#[derive(Debug, Deserialize)]
struct RecordsPage {
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirtableRecord {
    fields: HashtagFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HashtagFields {
    #[serde(rename = "Hashtag")]
    hashtag: Option<String>,
    #[serde(rename = "Active")]
    active: bool,
}

/// Worklist backed by an Airtable hashtags table
///
/// Keeps records whose `Active` checkbox is set and returns their
/// `Hashtag` field values.
pub struct AirtableWorklist {
    http: Client,
    base_url: String,
    base_id: String,
    table: String,
    api_key: String,
}

impl AirtableWorklist {
    /// Create a client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &AirtableConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| eyre!("Airtable API key not found. Set the {} environment variable.", config.api_key_env))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            base_id: config.base_id.clone(),
            table: config.hashtags_table.clone(),
            api_key,
        })
    }

    fn records_url(&self) -> String {
        format!("{}/v0/{}/{}", self.base_url, self.base_id, self.table)
    }

    async fn fetch_page(&self, offset: Option<&str>) -> Result<RecordsPage> {
        let mut request = self.http.get(self.records_url()).bearer_auth(&self.api_key);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Airtable request failed ({}): {}", status, body));
        }

        Ok(response.json().await?)
    }
}

/// Extract active hashtag values from fetched records
fn active_hashtags_from(records: Vec<AirtableRecord>) -> Vec<String> {
    records
        .into_iter()
        .filter(|r| r.fields.active)
        .filter_map(|r| r.fields.hashtag)
        .collect()
}

#[async_trait]
impl WorklistProvider for AirtableWorklist {
    async fn active_hashtags(&self) -> Result<Vec<String>> {
        let mut hashtags = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            debug!(?offset, "Fetching hashtags page");
            let page = self.fetch_page(offset.as_deref()).await?;
            hashtags.extend(active_hashtags_from(page.records));

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        info!(count = hashtags.len(), "Fetched active hashtags");
        Ok(hashtags)
    }
}
