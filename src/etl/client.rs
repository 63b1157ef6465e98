//! ClinicalTrials.gov v2 API client

use anyhow::{bail, Context, Result};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SourceConfig;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudiesPage {
    #[serde(default)]
    studies: Vec<serde_json::Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClinicalTrialsClient {
    http: reqwest::Client,
    base_url: String,
    condition: String,
    page_size: u32,
    max_studies: Option<usize>,
}

impl ClinicalTrialsClient {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            condition: config.condition.clone(),
            page_size: config.page_size.clamp(1, 1000),
            max_studies: config.max_studies,
        })
    }

    /// Download every study matching the condition, following page tokens.
    /// Records are returned untouched so `studies.json` mirrors the API.
    pub async fn fetch_studies(&self) -> Result<Vec<serde_json::Value>> {
        let url = format!("{}/studies", self.base_url);
        let mut studies = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("query.cond", self.condition.clone()),
                ("format", "json".to_string()),
                ("pageSize", self.page_size.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            debug!(url = %url, page = ?page_token, "Requesting studies page");
            let response = self
                .http
                .get(&url)
                .header(ACCEPT, "application/json")
                .header(USER_AGENT, concat!("ctgov-etl/", env!("CARGO_PKG_VERSION")))
                .query(&query)
                .send()
                .await
                .with_context(|| format!("Request to {url} failed"))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                bail!("ClinicalTrials.gov returned HTTP {status}: {body}");
            }

            let page: StudiesPage = response
                .json()
                .await
                .context("Malformed studies page")?;
            studies.extend(page.studies);

            if let Some(max) = self.max_studies {
                if studies.len() >= max {
                    studies.truncate(max);
                    break;
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        if studies.is_empty() {
            bail!("No studies found for condition '{}'", self.condition);
        }

        info!(count = studies.len(), condition = %self.condition, "Downloaded studies");
        Ok(studies)
    }
}
