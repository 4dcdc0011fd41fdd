// src/services/projects.rs

//! Record search API source.
//!
//! Queries the `projets-environnement` dataset once per keyword, one after
//! another. A failed keyword is logged and skipped; the others still run.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use url::Url;

use crate::error::Result;
use crate::models::{Finding, ProjectRecord, ProjectsConfig, RECORD_ID_PLACEHOLDER};
use crate::services::{Harvest, KeywordFailure, Source};
use crate::utils::http::fetch_text;

/// Body of a `records/1.0/search/` response.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    /// Absent or null means no results
    #[serde(default)]
    pub records: Option<Vec<ApiRecord>>,
}

/// One element of the `records` array.
#[derive(Debug, Default, Deserialize)]
pub struct ApiRecord {
    #[serde(default)]
    pub recordid: Value,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl ApiRecord {
    /// Field value as display text; absent or null is empty.
    fn field(&self, name: &str) -> String {
        self.fields.get(name).map(value_text).unwrap_or_default()
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Full-text search over one dataset.
#[async_trait]
pub trait RecordSearch: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<SearchResponse>;
}

/// HTTP client for the public record search endpoint.
pub struct ApiSearch {
    client: Client,
    endpoint: Url,
    dataset: String,
    rows: u32,
}

impl ApiSearch {
    pub fn new(client: Client, config: &ProjectsConfig) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: config.search_endpoint()?,
            dataset: config.dataset.clone(),
            rows: config.rows,
        })
    }
}

#[async_trait]
impl RecordSearch for ApiSearch {
    async fn search(&self, keyword: &str) -> Result<SearchResponse> {
        let rows = self.rows.to_string();
        let request = self.client.get(self.endpoint.clone()).query(&[
            ("dataset", self.dataset.as_str()),
            ("q", keyword),
            ("rows", rows.as_str()),
        ]);

        let body = fetch_text(request).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Source turning search results into project findings.
pub struct ProjectSource<S = ApiSearch> {
    search: S,
    keywords: Vec<String>,
    detail_url_template: String,
}

impl<S: RecordSearch> ProjectSource<S> {
    pub fn new(search: S, keywords: Vec<String>, detail_url_template: impl Into<String>) -> Self {
        Self {
            search,
            keywords,
            detail_url_template: detail_url_template.into(),
        }
    }

    fn to_finding(&self, keyword: &str, record: &ApiRecord) -> Finding {
        let record_id = value_text(&record.recordid);
        Finding::Project(ProjectRecord {
            keyword: keyword.to_string(),
            title: record.field("titre"),
            description: record.field("description"),
            commune: record.field("commune"),
            departement: record.field("departement"),
            url: self
                .detail_url_template
                .replace(RECORD_ID_PLACEHOLDER, &record_id),
            record_id,
        })
    }
}

#[async_trait]
impl<S: RecordSearch> Source for ProjectSource<S> {
    async fn collect(&self) -> Result<Harvest> {
        let mut harvest = Harvest::default();

        for keyword in &self.keywords {
            log::info!("Searching keyword: {keyword}");
            match self.search.search(keyword).await {
                Ok(response) => {
                    let records = response.records.unwrap_or_default();
                    log::debug!("{} records for '{}'", records.len(), keyword);
                    harvest
                        .findings
                        .extend(records.iter().map(|r| self.to_finding(keyword, r)));
                }
                Err(error) => {
                    log::warn!("Search failed for '{}': {}", keyword, error);
                    harvest.failures.push(KeywordFailure {
                        keyword: keyword.clone(),
                        error,
                    });
                }
            }
        }

        Ok(harvest)
    }
}
