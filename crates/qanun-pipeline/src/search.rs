//! Trusted-source search over a scope-restricted web index.
//!
//! - `GoogleCseSearch` queries a Google Programmable Search Engine whose
//!   scope is restricted to vetted legal sites.
//! - `MockSearch` returns canned hits for testing.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use qanun_core::config::SearchCredentials;
use qanun_core::types::SourceHit;
use serde::Deserialize;
use tracing::debug;

use crate::error::{PipelineError, Result};

/// Ranked-snippet search over trusted legal sources.
///
/// Search failures are not recovered here; the caller decides whether the
/// whole request aborts.
#[async_trait]
pub trait SourceSearch: Send + Sync {
    /// Run one query and return up to the configured number of hits.
    async fn search(&self, query: &str) -> Result<Vec<SourceHit>>;
}

// ---------------------------------------------------------------------------
// GoogleCseSearch - Google Custom Search Engine backend
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search client restricted to one engine scope.
pub struct GoogleCseSearch {
    endpoint: String,
    credentials: SearchCredentials,
    result_limit: usize,
    http: reqwest::Client,
}

impl GoogleCseSearch {
    pub fn new(
        endpoint: impl Into<String>,
        credentials: SearchCredentials,
        result_limit: usize,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            endpoint: endpoint.into(),
            credentials,
            result_limit,
            http,
        }
    }
}

#[async_trait]
impl SourceSearch for GoogleCseSearch {
    async fn search(&self, query: &str) -> Result<Vec<SourceHit>> {
        debug!(%query, "Searching trusted sources");
        let limit = self.result_limit.to_string();

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("cx", self.credentials.engine_id.as_str()),
                ("q", query),
                ("num", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PipelineError::Search(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Search(format!(
                "API error {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Search(format!("could not parse body: {}", e)))?;

        let hits = parsed
            .items
            .into_iter()
            .take(self.result_limit)
            .map(|item| SourceHit {
                title: item.title,
                link: item.link,
                snippet: item.snippet,
            })
            .collect();

        Ok(hits)
    }
}

// ---------------------------------------------------------------------------
// MockSearch - canned hits for testing
// ---------------------------------------------------------------------------

/// Mock search that returns a fixed hit list or a fixed failure.
///
/// Queries are recorded so tests can assert what was searched and how often.
#[derive(Default)]
pub struct MockSearch {
    hits: Vec<SourceHit>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    /// A mock that answers every query with the given hits.
    pub fn returning(hits: Vec<SourceHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    /// A mock that fails every query.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// All queries seen so far, in call order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SourceSearch for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<SourceHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        match &self.failure {
            Some(message) => Err(PipelineError::Search(message.clone())),
            None => Ok(self.hits.clone()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
