//! Web-search collaborator: trait, result type, and HTTP adapter.
//!
//! The research sub-pipeline only needs `{url, title, snippet}` tuples; any
//! provider that can produce those fits behind [`SearchProvider`]. Individual
//! query failures are expected and are caught by the caller, never escalated
//! past a single claim.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("search provider error: {message}")]
    Provider { message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SearchError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Trait for web search providers.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError>;
}

// =============================================================================
// HTTP ADAPTER
// =============================================================================

/// Adapter for a Serper-style JSON search API (`POST {q, num}` →
/// `{organic: [{link, title, snippet}]}`).
#[derive(Debug, Clone)]
pub struct HttpSearchAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_config(api_key, "https://google.serper.dev", Duration::from_secs(30))
    }

    pub fn from_env() -> Result<Self, SearchError> {
        let api_key = std::env::var("SEARCH_API_KEY")
            .map_err(|_| SearchError::config("SEARCH_API_KEY not set"))?;

        let base_url = std::env::var("SEARCH_BASE_URL")
            .unwrap_or_else(|_| "https://google.serper.dev".into());

        let timeout = std::env::var("SEARCH_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Self::with_config(api_key, base_url, timeout)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key_value = HeaderValue::from_str(&api_key)
            .map_err(|_| SearchError::config("Invalid API key format"))?;
        headers.insert("X-API-KEY", key_value);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| SearchError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[derive(Serialize)]
struct SearchApiRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Deserialize)]
struct SearchApiResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchProvider for HttpSearchAdapter {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&SearchApiRequest { q: query, num: limit })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::provider(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: SearchApiResponse = response.json().await?;

        Ok(parsed
            .organic
            .into_iter()
            .take(limit)
            .map(|r| SearchResult {
                url: r.link,
                title: r.title,
                snippet: r.snippet,
            })
            .collect())
    }
}
