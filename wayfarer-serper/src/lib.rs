//! Serper web search client for Wayfarer.
//!
//! Implements the core [`WebSearch`] collaborator on top of
//! `POST https://google.serper.dev/search`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use wayfarer_core::error::Error as CoreError;
use wayfarer_core::{SearchHit, WebSearch};

pub const DEFAULT_ENDPOINT: &str = "https://google.serper.dev/search";
pub const API_KEY_ENV: &str = "SERPER_API_KEY";
const DEFAULT_RESULT_COUNT: u32 = 10;

#[derive(Error, Debug)]
pub enum SerperError {
    #[error("SERPER_API_KEY not configured")]
    MissingApiKey,

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Search API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<SerperError> for CoreError {
    fn from(err: SerperError) -> Self {
        CoreError::Search(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SerperError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerperConfig {
    pub api_key: String,
    pub endpoint: String,
    pub num_results: u32,
    pub timeout: Duration,
}

impl Default for SerperConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            num_results: DEFAULT_RESULT_COUNT,
            timeout: Duration::from_secs(15),
        }
    }
}

impl SerperConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    price: Option<String>,
}

impl From<OrganicResult> for SearchHit {
    fn from(result: OrganicResult) -> Self {
        SearchHit {
            title: result.title,
            description: result.snippet,
            link: result.link,
            price: result.price,
        }
    }
}

pub struct SerperClient {
    config: SerperConfig,
    http_client: reqwest::Client,
}

impl SerperClient {
    pub fn new(config: SerperConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Organic results for `query`, in ranking order.
    pub async fn organic(&self, query: &str) -> Result<Vec<SearchHit>> {
        if self.config.api_key.is_empty() {
            return Err(SerperError::MissingApiKey);
        }

        let started = Instant::now();
        let response = self
            .http_client
            .post(&self.config.endpoint)
            .header("X-API-KEY", &self.config.api_key)
            .json(&SearchRequest {
                q: query,
                num: self.config.num_results,
            })
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| SerperError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Search request rejected");
            return Err(SerperError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SerperError::ParseError(e.to_string()))?;

        debug!(
            query,
            hits = body.organic.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(body.organic.into_iter().map(SearchHit::from).collect())
    }
}

#[async_trait]
impl WebSearch for SerperClient {
    async fn search(&self, query: &str) -> wayfarer_core::Result<Vec<SearchHit>> {
        Ok(self.organic(query).await?)
    }
}
