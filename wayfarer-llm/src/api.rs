//! Request execution with timeout, status mapping and retries

use crate::error::{LlmError, Result};
use crate::response::ErrorResponse;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const BASE_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct ApiRequest<T> {
    endpoint: String,
    body: T,
    timeout: Duration,
    retry_count: u32,
    backoff: Duration,
}

impl<T: Serialize> ApiRequest<T> {
    pub fn new(endpoint: impl Into<String>, body: T) -> Self {
        Self {
            endpoint: endpoint.into(),
            body,
            timeout: DEFAULT_TIMEOUT,
            retry_count: 2,
            backoff: BASE_BACKOFF,
        }
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    pub fn retries(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    pub fn backoff(mut self, base: Duration) -> Self {
        self.backoff = base;
        self
    }

    /// Sends the request, retrying transient failures with doubling backoff.
    pub async fn execute(self, client: &Client, api_key: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            match self.try_request(client, api_key).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < self.retry_count => {
                    attempt += 1;
                    warn!(endpoint = %self.endpoint, attempt, error = %e, "Completion request failed, retrying");
                    tokio::time::sleep(self.backoff * 2u32.pow(attempt - 1)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_request(&self, client: &Client, api_key: &str) -> Result<Response> {
        let mut request = client
            .post(&self.endpoint)
            .json(&self.body)
            .timeout(self.timeout);
        if !api_key.is_empty() {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        let status = response.status();
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "Completion response");

        match status {
            s if s.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => {
                Err(LlmError::RateLimit("Rate limit exceeded".into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(LlmError::AuthError(error_message(response).await))
            }
            _ => Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            }),
        }
    }
}

async fn error_message(response: Response) -> String {
    let raw = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&raw) {
        Ok(body) => body.error.message,
        Err(_) if raw.is_empty() => "no error body".to_string(),
        Err(_) => raw,
    }
}
