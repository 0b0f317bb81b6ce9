//! Chat completion client implementing the core `Completion` collaborator

use crate::api::ApiRequest;
use crate::error::{LlmError, Result};
use crate::response::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::LlmConfig;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error};
use wayfarer_core::Completion;

pub struct ChatCompletionClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl ChatCompletionClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Sends a single user message and returns the first choice's text.
    pub async fn chat(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let started = Instant::now();
        let response = ApiRequest::new(self.config.completions_url(), request)
            .timeout(self.config.timeout)
            .retries(self.config.retries)
            .execute(&self.http_client, &self.config.api_key)
            .await?;

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            LlmError::ParseError(e.to_string())
        })?;

        debug!(
            model = %self.config.model,
            latency_ms = started.elapsed().as_millis() as u64,
            total_tokens = body.usage.map(|u| u.total_tokens),
            "Completion received"
        );

        body.first_content()
            .map(str::to_string)
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[async_trait]
impl Completion for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> wayfarer_core::Result<String> {
        Ok(self.chat(prompt).await?)
    }
}
