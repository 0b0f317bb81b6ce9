//! Narrow interfaces to the external collaborators.
//!
//! The capability agents and the coordinator only ever see these two
//! traits. Concrete clients live in their own crates (`wayfarer-llm`,
//! `wayfarer-serper`) and are injected at construction time.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text completion: one prompt in, one answer out.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// One organic web search hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchHit {
    pub title: String,
    pub description: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// Web search returning hits in relevance order.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}
