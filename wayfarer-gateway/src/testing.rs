//! Collaborator stubs for router tests.

use async_trait::async_trait;
use std::sync::Arc;
use wayfarer_core::{Completion, Error, Result, SearchHit, WebSearch};

pub struct StubCompletion {
    answer: Option<String>,
}

impl StubCompletion {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { answer: None })
    }
}

#[async_trait]
impl Completion for StubCompletion {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.answer
            .clone()
            .ok_or_else(|| Error::Llm("model unavailable".into()))
    }
}

pub struct StubSearch {
    count: usize,
}

impl StubSearch {
    pub fn returning(count: usize) -> Arc<Self> {
        Arc::new(Self { count })
    }
}

#[async_trait]
impl WebSearch for StubSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        Ok((0..self.count)
            .map(|i| SearchHit {
                title: format!("Result {} for {}", i + 1, query),
                description: format!("From ${} per day", 40 + i * 10),
                link: format!("https://listings.example/{}", i + 1),
                price: None,
            })
            .collect())
    }
}
