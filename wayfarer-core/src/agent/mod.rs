//! Capability agents: the hotel and car rental search services.
//!
//! One agent handles one task at a time per call and walks it through
//! `Received -> Searching -> Formatting -> Completed`, ending early in
//! `Error` (search failed) or `InputRequired` (nothing to work with).

mod booking;
mod extract;

pub use booking::{Booking, BookingDesk, BookingRequest, BookingStatus};
pub use extract::{
    budget_in, dates_in, extract, extract_price, guests_in, location_in, price_or_placeholder,
    SearchParams, DEFAULT_DRIVER_AGE, DEFAULT_GUESTS, DEFAULT_LOCATION,
};

use crate::collaborator::{Completion, SearchHit, WebSearch};
use crate::error::Result;
use crate::prompt::{PromptTemplate, CAR_EXTRACTION, HOTEL_EXTRACTION};
use crate::protocol::{CapabilityResult, ResultItem};
use crate::registry::{AgentCard, TravelCapability};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Maximum listings returned per task.
pub const MAX_RESULTS: usize = 5;

pub const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Received,
    Searching,
    Formatting,
    Completed,
    Error,
    InputRequired,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Error | TaskState::InputRequired
        )
    }
}

/// Timeouts for the agent's own collaborator calls.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub extraction_timeout: Duration,
    pub search_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            extraction_timeout: DEFAULT_EXTRACTION_TIMEOUT,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }
}

pub struct CapabilityAgent {
    capability: TravelCapability,
    card: AgentCard,
    llm: Arc<dyn Completion>,
    search: Arc<dyn WebSearch>,
    config: AgentConfig,
    bookings: BookingDesk,
    tasks: Arc<RwLock<HashMap<String, TaskState>>>,
}

impl CapabilityAgent {
    pub fn new(
        capability: TravelCapability,
        url: impl Into<String>,
        llm: Arc<dyn Completion>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self {
            capability,
            card: AgentCard::for_capability(capability, url),
            llm,
            search,
            config: AgentConfig::default(),
            bookings: BookingDesk::new(capability),
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn hotel(
        url: impl Into<String>,
        llm: Arc<dyn Completion>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self::new(TravelCapability::Hotel, url, llm, search)
    }

    pub fn car_rental(
        url: impl Into<String>,
        llm: Arc<dyn Completion>,
        search: Arc<dyn WebSearch>,
    ) -> Self {
        Self::new(TravelCapability::CarRental, url, llm, search)
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn capability(&self) -> TravelCapability {
        self.capability
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn bookings(&self) -> &BookingDesk {
        &self.bookings
    }

    /// Last recorded state of a task, if this agent has seen it.
    pub async fn task_state(&self, task_id: &str) -> Option<TaskState> {
        self.tasks.read().await.get(task_id).copied()
    }

    async fn transition(&self, task_id: &str, state: TaskState) {
        debug!(agent = %self.card.name, task_id, ?state, "Task state");
        self.tasks.write().await.insert(task_id.to_string(), state);
    }

    /// Runs one natural-language task to a terminal state.
    pub async fn handle(&self, task_id: &str, text: &str) -> CapabilityResult {
        self.transition(task_id, TaskState::Received).await;

        if text.trim().is_empty() {
            self.transition(task_id, TaskState::InputRequired).await;
            return CapabilityResult::input_required(match self.capability {
                TravelCapability::Hotel => {
                    "Please tell me where and when you would like to stay."
                }
                TravelCapability::CarRental => {
                    "Please tell me where and when you need a rental car."
                }
            });
        }

        let today = Local::now().date_naive();
        let params = self.extract_params(text, today).await;
        info!(
            agent = %self.card.name,
            task_id,
            location = %params.location,
            start = %params.start,
            end = %params.end,
            fallback = params.used_fallback,
            "Parameters extracted"
        );

        self.transition(task_id, TaskState::Searching).await;
        let query = params.query(self.capability);
        let hits = match self.run_search(&query).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(agent = %self.card.name, task_id, error = %e, "Search failed");
                self.transition(task_id, TaskState::Error).await;
                return CapabilityResult::error(format!(
                    "{} search failed: {}",
                    self.noun(),
                    e
                ));
            }
        };

        self.transition(task_id, TaskState::Formatting).await;
        let items = normalize(hits);
        let result = if items.is_empty() {
            CapabilityResult::prose(format!(
                "No {} listings found in {} from {} to {}.",
                self.noun().to_lowercase(),
                params.location,
                params.start,
                params.end
            ))
        } else {
            CapabilityResult::completed(items)
        };

        self.transition(task_id, TaskState::Completed).await;
        result
    }

    async fn extract_params(&self, text: &str, today: NaiveDate) -> SearchParams {
        let template = PromptTemplate::new(match self.capability {
            TravelCapability::Hotel => HOTEL_EXTRACTION,
            TravelCapability::CarRental => CAR_EXTRACTION,
        });
        let mut variables = HashMap::new();
        variables.insert("request", text.to_string());
        variables.insert("today", today.to_string());
        let prompt = template.render(&variables);

        let answer = match timeout(self.config.extraction_timeout, self.llm.complete(&prompt)).await
        {
            Ok(Ok(answer)) => Some(answer),
            Ok(Err(e)) => {
                warn!(agent = %self.card.name, error = %e, "Extraction failed, using fallback");
                None
            }
            Err(_) => {
                warn!(agent = %self.card.name, "Extraction timed out, using fallback");
                None
            }
        };

        extract(answer.as_deref(), text, today)
    }

    async fn run_search(&self, query: &str) -> Result<Vec<SearchHit>> {
        debug!(agent = %self.card.name, query, "Searching");
        timeout(self.config.search_timeout, self.search.search(query))
            .await
            .map_err(|_| {
                crate::error::Error::Search(format!(
                    "no answer within {:?}",
                    self.config.search_timeout
                ))
            })?
    }

    fn noun(&self) -> &'static str {
        match self.capability {
            TravelCapability::Hotel => "Hotel",
            TravelCapability::CarRental => "Car rental",
        }
    }
}

fn normalize(hits: Vec<SearchHit>) -> Vec<ResultItem> {
    hits.into_iter()
        .take(MAX_RESULTS)
        .map(|hit| ResultItem {
            estimated_cost: price_or_placeholder(&hit.description, hit.price.as_deref()),
            name: hit.title,
            description: hit.description,
            link: hit.link,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Completion stub returning a fixed answer (or failing).
    pub struct FixedCompletion {
        pub answer: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FixedCompletion {
        pub fn answering(answer: &str) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(answer.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Completion for FixedCompletion {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer
                .clone()
                .ok_or_else(|| Error::Llm("model unavailable".into()))
        }
    }

    /// Search stub recording queries.
    pub struct FixedSearch {
        pub hits: Option<Vec<SearchHit>>,
        pub queries: std::sync::Mutex<Vec<String>>,
    }

    impl FixedSearch {
        pub fn returning(count: usize) -> Arc<Self> {
            let hits = (0..count)
                .map(|i| SearchHit {
                    title: format!("Listing {}", i + 1),
                    description: format!("Rooms from ${} per night", 100 + i),
                    link: format!("https://example.com/{}", i + 1),
                    price: None,
                })
                .collect();
            Arc::new(Self {
                hits: Some(hits),
                queries: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub fn failing() -> Arc<Self> {
            Arc::new(Self {
                hits: None,
                queries: std::sync::Mutex::new(Vec::new()),
            })
        }

        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().map(|q| q.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl WebSearch for FixedSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
            if let Ok(mut queries) = self.queries.lock() {
                queries.push(query.to_string());
            }
            self.hits
                .clone()
                .ok_or_else(|| Error::Search("SERPER_API_KEY not configured".into()))
        }
    }
}
