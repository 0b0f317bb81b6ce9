//! Protocol types module containing the planning data model.
//!
//! These are the values exchanged between the Front Door, the coordinator
//! and the capability agents. Everything here serializes to the JSON shapes
//! used on the wire and in the Front Door payloads.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Placeholder used when no price could be read from a listing.
pub const PRICE_UNAVAILABLE: &str = "N/A";

/// Descriptor of a discovered (or configured) peer agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
    pub capabilities: BTreeSet<String>,
    pub endpoint: String,
    pub protocol_version: String,
}

impl AgentDescriptor {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Accommodation and rental price band requested by the traveller.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetTier {
    #[default]
    Any,
    Budget,
    MidRange,
    Luxury,
}

impl BudgetTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetTier::Any => "any",
            BudgetTier::Budget => "budget",
            BudgetTier::MidRange => "mid-range",
            BudgetTier::Luxury => "luxury",
        }
    }
}

impl fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "" => Ok(BudgetTier::Any),
            "budget" | "cheap" | "budget-friendly" => Ok(BudgetTier::Budget),
            "mid-range" | "midrange" | "mid_range" | "moderate" => Ok(BudgetTier::MidRange),
            "luxury" | "premium" => Ok(BudgetTier::Luxury),
            other => Err(Error::validation(format!("unknown budget tier: {}", other))),
        }
    }
}

fn default_guests() -> u32 {
    1
}

/// One external trip request, as accepted by the Front Door.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripRequest {
    pub destination: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default, alias = "budget")]
    pub budget_tier: BudgetTier,
    #[serde(default = "default_guests", alias = "guests")]
    pub guest_count: u32,
    #[serde(default)]
    pub car_needed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
}

impl TripRequest {
    /// Checks the invariants the coordinator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(Error::validation("destination must not be empty"));
        }
        if self.guest_count < 1 {
            return Err(Error::validation("guest_count must be at least 1"));
        }
        if self.check_out < self.check_in {
            return Err(Error::validation(format!(
                "check_out {} is before check_in {}",
                self.check_out, self.check_in
            )));
        }
        Ok(())
    }

    pub fn dates(&self) -> TripDates {
        TripDates {
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TripDates {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Terminal state of one capability agent invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    InputRequired,
    Error,
}

/// A normalized listing (hotel or rental offer).
///
/// Deserialization accepts the field names agents and models tend to use:
/// `title`/`company` for `name`, `snippet` for `description`,
/// `estimated_cost_usd`/`price` for `estimated_cost`. The canonical key wins
/// when several are present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "RawResultItem")]
pub struct ResultItem {
    pub name: String,
    pub description: String,
    pub link: String,
    pub estimated_cost: String,
}

#[derive(Deserialize)]
struct RawResultItem {
    name: Option<Value>,
    title: Option<Value>,
    company: Option<Value>,
    description: Option<Value>,
    snippet: Option<Value>,
    link: Option<Value>,
    estimated_cost: Option<Value>,
    estimated_cost_usd: Option<Value>,
    price: Option<Value>,
}

fn first_text(candidates: [Option<Value>; 3]) -> Option<String> {
    candidates.into_iter().flatten().find_map(|value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl TryFrom<RawResultItem> for ResultItem {
    type Error = String;

    fn try_from(raw: RawResultItem) -> std::result::Result<Self, Self::Error> {
        let name = first_text([raw.name, raw.title, raw.company])
            .ok_or("listing has no name, title or company")?;
        Ok(Self {
            name,
            description: first_text([raw.description, raw.snippet, None]).unwrap_or_default(),
            link: first_text([raw.link, None, None]).unwrap_or_default(),
            estimated_cost: first_text([raw.estimated_cost, raw.estimated_cost_usd, raw.price])
                .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string()),
        })
    }
}

/// Result of one capability agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityResult {
    pub status: TaskStatus,
    #[serde(default)]
    pub structured_items: Vec<ResultItem>,
    #[serde(default)]
    pub message: String,
}

impl CapabilityResult {
    pub fn completed(items: Vec<ResultItem>) -> Self {
        Self {
            status: TaskStatus::Completed,
            structured_items: items,
            message: String::new(),
        }
    }

    /// A completed answer that only carries prose.
    pub fn prose(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Completed,
            structured_items: Vec::new(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Error,
            structured_items: Vec::new(),
            message: message.into(),
        }
    }

    pub fn input_required(message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::InputRequired,
            structured_items: Vec::new(),
            message: message.into(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Plain-text rendering used when prompting for the trip narrative.
    pub fn render_text(&self) -> String {
        if self.structured_items.is_empty() {
            return if self.message.is_empty() {
                "No results.".to_string()
            } else {
                self.message.clone()
            };
        }

        let mut out = String::new();
        for (i, item) in self.structured_items.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} ({})\n   {}\n   {}\n",
                i + 1,
                item.name,
                item.estimated_cost,
                item.description,
                item.link
            ));
        }
        if !self.message.is_empty() {
            out.push_str(&self.message);
            out.push('\n');
        }
        out
    }
}

/// Outcome of contacting one peer during a planning operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentStatus {
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentStatus {
    pub fn ok(latency_ms: u64) -> Self {
        Self {
            reachable: true,
            latency_ms,
            error: None,
        }
    }

    pub fn failed(latency_ms: u64, error: impl Into<String>) -> Self {
        Self {
            reachable: false,
            latency_ms,
            error: Some(error.into()),
        }
    }
}

/// The structured travel plan returned to the Front Door.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedPlan {
    pub task_id: String,
    pub destination: String,
    pub dates: TripDates,
    pub hotel_results: Option<CapabilityResult>,
    pub car_results: Option<CapabilityResult>,
    pub narrative: String,
    pub per_agent_status: BTreeMap<String, AgentStatus>,
}
