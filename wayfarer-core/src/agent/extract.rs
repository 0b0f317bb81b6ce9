//! Best-effort parameter extraction for capability agents.
//!
//! The LLM is asked for a JSON object; anything it returns that cannot be
//! read is filled from heuristics over the task text and then from fixed
//! defaults. Nothing in here fails.

use crate::protocol::{BudgetTier, PRICE_UNAVAILABLE};
use crate::registry::TravelCapability;
use chrono::{Duration, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;

pub const DEFAULT_LOCATION: &str = "Paris";
pub const DEFAULT_GUESTS: u32 = 2;
pub const DEFAULT_DRIVER_AGE: u32 = 25;
/// Default stays start this many days after today.
const DEFAULT_LEAD_DAYS: i64 = 7;

static PRICE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$([0-9]+[,.]?[0-9]*)").ok());
static LOCATION_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|to|at|near)\s+([A-Z][\p{L}]+(?:[ -][A-Z][\p{L}]+)*)").ok()
});
static DATE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").ok());
static BUDGET_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| {
        Regex::new(r"(?i)\b(?:budget preference:?\s+([a-z-]+)|with\s+([a-z-]+)\s+budget\b)").ok()
    });
static GUESTS_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\s+(?:guests?|people|persons|adults|travell?ers)\b").ok());

/// Search parameters derived from one task.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub location: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub budget: BudgetTier,
    pub guests: u32,
    pub driver_age: u32,
    /// True when at least one field came from the fallback path.
    pub used_fallback: bool,
}

impl SearchParams {
    /// Parameters used when nothing could be read at all.
    pub fn defaults(today: NaiveDate) -> Self {
        let start = today + Duration::days(DEFAULT_LEAD_DAYS);
        Self {
            location: DEFAULT_LOCATION.to_string(),
            start,
            end: start + Duration::days(1),
            budget: BudgetTier::Any,
            guests: DEFAULT_GUESTS,
            driver_age: DEFAULT_DRIVER_AGE,
            used_fallback: true,
        }
    }

    /// Query string handed to the search collaborator.
    pub fn query(&self, capability: TravelCapability) -> String {
        match capability {
            TravelCapability::Hotel => {
                let mut query = format!(
                    "budget friendly hotels in {} from {} to {}",
                    self.location, self.start, self.end
                );
                if self.budget != BudgetTier::Any {
                    query.push_str(&format!(" {} hotels", self.budget));
                }
                query
            }
            TravelCapability::CarRental => {
                let mut query = format!(
                    "car rental in {} from {} to {}",
                    self.location, self.start, self.end
                );
                if self.budget != BudgetTier::Any {
                    query.push_str(&format!(" {} budget", self.budget));
                }
                if self.driver_age < DEFAULT_DRIVER_AGE {
                    query.push_str(&format!(" young driver age {}", self.driver_age));
                }
                query
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default, alias = "city", alias = "destination")]
    location: Option<String>,
    #[serde(default, alias = "start_date", alias = "pickup_date")]
    check_in: Option<String>,
    #[serde(default, alias = "end_date", alias = "return_date")]
    check_out: Option<String>,
    #[serde(default, alias = "budget_tier")]
    budget: Option<String>,
    #[serde(default, alias = "guest_count")]
    guests: Option<Value>,
    #[serde(default)]
    driver_age: Option<Value>,
}

/// Pulls the first JSON object out of an LLM answer, tolerating code fences
/// and surrounding prose.
fn json_object(answer: &str) -> Option<RawExtraction> {
    let start = answer.find('{')?;
    let end = answer.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&answer[start..=end]).ok()
}

fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Combines the LLM answer (if any) with heuristics over the task text.
pub fn extract(answer: Option<&str>, task_text: &str, today: NaiveDate) -> SearchParams {
    let raw = answer.and_then(json_object).unwrap_or_default();
    let defaults = SearchParams::defaults(today);
    let mut used_fallback = false;

    let location = raw
        .location
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.trim().to_string())
        .or_else(|| {
            used_fallback = true;
            location_in(task_text)
        })
        .unwrap_or(defaults.location);

    let text_dates = dates_in(task_text);
    let start = raw
        .check_in
        .as_deref()
        .and_then(parse_date)
        .or_else(|| {
            used_fallback = true;
            text_dates.map(|(start, _)| start)
        })
        .unwrap_or(defaults.start);
    let mut end = raw
        .check_out
        .as_deref()
        .and_then(parse_date)
        .or_else(|| {
            used_fallback = true;
            text_dates.map(|(_, end)| end)
        })
        .unwrap_or(start + Duration::days(1));
    if end < start {
        end = start + Duration::days(1);
    }

    let budget = raw
        .budget
        .and_then(|b| b.parse().ok())
        .or_else(|| budget_in(task_text))
        .unwrap_or_default();

    let guests = raw
        .guests
        .as_ref()
        .and_then(as_count)
        .filter(|g| *g >= 1)
        .or_else(|| guests_in(task_text))
        .unwrap_or(DEFAULT_GUESTS);

    let driver_age = raw
        .driver_age
        .as_ref()
        .and_then(as_count)
        .filter(|age| *age >= 16)
        .unwrap_or(DEFAULT_DRIVER_AGE);

    SearchParams {
        location,
        start,
        end,
        budget,
        guests,
        driver_age,
        used_fallback,
    }
}

/// `in <Capitalized Place>` scan.
pub fn location_in(text: &str) -> Option<String> {
    let re = LOCATION_RE.as_ref()?;
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .next()
}

/// First two ISO dates in the text, in order of appearance.
pub fn dates_in(text: &str) -> Option<(NaiveDate, NaiveDate)> {
    let re = DATE_RE.as_ref()?;
    let mut dates = re
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .filter_map(|m| parse_date(m.as_str()));
    let start = dates.next()?;
    let end = dates.next().unwrap_or(start + Duration::days(1));
    Some((start, end))
}

pub fn budget_in(text: &str) -> Option<BudgetTier> {
    let re = BUDGET_RE.as_ref()?;
    re.captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn guests_in(text: &str) -> Option<u32> {
    let re = GUESTS_RE.as_ref()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|g| *g >= 1)
}

/// First `$<number>` in a snippet, rendered as `"$N USD"`.
pub fn extract_price(text: &str) -> Option<String> {
    let re = PRICE_RE.as_ref()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| format!("${} USD", m.as_str().trim_end_matches(['.', ','])))
}

/// Price for a listing, or the `N/A` placeholder.
pub fn price_or_placeholder(snippet: &str, listed: Option<&str>) -> String {
    extract_price(snippet)
        .or_else(|| listed.and_then(extract_price))
        .unwrap_or_else(|| PRICE_UNAVAILABLE.to_string())
}
