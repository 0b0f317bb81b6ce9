//! Reconciles the shapes peers answer with into a [`CapabilityResult`].
//!
//! Accepted, in order: a full result object, an object carrying a list under
//! `structured_items`/`results`/`items`/`hotels`/`cars`, a bare list of
//! items, an `{"error": ..}` object, a string holding any of those as JSON,
//! and finally prose. Prose is scraped for a JSON list or flat JSON objects;
//! whatever is scraped becomes the items and the prose is kept as message.

use crate::protocol::{CapabilityResult, ResultItem, TaskStatus};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

const LIST_KEYS: [&str; 5] = ["structured_items", "results", "items", "hotels", "cars"];

static FLAT_OBJECT_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\}").ok());

pub fn reconcile(content: &Value) -> CapabilityResult {
    reconcile_depth(content, 0)
}

fn reconcile_depth(content: &Value, depth: u8) -> CapabilityResult {
    match content {
        Value::Object(map) => {
            if map.contains_key("status") {
                if let Ok(result) = serde_json::from_value::<CapabilityResult>(content.clone()) {
                    return result;
                }
            }
            for key in LIST_KEYS {
                if let Some(Value::Array(list)) = map.get(key) {
                    let mut result = from_list(list);
                    if let Some(message) = map.get("message").and_then(Value::as_str) {
                        result.message = message.to_string();
                    }
                    return result;
                }
            }
            if let Some(error) = map.get("error").and_then(Value::as_str) {
                return CapabilityResult::error(error);
            }
            if let Ok(item) = serde_json::from_value::<ResultItem>(content.clone()) {
                return CapabilityResult::completed(vec![item]);
            }
            CapabilityResult::prose(content.to_string())
        }
        Value::Array(list) => from_list(list),
        Value::String(text) => {
            let trimmed = text.trim();
            if depth == 0 && (trimmed.starts_with('{') || trimmed.starts_with('[')) {
                if let Ok(inner) = serde_json::from_str::<Value>(trimmed) {
                    return reconcile_depth(&inner, depth + 1);
                }
            }
            scrape_prose(text)
        }
        Value::Null => CapabilityResult::prose(""),
        other => CapabilityResult::prose(other.to_string()),
    }
}

fn from_list(list: &[Value]) -> CapabilityResult {
    let items: Vec<ResultItem> = list
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect();
    if items.is_empty() && !list.is_empty() {
        return CapabilityResult::prose(Value::Array(list.to_vec()).to_string());
    }
    CapabilityResult {
        status: TaskStatus::Completed,
        structured_items: items,
        message: String::new(),
    }
}

/// Best-effort item scraping out of free text.
pub fn scrape_prose(text: &str) -> CapabilityResult {
    let mut items = scrape_list(text);
    if items.is_empty() {
        items = scrape_objects(text);
    }
    CapabilityResult {
        status: TaskStatus::Completed,
        structured_items: items,
        message: text.to_string(),
    }
}

fn scrape_list(text: &str) -> Vec<ResultItem> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    serde_json::from_str::<Vec<Value>>(&text[start..=end])
        .map(|list| {
            list.into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn scrape_objects(text: &str) -> Vec<ResultItem> {
    let Some(re) = FLAT_OBJECT_RE.as_ref() else {
        return Vec::new();
    };
    re.find_iter(text)
        .filter_map(|m| serde_json::from_str::<ResultItem>(m.as_str()).ok())
        .collect()
}
