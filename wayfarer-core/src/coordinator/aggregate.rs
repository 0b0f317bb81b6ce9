//! Task phrasing and fan-in merging.

use crate::prompt::{PromptTemplate, TRIP_NARRATIVE};
use crate::protocol::{BudgetTier, CapabilityResult, TaskStatus, TripRequest};
use crate::registry::TravelCapability;
use std::collections::HashMap;

/// Deterministic task text for one capability.
pub fn task_text(capability: TravelCapability, request: &TripRequest) -> String {
    let mut text = match capability {
        TravelCapability::Hotel => format!(
            "Find top 10 budget-friendly hotels in {} for {} guests from {} to {}",
            request.destination, request.guest_count, request.check_in, request.check_out
        ),
        TravelCapability::CarRental => format!(
            "Find car rental options in {} from {} to {}",
            request.destination, request.check_in, request.check_out
        ),
    };
    if request.budget_tier != BudgetTier::Any {
        text.push_str(&format!(" with budget preference {}", request.budget_tier));
    }
    if let Some(preferences) = request.preferences.as_deref().filter(|p| !p.trim().is_empty()) {
        text.push_str(&format!(". Preferences: {}", preferences.trim()));
    }
    text
}

/// Merges results from every peer that served one capability. Items are
/// concatenated in peer order; the merged status is `completed` if any
/// peer completed.
pub fn merge(results: Vec<CapabilityResult>) -> Option<CapabilityResult> {
    let mut results = results.into_iter();
    let mut merged = results.next()?;

    for result in results {
        if result.status == TaskStatus::Completed {
            merged.status = TaskStatus::Completed;
        }
        merged.structured_items.extend(result.structured_items);
        if !result.message.is_empty() {
            if merged.message.is_empty() {
                merged.message = result.message;
            } else {
                merged.message = format!("{}\n\n{}", merged.message, result.message);
            }
        }
    }
    Some(merged)
}

pub fn narrative_prompt(
    request: &TripRequest,
    hotels: Option<&CapabilityResult>,
    cars: Option<&CapabilityResult>,
) -> String {
    let mut variables = HashMap::new();
    variables.insert("destination", request.destination.clone());
    variables.insert("check_in", request.check_in.to_string());
    variables.insert("check_out", request.check_out.to_string());
    variables.insert("budget", request.budget_tier.to_string());
    variables.insert("guests", request.guest_count.to_string());
    variables.insert("nights", request.nights().to_string());
    variables.insert(
        "car_needed",
        if request.car_needed { "yes" } else { "no" }.to_string(),
    );
    if let Some(preferences) = request.preferences.as_deref().filter(|p| !p.trim().is_empty()) {
        variables.insert("preferences", preferences.trim().to_string());
    }
    variables.insert("hotels", render(hotels, "Not available."));
    variables.insert(
        "cars",
        render(
            cars,
            if request.car_needed {
                "Not available."
            } else {
                "Not requested."
            },
        ),
    );

    PromptTemplate::new(TRIP_NARRATIVE)
        .with_default("preferences", "none")
        .render(&variables)
}

/// Only usable results go into the prompt.
fn render(result: Option<&CapabilityResult>, missing: &str) -> String {
    match result {
        Some(result) if result.is_completed() => result.render_text(),
        _ => missing.to_string(),
    }
}
