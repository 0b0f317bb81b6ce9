//! Agent card registry.
//!
//! Each capability agent publishes a static card on the discovery path.
//! The coordinator turns whatever card a peer returns into an
//! [`AgentDescriptor`] and routes tasks by the capabilities it advertises.

use crate::protocol::AgentDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Version advertised on the cards served by this workspace.
pub const CARD_VERSION: &str = "2.0.0";

/// Task families the coordinator knows how to phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelCapability {
    Hotel,
    CarRental,
}

impl TravelCapability {
    /// Classifies one advertised capability string.
    pub fn classify(capability: &str) -> Option<Self> {
        let capability = capability.to_ascii_lowercase();
        if capability.starts_with("hotel") || capability.contains("accommodation") {
            Some(TravelCapability::Hotel)
        } else if capability.starts_with("car") || capability.contains("rental") {
            Some(TravelCapability::CarRental)
        } else {
            None
        }
    }

    /// All task families a descriptor can serve.
    pub fn of(descriptor: &AgentDescriptor) -> BTreeSet<Self> {
        descriptor
            .capabilities
            .iter()
            .filter_map(|c| Self::classify(c))
            .collect()
    }

    /// Classifies a peer or card name word by word.
    pub fn from_name(name: &str) -> Option<Self> {
        name.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|word| !word.is_empty())
            .find_map(Self::classify)
    }

    /// Task families a peer is routed, falling back to its names when
    /// the descriptor advertises nothing classifiable.
    pub fn route(descriptor: &AgentDescriptor, peer_name: &str) -> BTreeSet<Self> {
        let advertised = Self::of(descriptor);
        if !advertised.is_empty() {
            return advertised;
        }
        Self::from_name(&descriptor.name)
            .or_else(|| Self::from_name(peer_name))
            .into_iter()
            .collect()
    }
}

impl fmt::Display for TravelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelCapability::Hotel => f.write_str("hotel"),
            TravelCapability::CarRental => f.write_str("car_rental"),
        }
    }
}

/// Card served on `/.well-known/agent.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub capabilities: BTreeMap<String, String>,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<String>,
    pub url: String,
    pub version: String,
    pub status: String,
}

impl AgentCard {
    fn build(
        name: &str,
        description: &str,
        capabilities: &[(&str, &str)],
        skills: &[&str],
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            capabilities: capabilities
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills: skills.iter().map(|s| s.to_string()).collect(),
            url: url.into(),
            version: CARD_VERSION.to_string(),
            status: "active".to_string(),
        }
    }

    pub fn hotel(url: impl Into<String>) -> Self {
        Self::build(
            "Hotel Booking Agent",
            "Specialized agent for hotel search and booking using web search and an LLM",
            &[
                ("hotel_search", "Search for hotels"),
                ("hotel_booking", "Book hotel reservations"),
                ("price_comparison", "Compare hotel prices"),
                ("hotel_recommendations", "Provide hotel recommendations"),
                ("budget_analysis", "Analyze budget requirements"),
            ],
            &["hotel_search", "hotel_booking", "price_comparison"],
            url,
        )
    }

    pub fn car_rental(url: impl Into<String>) -> Self {
        Self::build(
            "Car Rental Agent",
            "Specialized agent for car rental search and booking using web search and an LLM",
            &[
                ("car_rental_search", "Search for car rentals"),
                ("car_booking", "Book car rental reservations"),
                ("price_comparison", "Compare car rental prices"),
                ("car_recommendations", "Provide car rental recommendations"),
                ("vehicle_type_analysis", "Analyze vehicle type requirements"),
            ],
            &["car_rental_search", "car_booking", "price_comparison"],
            url,
        )
    }

    pub fn for_capability(capability: TravelCapability, url: impl Into<String>) -> Self {
        match capability {
            TravelCapability::Hotel => Self::hotel(url),
            TravelCapability::CarRental => Self::car_rental(url),
        }
    }

    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            capabilities: self
                .capabilities
                .keys()
                .chain(self.skills.iter())
                .cloned()
                .collect(),
            endpoint: self.url.clone(),
            protocol_version: self.version.clone(),
        }
    }
}

/// Reads a descriptor out of a discovery payload.
///
/// `capabilities` may be an object (keys are capabilities) or an array of
/// strings. Skill ids are folded in, whether skills are plain strings or
/// objects carrying `id`/`name`. `name` and `url` are required.
pub fn descriptor_from_card(card: &Value) -> std::result::Result<AgentDescriptor, String> {
    let text = |key: &str| card.get(key).and_then(Value::as_str).map(str::to_string);

    let name = text("name")
        .filter(|s| !s.trim().is_empty())
        .ok_or("card is missing `name`")?;
    let endpoint = text("url")
        .filter(|s| !s.trim().is_empty())
        .ok_or("card is missing `url`")?;

    let mut capabilities: BTreeSet<String> = match card.get("capabilities") {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    };
    if let Some(Value::Array(skills)) = card.get("skills") {
        capabilities.extend(skills.iter().filter_map(|skill| match skill {
            Value::String(id) => Some(id.clone()),
            Value::Object(fields) => fields
                .get("id")
                .or_else(|| fields.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }));
    }

    Ok(AgentDescriptor {
        name,
        description: text("description").unwrap_or_default(),
        capabilities,
        endpoint,
        protocol_version: text("version")
            .or_else(|| text("protocolVersion"))
            .unwrap_or_else(|| "unknown".to_string()),
    })
}
