//! Planner configuration.
//!
//! Loaded from YAML; durations use humantime notation (`30s`, `1m 30s`).
//!
//! ```yaml
//! strategy: auto
//! chat_fallback: true
//! call_timeout: 30s
//! overall_deadline: 90s
//! peers:
//!   - name: Hotel Booking Agent
//!     url: http://localhost:10002
//!     capabilities: [hotel_search]
//! ```

use crate::error::{Error, Result};
use crate::registry::TravelCapability;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_HOTEL_AGENT_URL: &str = "http://localhost:10002";
pub const DEFAULT_CAR_AGENT_URL: &str = "http://localhost:10003";
pub const DEFAULT_PLANNER_ADDR: &str = "127.0.0.1:8000";

/// One statically configured peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerConfig {
    pub name: String,
    pub url: String,
    /// Capabilities assumed when the peer publishes no card.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl PeerConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Whether the peer can be routed without reading its card.
    pub fn routable_without_card(&self) -> bool {
        self.capabilities
            .iter()
            .any(|c| TravelCapability::classify(c).is_some())
            || TravelCapability::from_name(&self.name).is_some()
    }
}

/// How the coordinator picks its strategy at construction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StrategyChoice {
    /// Envelope protocol, unless no peer publishes a card.
    #[default]
    Auto,
    Protocol,
    Direct,
}

fn default_peers() -> Vec<PeerConfig> {
    vec![
        PeerConfig::new("Hotel Booking Agent", DEFAULT_HOTEL_AGENT_URL)
            .with_capability("hotel_search"),
        PeerConfig::new("Car Rental Agent", DEFAULT_CAR_AGENT_URL)
            .with_capability("car_rental_search"),
    ]
}

fn enabled() -> bool {
    true
}

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn default_discovery_timeout() -> Duration {
    secs(10)
}

fn default_call_timeout() -> Duration {
    secs(30)
}

fn default_narrative_timeout() -> Duration {
    secs(30)
}

fn default_overall_deadline() -> Duration {
    secs(90)
}

fn default_health_timeout() -> Duration {
    secs(5)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
    #[serde(default = "default_peers")]
    pub peers: Vec<PeerConfig>,
    #[serde(default)]
    pub strategy: StrategyChoice,
    /// Keep peers without a card on the plain chat transport.
    #[serde(default = "enabled")]
    pub chat_fallback: bool,
    #[serde(default = "default_discovery_timeout", with = "humantime_serde")]
    pub discovery_timeout: Duration,
    #[serde(default = "default_call_timeout", with = "humantime_serde")]
    pub call_timeout: Duration,
    #[serde(default = "default_narrative_timeout", with = "humantime_serde")]
    pub narrative_timeout: Duration,
    #[serde(default = "default_overall_deadline", with = "humantime_serde")]
    pub overall_deadline: Duration,
    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub health_timeout: Duration,
    #[serde(default)]
    pub probe_before_fanout: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            peers: default_peers(),
            strategy: StrategyChoice::default(),
            chat_fallback: true,
            discovery_timeout: default_discovery_timeout(),
            call_timeout: default_call_timeout(),
            narrative_timeout: default_narrative_timeout(),
            overall_deadline: default_overall_deadline(),
            health_timeout: default_health_timeout(),
            probe_before_fanout: false,
        }
    }
}

impl PlannerConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(raw).map_err(|e| Error::config(format!("invalid YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&raw)
    }

    pub fn with_peers(mut self, peers: Vec<PeerConfig>) -> Self {
        self.peers = peers;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyChoice) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_overall_deadline(mut self, deadline: Duration) -> Self {
        self.overall_deadline = deadline;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            return Err(Error::config("at least one peer must be configured"));
        }

        let mut names = HashSet::new();
        for peer in &self.peers {
            if peer.name.trim().is_empty() {
                return Err(Error::config("peer name must not be empty"));
            }
            if !peer.url.starts_with("http://") && !peer.url.starts_with("https://") {
                return Err(Error::config(format!(
                    "peer {} has a non-HTTP url: {}",
                    peer.name, peer.url
                )));
            }
            if !names.insert(peer.name.as_str()) {
                return Err(Error::config(format!("duplicate peer name: {}", peer.name)));
            }
            if (self.strategy == StrategyChoice::Direct || self.chat_fallback)
                && !peer.routable_without_card()
            {
                return Err(Error::config(format!(
                    "peer {} needs a hotel or car capability when it may be reached without a card",
                    peer.name
                )));
            }
        }

        for (label, value) in [
            ("discovery_timeout", self.discovery_timeout),
            ("call_timeout", self.call_timeout),
            ("narrative_timeout", self.narrative_timeout),
            ("overall_deadline", self.overall_deadline),
            ("health_timeout", self.health_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::config(format!("{} must be greater than zero", label)));
            }
        }

        if self.overall_deadline < self.call_timeout {
            warn!(
                overall_deadline = ?self.overall_deadline,
                call_timeout = ?self.call_timeout,
                "Overall deadline is shorter than the per-call timeout"
            );
        }

        Ok(())
    }
}
