//! The planner: discovery at construction, fan-out/fan-in per trip request.
//!
//! Connections are discovered once in [`Coordinator::connect`] and are
//! read-only afterwards, so one coordinator serves concurrent planning
//! operations. Every peer failure is recorded in the plan's
//! `per_agent_status`; the only error a plan can end in is a blown overall
//! deadline with nothing settled.

mod aggregate;

pub use aggregate::{merge, narrative_prompt, task_text};

use crate::collaborator::Completion;
use crate::config::{PlannerConfig, StrategyChoice};
use crate::connection::{ConnectionStats, RemoteAgentConnection, Transport};
use crate::error::{Error, Result};
use crate::prompt::NARRATIVE_PLACEHOLDER;
use crate::protocol::{AgentDescriptor, AgentStatus, AggregatedPlan, CapabilityResult, TripRequest};
use crate::registry::TravelCapability;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::time::{timeout, timeout_at};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How peers are reached, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerStrategy {
    /// Cards discovered; envelope protocol wherever a card was published.
    ProtocolCoordinated,
    /// No discovery; every configured peer is reached over plain chat.
    DirectHttpFallback,
}

/// A peer left out of fan-out because discovery failed.
#[derive(Debug, Clone, Serialize)]
pub struct ExcludedPeer {
    pub name: String,
    pub url: String,
    pub status: AgentStatus,
}

/// Snapshot of one peer for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PeerReport {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<AgentDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ConnectionStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStatus {
    pub strategy: PlannerStrategy,
    pub peers: Vec<PeerReport>,
}

/// One settled peer call.
#[derive(Debug)]
struct Settled {
    peer: String,
    capability: TravelCapability,
    latency_ms: u64,
    outcome: Result<CapabilityResult>,
}

pub struct Coordinator {
    strategy: PlannerStrategy,
    connections: Vec<Arc<RemoteAgentConnection>>,
    excluded: Vec<ExcludedPeer>,
    llm: Arc<dyn Completion>,
    config: PlannerConfig,
}

impl Coordinator {
    /// Discovers every configured peer and picks the strategy.
    /// Discovery failures are recorded, never returned.
    pub async fn connect(config: PlannerConfig, llm: Arc<dyn Completion>) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("cannot build HTTP client: {}", e)))?;

        if config.strategy == StrategyChoice::Direct {
            let connections = config
                .peers
                .iter()
                .map(|peer| {
                    Arc::new(
                        RemoteAgentConnection::new(peer.clone(), client.clone(), config.call_timeout)
                            .with_transport(Transport::SimpleChat),
                    )
                })
                .collect();
            info!(peers = config.peers.len(), "Planner using direct HTTP fallback");
            return Ok(Self {
                strategy: PlannerStrategy::DirectHttpFallback,
                connections,
                excluded: Vec::new(),
                llm,
                config,
            });
        }

        let discoveries = config.peers.iter().map(|peer| {
            let connection =
                RemoteAgentConnection::new(peer.clone(), client.clone(), config.call_timeout);
            let limit = config.discovery_timeout;
            async move {
                let started = Instant::now();
                let outcome = connection.discover(limit).await;
                (connection, started.elapsed(), outcome)
            }
        });

        let mut connections = Vec::new();
        let mut excluded = Vec::new();
        let mut unadvertised = 0;

        for (connection, elapsed, outcome) in join_all(discoveries).await {
            match outcome {
                Ok(descriptor) => connections.push(Arc::new(
                    connection
                        .with_descriptor(descriptor)
                        .with_discovery_latency(elapsed),
                )),
                Err(Error::Discovery {
                    not_advertised: true,
                    ..
                }) if config.chat_fallback => {
                    unadvertised += 1;
                    info!(peer = %connection.name(), "No agent card, keeping peer on chat transport");
                    connections.push(Arc::new(
                        connection
                            .with_transport(Transport::SimpleChat)
                            .with_discovery_latency(elapsed),
                    ));
                }
                Err(e) => {
                    warn!(peer = %connection.name(), error = %e, "Peer excluded from fan-out");
                    excluded.push(ExcludedPeer {
                        name: connection.name().to_string(),
                        url: connection.peer().url.clone(),
                        status: AgentStatus::failed(elapsed.as_millis() as u64, e.to_string()),
                    });
                }
            }
        }

        let strategy = if config.strategy == StrategyChoice::Auto
            && unadvertised > 0
            && unadvertised == config.peers.len()
        {
            PlannerStrategy::DirectHttpFallback
        } else {
            PlannerStrategy::ProtocolCoordinated
        };

        info!(
            ?strategy,
            reachable = connections.len(),
            excluded = excluded.len(),
            "Planner connected"
        );
        Ok(Self {
            strategy,
            connections,
            excluded,
            llm,
            config,
        })
    }

    pub fn strategy(&self) -> PlannerStrategy {
        self.strategy
    }

    pub fn connections(&self) -> &[Arc<RemoteAgentConnection>] {
        &self.connections
    }

    pub fn excluded(&self) -> &[ExcludedPeer] {
        &self.excluded
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Produces one aggregated plan for a trip request.
    pub async fn plan(&self, request: TripRequest) -> Result<AggregatedPlan> {
        request.validate()?;
        let task_id = Uuid::new_v4().to_string();
        let context_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.overall_deadline;
        info!(%task_id, destination = %request.destination, "Planning trip");

        if self.config.probe_before_fanout {
            self.probe_all().await;
        }

        let mut per_agent_status: BTreeMap<String, AgentStatus> = self
            .excluded
            .iter()
            .map(|peer| (peer.name.clone(), peer.status.clone()))
            .collect();

        let mut outstanding = Vec::new();
        let mut calls = Vec::new();
        let settled = Arc::new(Mutex::new(Vec::new()));

        for connection in &self.connections {
            let routable = TravelCapability::route(connection.descriptor(), connection.name());
            if routable.is_empty() {
                warn!(peer = %connection.name(), "Peer advertises no routable capability");
                per_agent_status.insert(
                    connection.name().to_string(),
                    AgentStatus::failed(connection.discovery_latency_ms(), "no routable capability"),
                );
                continue;
            }
            let capabilities: Vec<TravelCapability> = routable
                .into_iter()
                .filter(|c| *c != TravelCapability::CarRental || request.car_needed)
                .collect();
            if capabilities.is_empty() {
                per_agent_status.insert(
                    connection.name().to_string(),
                    AgentStatus::ok(connection.discovery_latency_ms()),
                );
                continue;
            }

            for capability in capabilities {
                let text = task_text(capability, &request);
                let connection = connection.clone();
                let settled = settled.clone();
                let task_id = task_id.clone();
                let context_id = context_id.clone();
                outstanding.push(connection.name().to_string());

                calls.push(async move {
                    let call_started = Instant::now();
                    let outcome = connection.send(&text, &task_id, &context_id).await;
                    settled.lock().await.push(Settled {
                        peer: connection.name().to_string(),
                        capability,
                        latency_ms: call_started.elapsed().as_millis() as u64,
                        outcome,
                    });
                });
            }
        }

        debug!(%task_id, calls = calls.len(), "Fanning out");
        let fan_in_complete = timeout_at(deadline, join_all(calls)).await.is_ok();
        let settled: Vec<Settled> = std::mem::take(&mut *settled.lock().await);

        if !fan_in_complete {
            warn!(
                %task_id,
                settled = settled.len(),
                outstanding = outstanding.len() - settled.len(),
                "Overall deadline reached during fan-out"
            );
            // Nothing to aggregate, so no narrative attempt either; see
            // test_deadline_with_nothing_settled_fails.
            if settled.is_empty() {
                return Err(Error::DeadlineExceeded(self.config.overall_deadline));
            }
        }

        let mut hotel_results = Vec::new();
        let mut car_results = Vec::new();
        for call in settled {
            let status = match call.outcome {
                Ok(result) => {
                    match call.capability {
                        TravelCapability::Hotel => hotel_results.push(result),
                        TravelCapability::CarRental => car_results.push(result),
                    }
                    AgentStatus::ok(call.latency_ms)
                }
                Err(e) => AgentStatus::failed(call.latency_ms, e.status_label()),
            };
            record(&mut per_agent_status, &call.peer, status);
            remove_first(&mut outstanding, &call.peer);
        }
        for peer in outstanding {
            record(
                &mut per_agent_status,
                &peer,
                AgentStatus::failed(started.elapsed().as_millis() as u64, "timeout"),
            );
        }

        let hotel_results = merge(hotel_results);
        let car_results = if request.car_needed {
            merge(car_results)
        } else {
            None
        };

        let narrative = self
            .narrative(&request, hotel_results.as_ref(), car_results.as_ref(), deadline)
            .await;

        info!(
            %task_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            hotels = hotel_results.as_ref().map_or(0, |r| r.structured_items.len()),
            cars = car_results.as_ref().map_or(0, |r| r.structured_items.len()),
            "Plan ready"
        );

        Ok(AggregatedPlan {
            task_id,
            destination: request.destination.clone(),
            dates: request.dates(),
            hotel_results,
            car_results,
            narrative,
            per_agent_status,
        })
    }

    async fn narrative(
        &self,
        request: &TripRequest,
        hotels: Option<&CapabilityResult>,
        cars: Option<&CapabilityResult>,
        deadline: tokio::time::Instant,
    ) -> String {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let limit = remaining.min(self.config.narrative_timeout);
        if limit.is_zero() {
            warn!("No time left for the narrative");
            return NARRATIVE_PLACEHOLDER.to_string();
        }

        let prompt = narrative_prompt(request, hotels, cars);
        match timeout(limit, self.llm.complete(&prompt)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                warn!("Narrative came back empty");
                NARRATIVE_PLACEHOLDER.to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Narrative generation failed");
                NARRATIVE_PLACEHOLDER.to_string()
            }
            Err(_) => {
                warn!(timeout = ?limit, "Narrative generation timed out");
                NARRATIVE_PLACEHOLDER.to_string()
            }
        }
    }

    async fn probe_all(&self) {
        let limit = self.config.health_timeout;
        let probes = self.connections.iter().map(|c| async move {
            (c.name().to_string(), c.probe(limit).await)
        });
        for (peer, healthy) in join_all(probes).await {
            if !healthy {
                warn!(%peer, "Health probe failed, sending anyway");
            }
        }
    }

    /// Probes every reachable peer and reports descriptors and metrics.
    pub async fn status(&self) -> CoordinatorStatus {
        let limit = self.config.health_timeout;
        let probes = self.connections.iter().map(|c| async move {
            let healthy = c.probe(limit).await;
            PeerReport {
                name: c.name().to_string(),
                url: c.peer().url.clone(),
                transport: Some(c.transport()),
                descriptor: Some(c.descriptor().clone()),
                healthy: Some(healthy),
                metrics: Some(c.metrics().snapshot()),
                excluded: None,
            }
        });

        let mut peers = join_all(probes).await;
        peers.extend(self.excluded.iter().map(|peer| PeerReport {
            name: peer.name.clone(),
            url: peer.url.clone(),
            transport: None,
            descriptor: None,
            healthy: None,
            metrics: None,
            excluded: peer.status.error.clone(),
        }));

        CoordinatorStatus {
            strategy: self.strategy,
            peers,
        }
    }
}

/// A peer that served two capabilities keeps its worst outcome.
fn record(statuses: &mut BTreeMap<String, AgentStatus>, peer: &str, status: AgentStatus) {
    match statuses.get_mut(peer) {
        Some(existing) => {
            existing.latency_ms = existing.latency_ms.max(status.latency_ms);
            if !status.reachable {
                existing.reachable = false;
                existing.error = existing.error.take().or(status.error);
            }
        }
        None => {
            statuses.insert(peer.to_string(), status);
        }
    }
}

fn remove_first(peers: &mut Vec<String>, peer: &str) {
    if let Some(pos) = peers.iter().position(|p| p == peer) {
        peers.remove(pos);
    }
}

#[cfg(test)]
mod tests;
