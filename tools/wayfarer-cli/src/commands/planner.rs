//! Runs the planner Front Door.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use wayfarer_core::{Coordinator, PlannerConfig};
use wayfarer_llm::{ChatCompletionClient, LlmConfig};

pub async fn run(addr: &str, config: PlannerConfig, llm: LlmConfig) -> Result<()> {
    let coordinator = Coordinator::connect(config, Arc::new(ChatCompletionClient::new(llm)))
        .await
        .context("Failed to initialize the coordinator")?;

    info!(
        strategy = ?coordinator.strategy(),
        peers = coordinator.connections().len(),
        "Coordinator ready"
    );
    for peer in coordinator.excluded() {
        warn!(peer = %peer.name, url = %peer.url, error = ?peer.status.error, "Peer excluded");
    }

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    wayfarer_gateway::serve(
        listener,
        wayfarer_gateway::front_door_router(Arc::new(coordinator)),
    )
    .await
    .context("Front Door failed")
}
