//! Runs one capability agent server.

use crate::AgentArgs;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use wayfarer_core::{CapabilityAgent, TravelCapability};
use wayfarer_llm::ChatCompletionClient;
use wayfarer_serper::{SerperClient, SerperConfig};

/// Bind address derived from an agent URL, e.g. `http://localhost:10002`
/// becomes `0.0.0.0:10002`.
fn bind_addr(url: &str) -> Option<String> {
    let port = url.rsplit(':').next()?.trim_end_matches('/');
    port.parse::<u16>().ok().map(|port| format!("0.0.0.0:{}", port))
}

pub async fn run(capability: TravelCapability, default_url: &str, args: AgentArgs) -> Result<()> {
    let public_url = args.public_url.unwrap_or_else(|| default_url.to_string());
    let addr = match args.addr {
        Some(addr) => addr,
        None => bind_addr(&public_url)
            .with_context(|| format!("cannot derive a bind address from {}", public_url))?,
    };

    if args.serper_api_key.is_empty() {
        warn!("SERPER_API_KEY is not set; every search will fail");
    }
    if args.llm.groq_api_key.is_empty() {
        warn!("GROQ_API_KEY is not set; parameter extraction will use fallbacks");
    }

    let llm = Arc::new(ChatCompletionClient::new(args.llm.config()));
    let search = Arc::new(SerperClient::new(
        SerperConfig::default().with_api_key(args.serper_api_key),
    ));
    let agent = CapabilityAgent::new(capability, public_url.clone(), llm, search);
    info!(agent = %agent.card().name, url = %public_url, "Starting capability agent");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    wayfarer_gateway::serve(listener, wayfarer_gateway::agent_router(Arc::new(agent)))
        .await
        .context("Agent server failed")
}
