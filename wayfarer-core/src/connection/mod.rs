//! Connection module owning the HTTP transport to one capability peer.
//!
//! This module provides functionality for:
//! - Card discovery on the well-known path
//! - Sending tasks over the envelope protocol or the plain chat fallback
//! - Liveness probing
//! - Per-connection call metrics
//!
//! # Examples
//!
//! ```rust,no_run
//! use wayfarer_core::config::PeerConfig;
//! use wayfarer_core::connection::RemoteAgentConnection;
//! use std::time::Duration;
//!
//! # async fn example() -> wayfarer_core::Result<()> {
//! let peer = PeerConfig::new("Hotel Booking Agent", "http://localhost:10002");
//! let connection = RemoteAgentConnection::new(peer, reqwest::Client::new(), Duration::from_secs(30));
//! let descriptor = connection.discover(Duration::from_secs(10)).await?;
//! let connection = connection.with_descriptor(descriptor);
//! let result = connection.send("Find hotels in Paris", "task-1", "ctx-1").await?;
//! # Ok(())
//! # }
//! ```

mod content;
mod metrics;

pub use content::{reconcile, scrape_prose};
pub use metrics::{ConnectionMetrics, ConnectionStats};

use crate::config::PeerConfig;
use crate::error::{Error, Result};
use crate::protocol::{
    self, AgentDescriptor, CapabilityResult, ChatRequest, Role, CHAT_PATH, DISCOVERY_PATH,
    HEALTH_PATH, MESSAGE_PATH,
};
use crate::registry::descriptor_from_card;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Wire form used to reach a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// `POST /a2a/message` with a full envelope.
    Envelope,
    /// `POST /chat` with free text.
    SimpleChat,
}

/// One peer, its descriptor, and the transport used to reach it.
#[derive(Debug)]
pub struct RemoteAgentConnection {
    peer: PeerConfig,
    descriptor: AgentDescriptor,
    transport: Transport,
    client: reqwest::Client,
    call_timeout: Duration,
    discovery_latency_ms: u64,
    metrics: Arc<ConnectionMetrics>,
}

impl RemoteAgentConnection {
    /// Creates a connection whose descriptor is synthesized from config.
    pub fn new(peer: PeerConfig, client: reqwest::Client, call_timeout: Duration) -> Self {
        let descriptor = AgentDescriptor {
            name: peer.name.clone(),
            description: String::new(),
            capabilities: peer.capabilities.iter().cloned().collect(),
            endpoint: peer.base_url().to_string(),
            protocol_version: "unknown".to_string(),
        };
        Self {
            peer,
            descriptor,
            transport: Transport::Envelope,
            client,
            call_timeout,
            discovery_latency_ms: 0,
            metrics: Arc::new(ConnectionMetrics::new()),
        }
    }

    pub fn with_descriptor(mut self, descriptor: AgentDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_discovery_latency(mut self, latency: Duration) -> Self {
        self.discovery_latency_ms = latency.as_millis() as u64;
        self
    }

    /// Configured peer name.
    pub fn name(&self) -> &str {
        &self.peer.name
    }

    pub fn peer(&self) -> &PeerConfig {
        &self.peer
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn discovery_latency_ms(&self) -> u64 {
        self.discovery_latency_ms
    }

    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.peer.base_url(), path)
    }

    /// Fetches and validates the peer's agent card.
    pub async fn discover(&self, limit: Duration) -> Result<AgentDescriptor> {
        let url = self.url(DISCOVERY_PATH);
        debug!(peer = %self.peer.name, %url, "Discovering agent card");

        let response = timeout(limit, self.client.get(&url).timeout(limit).send())
            .await
            .map_err(|_| Error::discovery(&self.peer.name, format!("no answer within {:?}", limit)))?
            .map_err(|e| Error::discovery(&self.peer.name, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::Discovery {
                peer: self.peer.name.clone(),
                reason: "no agent card published (HTTP 404)".to_string(),
                not_advertised: true,
            });
        }
        if !status.is_success() {
            return Err(Error::discovery(&self.peer.name, format!("HTTP {}", status)));
        }

        let card: Value = response
            .json()
            .await
            .map_err(|e| Error::discovery(&self.peer.name, format!("card is not JSON: {}", e)))?;
        let descriptor = descriptor_from_card(&card)
            .map_err(|reason| Error::discovery(&self.peer.name, reason))?;

        info!(
            peer = %self.peer.name,
            card = %descriptor.name,
            capabilities = ?descriptor.capabilities,
            "Agent card discovered"
        );
        Ok(descriptor)
    }

    /// Sends one task and maps the answer into a [`CapabilityResult`].
    /// No retries happen here.
    pub async fn send(
        &self,
        task_text: &str,
        task_id: &str,
        context_id: &str,
    ) -> Result<CapabilityResult> {
        self.metrics.record_call();
        let started = Instant::now();

        let outcome = match timeout(self.call_timeout, self.dispatch(task_text, task_id, context_id)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::timed_out(&self.peer.name, self.call_timeout)),
        };

        let elapsed = started.elapsed();
        self.metrics.record_latency(elapsed);
        match &outcome {
            Ok(result) => debug!(
                peer = %self.peer.name,
                task_id,
                latency_ms = elapsed.as_millis() as u64,
                items = result.structured_items.len(),
                "Send settled"
            ),
            Err(e) => {
                self.metrics.record_failure(&e.to_string(), e.is_timeout());
                warn!(
                    peer = %self.peer.name,
                    task_id,
                    latency_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Send failed"
                );
            }
        }
        outcome
    }

    async fn dispatch(
        &self,
        task_text: &str,
        task_id: &str,
        context_id: &str,
    ) -> Result<CapabilityResult> {
        match self.transport {
            Transport::Envelope => self.send_envelope(task_text, task_id, context_id).await,
            Transport::SimpleChat => self.send_chat(task_text).await,
        }
    }

    async fn send_envelope(
        &self,
        task_text: &str,
        task_id: &str,
        context_id: &str,
    ) -> Result<CapabilityResult> {
        let envelope = protocol::encode(Role::User, task_text, task_id, context_id);
        let body = self.post(MESSAGE_PATH, &envelope.to_request()).await?;

        let response = protocol::decode_response(&body, &envelope.message_id).map_err(|e| match e {
            Error::MalformedEnvelope(reason) => Error::protocol(&self.peer.name, reason),
            other => other,
        })?;
        Ok(reconcile(&response.result.content))
    }

    async fn send_chat(&self, task_text: &str) -> Result<CapabilityResult> {
        let request = ChatRequest {
            message: task_text.to_string(),
        };
        let body = self.post(CHAT_PATH, &request).await?;

        let value: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) => Value::String(String::from_utf8_lossy(&body).into_owned()),
        };
        let content = match value {
            Value::Object(mut map) if map.contains_key("response") => {
                map.remove("response").unwrap_or(Value::Null)
            }
            other => other,
        };
        if content.is_null() {
            return Err(Error::protocol(&self.peer.name, "chat answer carries no response"));
        }
        Ok(reconcile(&content))
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(self.url(path))
            .timeout(self.call_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::protocol(&self.peer.name, format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timed_out(&self.peer.name, self.call_timeout)
        } else {
            Error::unavailable(&self.peer.name, e.to_string())
        }
    }

    /// Liveness probe. Advisory only; a failed send is the real signal.
    pub async fn probe(&self, limit: Duration) -> bool {
        let request = self.client.get(self.url(HEALTH_PATH)).timeout(limit).send();
        match timeout(limit, request).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TaskStatus;
    use mockito::Matcher;
    use serde_json::json;

    fn connection(url: &str) -> RemoteAgentConnection {
        RemoteAgentConnection::new(
            PeerConfig::new("Hotel Booking Agent", url),
            reqwest::Client::new(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_discover_card() {
        let mut server = mockito::Server::new_async().await;
        let card = server
            .mock("GET", DISCOVERY_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "name": "Hotel Booking Agent",
                    "description": "hotels",
                    "capabilities": {"hotel_search": "Search for hotels"},
                    "url": server.url(),
                    "version": "2.0.0"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let descriptor = connection(&server.url())
            .discover(Duration::from_secs(2))
            .await
            .unwrap();

        card.assert_async().await;
        assert_eq!(descriptor.name, "Hotel Booking Agent");
        assert!(descriptor.has_capability("hotel_search"));
        assert_eq!(descriptor.protocol_version, "2.0.0");
    }

    #[tokio::test]
    async fn test_discovery_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", DISCOVERY_PATH)
            .with_status(500)
            .create_async()
            .await;
        let err = connection(&server.url())
            .discover(Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Discovery { not_advertised: false, .. }));

        let mut missing = mockito::Server::new_async().await;
        missing
            .mock("GET", DISCOVERY_PATH)
            .with_status(404)
            .create_async()
            .await;
        let err = connection(&missing.url())
            .discover(Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Discovery { not_advertised: true, .. }));

        let mut nameless = mockito::Server::new_async().await;
        nameless
            .mock("GET", DISCOVERY_PATH)
            .with_status(200)
            .with_body(json!({"url": "http://x"}).to_string())
            .create_async()
            .await;
        assert!(connection(&nameless.url())
            .discover(Duration::from_secs(2))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_send_envelope_echoes_id() {
        let mut server = mockito::Server::new_async().await;
        // The mock cannot echo the generated message id, so the answer is a
        // protocol error even though the body is well formed.
        let message = server
            .mock("POST", MESSAGE_PATH)
            .match_body(Matcher::PartialJson(json!({
                "message": {"role": "user", "taskId": "task-1", "contextId": "ctx-1"}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "id": "someone-else",
                    "status": "success",
                    "result": {"type": "text", "content": "hi", "metadata": {}}
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let conn = connection(&server.url());
        let err = conn.send("Find hotels", "task-1", "ctx-1").await.unwrap_err();

        message.assert_async().await;
        assert!(matches!(err, Error::RemoteProtocol { .. }));
        assert_eq!(conn.metrics().snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_send_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", MESSAGE_PATH)
            .with_status(503)
            .create_async()
            .await;

        let err = connection(&server.url())
            .send("Find hotels", "task-1", "ctx-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RemoteProtocol { .. }));
    }

    #[tokio::test]
    async fn test_send_chat_transport() {
        let mut server = mockito::Server::new_async().await;
        let chat = server
            .mock("POST", CHAT_PATH)
            .match_body(Matcher::Json(json!({"message": "Find cars in Rome"})))
            .with_status(200)
            .with_body(
                json!({"response": [{"title": "Rome Cars", "snippet": "from $30"}]}).to_string(),
            )
            .create_async()
            .await;

        let conn = connection(&server.url()).with_transport(Transport::SimpleChat);
        let result = conn.send("Find cars in Rome", "t", "c").await.unwrap();

        chat.assert_async().await;
        assert_eq!(result.status, TaskStatus::Completed);
        assert_eq!(result.structured_items[0].name, "Rome Cars");
        assert_eq!(conn.metrics().calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        // Port 9 (discard) is closed on test hosts.
        let conn = connection("http://127.0.0.1:9");
        let err = conn.send("x", "t", "c").await.unwrap_err();
        assert!(matches!(err, Error::RemoteUnavailable { .. }));
        assert!(!conn.probe(Duration::from_millis(500)).await);
    }
}
