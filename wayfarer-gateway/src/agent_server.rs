//! HTTP surface of one capability agent.
//!
//! Serves the agent card on the discovery path, envelope messages, the
//! plain chat fallback, simulated bookings and a liveness probe.

use crate::error::{ApiError, ApiResult};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;
use wayfarer_core::agent::{Booking, BookingRequest};
use wayfarer_core::protocol::{
    self, ChatRequest, ChatResponse, MessageResponse, CHAT_PATH, DISCOVERY_PATH, HEALTH_PATH,
    MESSAGE_PATH,
};
use wayfarer_core::{AgentCard, CapabilityAgent};

pub const BOOK_PATH: &str = "/book";

/// Router for one agent. Each request runs on its own task.
pub fn agent_router(agent: Arc<CapabilityAgent>) -> Router {
    Router::new()
        .route("/", get(agent_info))
        .route(DISCOVERY_PATH, get(agent_card))
        .route(MESSAGE_PATH, post(handle_message))
        .route(CHAT_PATH, post(handle_chat))
        .route(BOOK_PATH, post(create_booking))
        .route("/book/:booking_id", get(get_booking))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(agent)
}

async fn agent_card(State(agent): State<Arc<CapabilityAgent>>) -> Json<AgentCard> {
    Json(agent.card().clone())
}

async fn agent_info(State(agent): State<Arc<CapabilityAgent>>) -> Json<Value> {
    let card = agent.card();
    Json(json!({
        "name": card.name,
        "description": card.description,
        "version": card.version,
        "capabilities": card.capabilities.keys().collect::<Vec<_>>(),
        "endpoints": {
            "agent_card": DISCOVERY_PATH,
            "message": MESSAGE_PATH,
            "chat": CHAT_PATH,
            "book": BOOK_PATH,
            "health": HEALTH_PATH,
        },
    }))
}

async fn handle_message(
    State(agent): State<Arc<CapabilityAgent>>,
    body: Bytes,
) -> ApiResult<Json<MessageResponse>> {
    let envelope = protocol::decode(&body)?;
    let text = envelope.text();
    info!(
        agent = %agent.card().name,
        task_id = %envelope.task_id,
        context_id = %envelope.context_id,
        "Envelope received"
    );

    let result = agent.handle(&envelope.task_id, &text).await;
    let metadata = json!({
        "agent": agent.card().name,
        "timestamp": Utc::now().to_rfc3339(),
        "capabilities_used": [agent.capability().to_string()],
        "task_status": result.status,
    });

    Ok(Json(MessageResponse::success(
        envelope.message_id,
        serde_json::to_value(&result).map_err(wayfarer_core::Error::from)?,
        metadata,
    )))
}

async fn handle_chat(
    State(agent): State<Arc<CapabilityAgent>>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let task_id = Uuid::new_v4().to_string();
    info!(agent = %agent.card().name, %task_id, "Chat request received");

    let result = agent.handle(&task_id, &request.message).await;
    Ok(Json(ChatResponse {
        response: serde_json::to_value(&result).map_err(wayfarer_core::Error::from)?,
    }))
}

async fn create_booking(
    State(agent): State<Arc<CapabilityAgent>>,
    Json(request): Json<BookingRequest>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(agent.bookings().book(request).await?))
}

async fn get_booking(
    State(agent): State<Arc<CapabilityAgent>>,
    Path(booking_id): Path<String>,
) -> ApiResult<Json<Booking>> {
    agent
        .bookings()
        .get(&booking_id)
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(booking_id))
}

async fn health(State(agent): State<Arc<CapabilityAgent>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "agent": agent.card().name,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
