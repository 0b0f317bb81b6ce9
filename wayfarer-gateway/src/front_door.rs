//! Planner Front Door: the external trip planning API.

use crate::error::ApiResult;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;
use wayfarer_core::coordinator::CoordinatorStatus;
use wayfarer_core::protocol::HEALTH_PATH;
use wayfarer_core::{AggregatedPlan, Coordinator, Error, TripRequest};

pub const PLAN_PATH: &str = "/api/plan-trip";
pub const STATUS_PATH: &str = "/api/status";

pub fn front_door_router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route(PLAN_PATH, post(plan_trip))
        .route(STATUS_PATH, get(status))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

async fn plan_trip(
    State(coordinator): State<Arc<Coordinator>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<AggregatedPlan>> {
    // Shape errors are reported like invariant violations.
    let request: TripRequest =
        serde_json::from_value(body).map_err(|e| Error::validation(e.to_string()))?;

    let started = Instant::now();
    let plan = coordinator.plan(request).await?;
    info!(
        task_id = %plan.task_id,
        destination = %plan.destination,
        latency_ms = started.elapsed().as_millis() as u64,
        "Trip planned"
    );
    Ok(Json(plan))
}

async fn status(State(coordinator): State<Arc<Coordinator>>) -> Json<CoordinatorStatus> {
    Json(coordinator.status().await)
}

async fn health(State(coordinator): State<Arc<Coordinator>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "strategy": coordinator.strategy(),
        "peers": coordinator.connections().len(),
        "excluded": coordinator.excluded().len(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
