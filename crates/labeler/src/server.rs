//! HTTP server for Omnivore label webhooks.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use omnivore::WebhookEvent;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::LabelerError;
use crate::handlers::{Labeler, Outcome};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Configuration.
    pub config: Config,
    /// Label event pipeline.
    pub labeler: Arc<Labeler>,
}

/// Build the HTTP router for the label automation service.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Webhook endpoints
        .route("/", post(webhook_handler))
        .route("/webhook", post(webhook_handler))
        // Manual trigger endpoint for testing
        .route("/trigger", post(trigger_handler))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request body for a manual trigger.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TriggerRequest {
    /// Article ID
    page_id: String,
    /// Label names; only trigger labels are acted on
    #[serde(default)]
    labels: Vec<String>,
}

fn respond(result: Result<Outcome, LabelerError>) -> Response {
    match result {
        Ok(outcome) => {
            info!(%outcome, "Event handled");
            outcome.into_response()
        }
        Err(e) => {
            if e.status().is_server_error() {
                error!(error = %e, "Event failed");
            } else {
                warn!(error = %e, "Event rejected");
            }
            e.into_response()
        }
    }
}

/// Handle an Omnivore label webhook.
pub async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => return respond(Err(LabelerError::InvalidPayload(e.to_string()))),
    };

    info!(
        action = ?event.action,
        page_id = event.page_id().unwrap_or("unknown"),
        labels = event.labels().len(),
        "Received Omnivore webhook"
    );

    respond(state.labeler.handle_event(&event).await)
}

/// Run the pipeline for an article and explicit label names.
async fn trigger_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request: TriggerRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return respond(Err(LabelerError::InvalidPayload(e.to_string()))),
    };
    info!(page_id = %request.page_id, labels = ?request.labels, "Manual trigger requested");
    respond(
        state
            .labeler
            .handle_trigger(&request.page_id, &request.labels)
            .await,
    )
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    if state.config.omnivore_api_key.is_none() || !state.labeler.completion_configured() {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(Json(json!({ "status": "ready" })))
}
