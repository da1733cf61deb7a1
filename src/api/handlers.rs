//! Request handlers for the HTTP API

use crate::error::VotingError;
use crate::service::app::AppState;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::types::VoteRequest;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

fn message(status: StatusCode, text: impl Into<String>) -> Response {
    let body = json!({
        "status": if status.is_success() { "ok" } else { "error" },
        "message": text.into(),
    });
    (status, Json(body)).into_response()
}

/// Root endpoint handler - shows service information
pub async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "service": state.config().service.name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/vote",
            "/api/ranking",
            "/api/entries",
            "/health",
            "/ready",
            "/alive",
            "/metrics"
        ]
    }))
}

/// Vote submission handler
///
/// 200 once the vote is in the log, 400 for any invalid input, 500 when the
/// log or catalog cannot be reached. Nothing is written unless the vote is
/// valid.
pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(request) => request,
        Err(rejection) => {
            debug!("Rejected vote body: {}", rejection.body_text());
            state.metrics().record_vote("invalid");
            return message(
                StatusCode::BAD_REQUEST,
                format!("Invalid parameters: {}", rejection.body_text()),
            );
        }
    };

    match state.submit_vote(&request).await {
        Ok(event) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "Vote submitted",
                "id": event.id,
            })),
        )
            .into_response(),
        Err(e) => match e.downcast_ref::<VotingError>() {
            Some(typed) if typed.is_client_error() => {
                message(StatusCode::BAD_REQUEST, format!("Invalid parameters: {}", typed))
            }
            _ => {
                error!("Vote submission failed: {:#}", e);
                message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        },
    }
}

/// Latest published ranking snapshot
pub async fn ranking_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.publisher().latest().await {
        Ok(Some(snapshot)) => (StatusCode::OK, Json(snapshot)).into_response(),
        Ok(None) => message(StatusCode::NOT_FOUND, "No ranking published yet"),
        Err(e) => {
            error!("Failed to read ranking cache: {:#}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

/// Catalog entries in declaration order
pub async fn entries_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.catalog().load_catalog().await {
        Ok(catalog) => (StatusCode::OK, Json(catalog.entries().to_vec())).into_response(),
        Err(e) => {
            error!("Failed to load catalog: {:#}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        }
    }
}

/// Full health report
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    debug!("Health check requested");

    match HealthCheck::check(state).await {
        Ok(health) => {
            let status = match health.status {
                HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
            };
            (status, Json(health)).into_response()
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            message(StatusCode::SERVICE_UNAVAILABLE, "Health check failed")
        }
    }
}

/// Readiness check endpoint handler
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    debug!("Readiness check requested");

    match HealthCheck::readiness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Ready"),
        Ok(HealthStatus::Degraded) => (StatusCode::OK, "Degraded but ready"),
        Ok(HealthStatus::Unhealthy) => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
        Err(e) => {
            warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Not ready")
        }
    }
}

/// Liveness check endpoint handler
pub async fn alive_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match HealthCheck::liveness_check(state).await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "Alive"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
    }
}

/// Prometheus metrics endpoint handler
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let registry = state.metrics().registry();
    let metric_families = registry.gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            output,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}
