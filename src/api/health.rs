use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::time::Instant;

use crate::app::AppState;

/// Health status of a component
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ComponentHealth {
    fn healthy(latency_ms: u64) -> Self {
        Self {
            status: "healthy".to_string(),
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    fn unhealthy(error: String) -> Self {
        Self {
            status: "unhealthy".to_string(),
            latency_ms: None,
            error: Some(error),
        }
    }
}

/// Readiness response
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    store: ComponentHealth,
}

/// GET /readyz - 200 once the consumption store answers
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let store = match state.store.ping().await {
        Ok(()) => ComponentHealth::healthy(start.elapsed().as_millis() as u64),
        Err(e) => ComponentHealth::unhealthy(e.to_string()),
    };

    let ready = store.status == "healthy";
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    tracing::debug!(ready, "Readiness check completed");

    let response = ReadinessResponse {
        status: if ready { "ready" } else { "unavailable" }.to_string(),
        timestamp: chrono::Utc::now(),
        store,
    };
    (status_code, Json(response))
}

/// GET /healthz - liveness probe
pub async fn liveness_check() -> impl IntoResponse {
    StatusCode::OK
}
