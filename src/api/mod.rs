pub mod error;
pub mod health;
pub mod price;

use axum::{
    error_handling::HandleErrorLayer, extract::DefaultBodyLimit, routing::get, BoxError, Router,
};
use std::time::Duration;
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::app::AppState;
use error::ApiError;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.cfg.server.request_timeout_secs);

    let routes = Router::new()
        .route("/price", get(price::get_price).post(price::get_price))
        .route("/healthz", get(health::liveness_check))
        .route("/readyz", get(health::readiness_check))
        .with_state(state);

    with_middleware(routes, timeout)
}

fn with_middleware(routes: Router, timeout: Duration) -> Router {
    routes
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .layer(TimeoutLayer::new(timeout)),
        )
        .layer(TraceLayer::new_for_http())
}

/// Middleware failures use the same `{"error": ...}` body as handler errors
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<tower::timeout::error::Elapsed>() {
        ApiError::Internal("request timed out".to_string())
    } else {
        ApiError::Internal(format!("unhandled internal error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_slow_request_times_out_as_internal_error() {
        let routes = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let app = with_middleware(routes, Duration::from_millis(20));

        let response = app
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "request timed out" }));
    }

    #[tokio::test]
    async fn test_fast_request_passes_through() {
        let routes = Router::new().route("/fast", get(|| async { "ok" }));
        let app = with_middleware(routes, Duration::from_secs(1));

        let response = app
            .oneshot(Request::builder().uri("/fast").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
