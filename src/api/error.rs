use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::pricing::PricingError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing fields.")]
    MissingFields,

    #[error("{0}")]
    InvalidBody(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("{0}")]
    Internal(String),
}

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Pricing(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "API error occurred");
        } else {
            tracing::debug!(error = %self, "Client error");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::InvalidBody(format!("Invalid fields: {errors}"))
    }
}
