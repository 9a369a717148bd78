use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{provider} provider unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },
    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn invalid_input<E: std::fmt::Display>(err: E) -> Self {
        ApiError::InvalidInput(err.to_string())
    }

    pub fn provider_unavailable<E: std::fmt::Display>(provider: &str, err: E) -> Self {
        ApiError::ProviderUnavailable {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::ProviderUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            ApiError::StreamInterrupted(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

/// Error from a single external provider call, before retry classification.
///
/// Transient failures (network errors, timeouts, rate limits, 5xx) are
/// retried by [`crate::core::retry::with_retry`]; permanent failures are not.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transient failure: {0}")]
    Transient(String),
    #[error("{0}")]
    Permanent(String),
}

impl ProviderError {
    pub fn transient<E: std::fmt::Display>(err: E) -> Self {
        ProviderError::Transient(err.to_string())
    }

    pub fn permanent<E: std::fmt::Display>(err: E) -> Self {
        ProviderError::Permanent(err.to_string())
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}
