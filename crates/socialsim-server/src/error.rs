//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Engine
//! errors are mapped onto status codes by [`From<SimulationError>`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use socialsim_core::{GeneratorError, SimulationError, StateError};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request was well-formed but rejected by validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with the current run state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The text generator failed or returned something unusable.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The text generator did not answer in time.
    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
}

impl From<SimulationError> for ApiError {
    fn from(err: SimulationError) -> Self {
        let message = err.to_string();
        match err {
            SimulationError::State(
                StateError::PersonaNotFound(_) | StateError::MetricNotFound(_),
            ) => Self::NotFound(message),
            SimulationError::State(StateError::AlreadyRunning | StateError::RunActive) => {
                Self::Conflict(message)
            }
            SimulationError::State(_)
            | SimulationError::Configuration(_)
            | SimulationError::Collaborator(GeneratorError::NotConfigured(_)) => {
                Self::BadRequest(message)
            }
            SimulationError::Collaborator(GeneratorError::Timeout { .. }) => {
                Self::UpstreamTimeout(message)
            }
            SimulationError::Collaborator(_) | SimulationError::Parse(_) => Self::Upstream(message),
            SimulationError::Template(_) => Self::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) | Self::InvalidUuid(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::UpstreamTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
