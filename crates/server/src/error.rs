use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors surfaced across the HTTP boundary.
///
/// `GatewayError` and `RepoError` both collapse to a 5xx: the transaction
/// has already been rolled back by the time either reaches a handler, so
/// there is nothing partial to report beyond "this failed".
#[derive(Debug, Error)]
pub enum NudgeError {
    /// The request body failed to deserialize or failed basic shape checks.
    #[error("invalid request: {0}")]
    InvalidPayload(String),

    /// Event-processing pipeline failure (repository, evaluator or
    /// messaging-provider error); the transaction has been rolled back.
    #[error("event processing failed: {0}")]
    Gateway(#[from] nudge_gateway::GatewayError),

    /// Audit-projector repository failure.
    #[error("audit lookup failed: {0}")]
    Repo(#[from] nudge_repo::RepoError),
}

impl IntoResponse for NudgeError {
    fn into_response(self) -> Response {
        let (status, category) = match &self {
            Self::InvalidPayload(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_payload"),
            Self::Gateway(_) => (StatusCode::INTERNAL_SERVER_ERROR, "gateway_error"),
            Self::Repo(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository_error"),
        };

        let body = serde_json::json!({
            "error": category,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
