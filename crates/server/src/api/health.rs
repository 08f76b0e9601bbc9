use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use super::schemas::HealthResponse;

/// `GET /health` -- liveness check. Never touches the repository layer.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    summary = "Health check",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_owned(),
        }),
    )
}
