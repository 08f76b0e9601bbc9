use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::NudgeError;

use super::schemas::AuditLogBody;
use super::AppState;

/// `GET /audit/{user_id}` -- newest-first decision history for one user.
///
/// Never errors for an unknown `user_id`; returns an empty `items` list
/// instead, matching the audit projector's read-only contract.
#[utoipa::path(
    get,
    path = "/audit/{user_id}",
    tag = "Audit",
    summary = "Fetch a user's decision history",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Decision history, newest first", body = AuditLogBody),
        (status = 500, description = "Audit lookup failed")
    )
)]
pub async fn get_audit_log(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, NudgeError> {
    let log = state.projector.get_audit_log(&user_id).await?;
    Ok((StatusCode::OK, Json(AuditLogBody::from(log))))
}
