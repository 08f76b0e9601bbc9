use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, warn};

use crate::error::NudgeError;

use super::extract::ValidatedJson;
use super::schemas::{EventInBody, EventProcessingResultBody};
use super::AppState;

/// `POST /events` -- run the full decision pipeline for one inbound event.
///
/// Persists the event, evaluates the rule catalog, applies the suppression
/// gate, performs the matching side effect (dispatch or suppression), and
/// writes the audit `Decision` row, all inside one transaction.
#[utoipa::path(
    post,
    path = "/events/",
    tag = "Events",
    summary = "Ingest an event",
    request_body = EventInBody,
    responses(
        (status = 200, description = "Event processed", body = EventProcessingResultBody),
        (status = 422, description = "Invalid event payload"),
        (status = 500, description = "Event processing failed")
    )
)]
pub async fn ingest_event(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<EventInBody>,
) -> Result<impl IntoResponse, NudgeError> {
    let user_id = body.user_id.clone();
    let event_type = body.event_type.clone();

    let result = state.processor.process_event(body.into()).await;

    match result {
        Ok(result) => {
            info!(%user_id, %event_type, outcome = %result.outcome, "event ingested");
            Ok((StatusCode::OK, Json(EventProcessingResultBody::from(result))))
        }
        Err(err) => {
            warn!(%user_id, %event_type, error = %err, "event ingestion failed");
            Err(NudgeError::from(err))
        }
    }
}
