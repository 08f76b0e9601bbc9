use super::schemas::{
    AuditLogBody, AuditLogItemBody, ErrorResponseBody, EventInBody, EventProcessingResultBody,
    HealthResponse, UserTraitsBody,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Nudge Decision Engine API",
        version = "0.1.0",
        description = "HTTP API for the marketing-messaging decision engine. Ingest events, evaluate rules, and review the per-user audit trail.",
        license(name = "MIT")
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Events", description = "Event ingestion and rule evaluation"),
        (name = "Audit", description = "Per-user decision history")
    ),
    paths(
        super::health::health,
        super::events::ingest_event,
        super::audit::get_audit_log,
    ),
    components(schemas(
        HealthResponse,
        UserTraitsBody,
        EventInBody,
        EventProcessingResultBody,
        AuditLogItemBody,
        AuditLogBody,
        ErrorResponseBody,
    ))
)]
pub struct ApiDoc;
