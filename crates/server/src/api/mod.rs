pub mod audit;
pub mod events;
pub mod extract;
pub mod health;
pub mod openapi;
pub mod schemas;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use nudge_gateway::{AuditProjector, EventProcessor};

use self::openapi::ApiDoc;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs the event-processing pipeline.
    pub processor: Arc<EventProcessor>,
    /// Serves read-only decision history.
    pub projector: Arc<AuditProjector>,
}

/// Build the Axum router with all API routes and Swagger UI.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/events/", post(events::ingest_event))
        .route("/audit/{user_id}", get(audit::get_audit_log))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
