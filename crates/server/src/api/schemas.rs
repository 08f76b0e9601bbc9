use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `GET /health` response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Inbound user-traits payload, nested inside `EventInBody`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserTraitsBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub marketing_opt_in: Option<bool>,
    #[serde(default)]
    pub risk_segment: Option<String>,
}

/// `POST /events` request body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventInBody {
    pub user_id: String,
    pub event_type: String,
    pub event_timestamp: DateTime<Utc>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub properties: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub user_traits: Option<UserTraitsBody>,
}

impl From<EventInBody> for nudge_core::EventIn {
    fn from(body: EventInBody) -> Self {
        Self {
            user_id: body.user_id,
            event_type: body.event_type,
            event_timestamp: body.event_timestamp,
            properties: body.properties,
            user_traits: body.user_traits.map(|t| nudge_core::UserTraitsIn {
                email: t.email,
                country: t.country,
                marketing_opt_in: t.marketing_opt_in,
                risk_segment: t.risk_segment,
            }),
        }
    }
}

/// `POST /events` response body: the full decision outcome for one event.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventProcessingResultBody {
    pub event_id: String,
    pub user_id: String,
    pub event_type: String,
    pub matched_rule: Option<String>,
    pub action_type: Option<String>,
    pub template_name: Option<String>,
    pub channel: Option<String>,
    pub outcome: String,
    pub reason: Option<String>,
}

impl From<nudge_gateway::ProcessEventResult> for EventProcessingResultBody {
    fn from(result: nudge_gateway::ProcessEventResult) -> Self {
        Self {
            event_id: result.event_id,
            user_id: result.user_id,
            event_type: result.event_type,
            matched_rule: result.matched_rule,
            action_type: Some(result.action_type.as_str().to_owned()),
            template_name: result.template_name,
            channel: result.channel.map(|c| c.as_str().to_owned()),
            outcome: result.outcome.as_str().to_owned(),
            reason: Some(result.reason),
        }
    }
}

/// One row of `GET /audit/{user_id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditLogItemBody {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub event_id: String,
    pub user_id: String,
    pub event_type: String,
    pub matched_rule: Option<String>,
    pub action_type: String,
    pub outcome: String,
    pub reason: String,
    pub template_name: Option<String>,
    pub channel: Option<String>,
}

impl From<nudge_gateway::AuditLogItem> for AuditLogItemBody {
    fn from(item: nudge_gateway::AuditLogItem) -> Self {
        Self {
            timestamp: item.timestamp,
            kind: item.kind.to_owned(),
            event_id: item.event_id,
            user_id: item.user_id,
            event_type: item.event_type,
            matched_rule: item.matched_rule,
            action_type: item.action_type.as_str().to_owned(),
            outcome: item.outcome.as_str().to_owned(),
            reason: item.reason,
            template_name: item.template_name,
            channel: item.channel.map(|c| c.as_str().to_owned()),
        }
    }
}

/// `GET /audit/{user_id}` response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditLogBody {
    pub user_id: String,
    pub items: Vec<AuditLogItemBody>,
}

impl From<nudge_gateway::AuditLog> for AuditLogBody {
    fn from(log: nudge_gateway::AuditLog) -> Self {
        Self {
            user_id: log.user_id,
            items: log.items.into_iter().map(Into::into).collect(),
        }
    }
}

/// Error response body shared by every non-2xx handler response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponseBody {
    pub error: String,
    pub message: String,
}
