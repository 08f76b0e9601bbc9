use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A caller-supplied, timestamped record of something that happened to a user.
///
/// Immutable once written: nothing in the pipeline ever updates an `Event`
/// row after `EventRepo::add` returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Assigned on insert (UUIDv7).
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    /// Caller-supplied instant, UTC. Drives every temporal rule condition.
    pub event_timestamp: DateTime<Utc>,
    /// Arbitrary JSON-shaped properties; looked up by rule conditions as
    /// `properties.<key>`.
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
    /// Server-assigned, set when the row is persisted.
    pub created_at: DateTime<Utc>,
    /// At most one set of traits, attached to this event rather than to the
    /// user globally.
    pub user_traits: Option<UserTraits>,
}

impl Event {
    /// Construct a new event from an inbound payload, ready to hand to
    /// `EventRepo::add`. `id` and `created_at` are filled in by the
    /// repository on insert.
    #[must_use]
    pub fn from_payload(payload: EventIn, id: String, created_at: DateTime<Utc>) -> Self {
        let user_traits = payload
            .user_traits
            .map(|traits| UserTraits::from_payload(traits, id.clone()));
        Self {
            id,
            user_id: payload.user_id,
            event_type: payload.event_type,
            event_timestamp: payload.event_timestamp,
            properties: payload.properties.unwrap_or_default(),
            created_at,
            user_traits,
        }
    }

    /// Read a property value by key, returning `Null` when absent.
    #[must_use]
    pub fn property(&self, key: &str) -> serde_json::Value {
        self.properties
            .get(key)
            .cloned()
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Traits attached to a single `Event`, not to the user globally: the same
/// user may have different traits recorded on different events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserTraits {
    pub event_id: String,
    pub email: Option<String>,
    pub country: Option<String>,
    pub marketing_opt_in: Option<bool>,
    pub risk_segment: Option<String>,
}

impl UserTraits {
    /// Read a named trait as a JSON value, returning `Null` for unknown
    /// names or absent values. Used by `user_traits.<name>` field
    /// resolution in the rule evaluator.
    #[must_use]
    pub fn field(&self, name: &str) -> serde_json::Value {
        match name {
            "email" => self
                .email
                .clone()
                .map_or(serde_json::Value::Null, serde_json::Value::String),
            "country" => self
                .country
                .clone()
                .map_or(serde_json::Value::Null, serde_json::Value::String),
            "marketing_opt_in" => self
                .marketing_opt_in
                .map_or(serde_json::Value::Null, serde_json::Value::Bool),
            "risk_segment" => self
                .risk_segment
                .clone()
                .map_or(serde_json::Value::Null, serde_json::Value::String),
            _ => serde_json::Value::Null,
        }
    }

    fn from_payload(payload: UserTraitsIn, event_id: String) -> Self {
        Self {
            event_id,
            email: payload.email,
            country: payload.country,
            marketing_opt_in: payload.marketing_opt_in,
            risk_segment: payload.risk_segment,
        }
    }
}

/// Inbound event payload, as accepted by `POST /events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventIn {
    pub user_id: String,
    pub event_type: String,
    pub event_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub properties: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub user_traits: Option<UserTraitsIn>,
}

/// Inbound user-traits payload, nested inside `EventIn`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTraitsIn {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub marketing_opt_in: Option<bool>,
    #[serde(default)]
    pub risk_segment: Option<String>,
}
