use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::{ActionType, Channel, Outcome};

/// The authoritative audit artifact: written exactly once per ingested
/// event, regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub event_type: String,
    pub matched_rule: Option<String>,
    pub action_type: ActionType,
    pub outcome: Outcome,
    pub reason: String,
    pub template_name: Option<String>,
    pub channel: Option<Channel>,
    pub created_at: DateTime<Utc>,
}
