use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record that a message *was not dispatched* because a suppression mode
/// vetoed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suppression {
    pub id: String,
    pub user_id: String,
    pub event_id: Option<String>,
    pub template_name: String,
    /// The mode code that caused the veto, e.g. `"once_ever"`.
    pub suppression_reason: String,
    pub decided_at: DateTime<Utc>,
}
