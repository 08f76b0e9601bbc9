use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::Channel;

/// A record that a message *was dispatched* for a `(user, template)` pair.
///
/// Written for both `allow` (`channel = decision.delivery_method`) and
/// `alert` (`channel = internal`) outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub id: String,
    pub user_id: String,
    pub event_id: Option<String>,
    /// The triggering event's instant; drives the `once_per_calendar_day`
    /// window check. `None` rows never participate in that check.
    pub event_timestamp: Option<DateTime<Utc>>,
    pub template_name: String,
    pub channel: Channel,
    /// Human-readable, e.g. `"rule:welcome_email"`.
    pub reason: String,
    pub decided_at: DateTime<Utc>,
}
