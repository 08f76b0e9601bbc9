pub mod decision;
pub mod event;
pub mod outcome;
pub mod send_request;
pub mod suppression;

pub use decision::Decision;
pub use event::{Event, EventIn, UserTraits, UserTraitsIn};
pub use outcome::{ActionType, Channel, Outcome, RuleDecision, SuppressionMode};
pub use send_request::SendRequest;
pub use suppression::Suppression;

/// Allocate a fresh UUIDv7 identifier, used for every persisted entity's `id`.
///
/// UUIDv7 embeds a millisecond timestamp in its high bits, so ids sort
/// roughly in creation order even without a separate `created_at` index.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
