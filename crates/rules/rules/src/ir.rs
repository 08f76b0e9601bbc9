use nudge_core::outcome::{ActionType, Channel, SuppressionMode};
use serde_json::Value;

/// The trigger an event must match by `event_type` before a rule's
/// conditions are even consulted.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub event_type: String,
}

/// A field-comparison operator. `Equals` checks strict equality; `Gte`
/// requires the actual value be non-null and orderable-greater-or-equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOperator {
    Equals,
    Gte,
}

/// One condition in a rule's `conditions.all` list. The two variants are
/// mutually exclusive in the source document — a condition is either a
/// field comparison or a prior-event lookup, never both.
#[derive(Debug, Clone)]
pub enum Condition {
    Field {
        /// `properties.<key>` or `user_traits.<name>`.
        field: String,
        operator: FieldOperator,
        value: Value,
    },
    PriorEvent {
        event_type: String,
        hours: u32,
    },
}

/// What a matched rule does: dispatch a message or raise an internal alert.
#[derive(Debug, Clone)]
pub struct Action {
    pub action_type: ActionType,
    pub template_name: String,
    pub delivery_method: Channel,
}

/// The per-template send-frequency guarantee a rule declares for its
/// `send` action. Ignored for `alert` actions, which always bypass
/// suppression.
#[derive(Debug, Clone, Copy)]
pub struct Suppression {
    pub mode: SuppressionMode,
}

impl Default for Suppression {
    fn default() -> Self {
        Self {
            mode: SuppressionMode::None,
        }
    }
}

/// A single catalog entry: `(trigger, conditions, action, suppression)`.
///
/// Rules are evaluated in document order; the evaluator stops at the first
/// enabled rule whose trigger and conditions both match.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger: Trigger,
    pub conditions: Vec<Condition>,
    pub action: Action,
    pub suppression: Suppression,
}
