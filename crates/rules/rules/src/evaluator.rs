use async_trait::async_trait;
use nudge_core::outcome::RuleDecision;
use nudge_core::{Event, UserTraits};
use nudge_repo::RepoTransaction;
use serde_json::Value;

use crate::catalog::RuleCatalog;
use crate::error::EvalError;
use crate::ir::{Condition, FieldOperator, Rule};

/// Evaluates a persisted event against a frozen [`RuleCatalog`], producing
/// the first matching rule's verdict or `RuleDecision::no_match()`.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        repo: &mut dyn RepoTransaction,
        event: &Event,
        traits: Option<&UserTraits>,
    ) -> Result<RuleDecision, EvalError>;
}

/// The first-match-wins evaluator over a frozen [`RuleCatalog`].
pub struct CatalogEvaluator {
    catalog: RuleCatalog,
}

impl CatalogEvaluator {
    #[must_use]
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RuleEvaluator for CatalogEvaluator {
    async fn evaluate(
        &self,
        repo: &mut dyn RepoTransaction,
        event: &Event,
        traits: Option<&UserTraits>,
    ) -> Result<RuleDecision, EvalError> {
        for rule in self.catalog.rules() {
            if !rule.enabled {
                continue;
            }
            if rule.trigger.event_type != event.event_type {
                continue;
            }
            if conditions_match(rule, repo, event, traits).await? {
                return Ok(RuleDecision {
                    action_type: rule.action.action_type,
                    template_name: Some(rule.action.template_name.clone()),
                    delivery_method: Some(rule.action.delivery_method),
                    suppression_mode: Some(rule.suppression.mode),
                    matched_rule: Some(rule.name.clone()),
                    reason: format!("Matched rule: {}", rule.name),
                });
            }
        }

        Ok(RuleDecision::no_match())
    }
}

/// `conditions.all` is vacuously true when empty — trigger-match alone
/// suffices. Conditions are checked in order; the first false condition
/// short-circuits the rest (a `prior_event` condition not reached is never
/// looked up).
async fn conditions_match(
    rule: &Rule,
    repo: &mut dyn RepoTransaction,
    event: &Event,
    traits: Option<&UserTraits>,
) -> Result<bool, EvalError> {
    for condition in &rule.conditions {
        let holds = match condition {
            Condition::Field {
                field,
                operator,
                value,
            } => field_condition_holds(field, *operator, value, event, traits),
            Condition::PriorEvent { event_type, hours } => {
                prior_event_condition_holds(repo, event, event_type, *hours).await?
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn field_condition_holds(
    field: &str,
    operator: FieldOperator,
    expected: &Value,
    event: &Event,
    traits: Option<&UserTraits>,
) -> bool {
    let actual = resolve_field(field, event, traits);
    match operator {
        // `null == null` would otherwise hold; a field that resolves to
        // null never equals a caller-supplied non-null expected value, but
        // two nulls may legitimately compare equal via plain equality.
        FieldOperator::Equals => actual == *expected,
        FieldOperator::Gte => !actual.is_null() && gte(&actual, expected),
    }
}

/// `event.<name>`, `user_traits.<name>`, `properties.<key>`; any other
/// prefix resolves to `null` rather than erroring — unknown condition
/// shapes are treated as false, never abort evaluation.
fn resolve_field(path: &str, event: &Event, traits: Option<&UserTraits>) -> Value {
    if let Some(name) = path.strip_prefix("event.") {
        return event_attribute(event, name);
    }
    if let Some(name) = path.strip_prefix("user_traits.") {
        return traits.map_or(Value::Null, |t| t.field(name));
    }
    if let Some(key) = path.strip_prefix("properties.") {
        return event.property(key);
    }
    Value::Null
}

fn event_attribute(event: &Event, name: &str) -> Value {
    match name {
        "user_id" => Value::String(event.user_id.clone()),
        "event_type" => Value::String(event.event_type.clone()),
        "event_timestamp" => Value::String(event.event_timestamp.to_rfc3339()),
        _ => Value::Null,
    }
}

/// Orderable `>=` over JSON numbers and strings; any other shape (or a
/// type mismatch) is not orderable and fails the comparison.
fn gte(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a >= b,
            _ => false,
        },
        (Value::String(a), Value::String(b)) => a >= b,
        _ => false,
    }
}

/// `prior_event` condition: look up the most recent prior event of the
/// given type for the same user (any instant — not restricted to before
/// the current event) and hold iff `current − prior ≤ hours`. Uses
/// whole-instant arithmetic, so it holds trivially when `prior` is after
/// `current` (a negative difference is always `≤` a positive window).
async fn prior_event_condition_holds(
    repo: &mut dyn RepoTransaction,
    event: &Event,
    event_type: &str,
    hours: u32,
) -> Result<bool, EvalError> {
    let prior = repo
        .latest_event_by_user_and_type(&event.user_id, event_type)
        .await
        .map_err(|e| EvalError::Repository(e.to_string()))?;

    let Some(prior) = prior else {
        return Ok(false);
    };

    let window = chrono::Duration::hours(i64::from(hours));
    Ok(event.event_timestamp - prior.event_timestamp <= window)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use nudge_core::outcome::{ActionType, Channel, SuppressionMode};
    use nudge_repo::RepoFactory;
    use nudge_repo_memory::MemoryRepoFactory;

    use super::*;
    use crate::ir::{Action, Suppression, Trigger};

    fn make_event(user_id: &str, event_type: &str, ts: chrono::DateTime<Utc>) -> Event {
        Event {
            id: nudge_core::new_id(),
            user_id: user_id.into(),
            event_type: event_type.into(),
            event_timestamp: ts,
            properties: HashMap::new(),
            created_at: ts,
            user_traits: None,
        }
    }

    fn field_rule(name: &str, event_type: &str, field: &str, op: FieldOperator, value: Value) -> Rule {
        Rule {
            name: name.into(),
            description: None,
            enabled: true,
            trigger: Trigger {
                event_type: event_type.into(),
            },
            conditions: vec![Condition::Field {
                field: field.into(),
                operator: op,
                value,
            }],
            action: Action {
                action_type: ActionType::Send,
                template_name: "TEMPLATE".into(),
                delivery_method: Channel::Email,
            },
            suppression: Suppression {
                mode: SuppressionMode::None,
            },
        }
    }

    #[tokio::test]
    async fn empty_conditions_matches_on_trigger_alone() {
        let rule = Rule {
            conditions: vec![],
            ..field_rule("r", "signup_completed", "properties.x", FieldOperator::Equals, Value::Null)
        };
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let event = make_event("u1", "signup_completed", Utc::now());
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.matched_rule.as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn disabled_rule_is_skipped() {
        let mut rule = field_rule(
            "r",
            "signup_completed",
            "properties.x",
            FieldOperator::Equals,
            Value::Null,
        );
        rule.enabled = false;
        rule.conditions = vec![];
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let event = make_event("u1", "signup_completed", Utc::now());
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert!(decision.matched_rule.is_none());
    }

    #[tokio::test]
    async fn first_match_wins() {
        let mut first = field_rule(
            "first",
            "signup_completed",
            "properties.x",
            FieldOperator::Equals,
            Value::Null,
        );
        first.conditions = vec![];
        let mut second = first.clone();
        second.name = "second".into();

        let catalog = RuleCatalog::from_rules(vec![first, second]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let event = make_event("u1", "signup_completed", Utc::now());
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.matched_rule.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn no_match_when_event_type_differs() {
        let mut rule = field_rule(
            "r",
            "signup_completed",
            "properties.x",
            FieldOperator::Equals,
            Value::Null,
        );
        rule.conditions = vec![];
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let event = make_event("u1", "some_unknown_event", Utc::now());
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.action_type, ActionType::None);
        assert_eq!(decision.reason, "No matching rule");
    }

    #[tokio::test]
    async fn field_condition_equals_on_properties() {
        let rule = field_rule(
            "r",
            "payment_failed",
            "properties.failure_reason",
            FieldOperator::Equals,
            Value::String("INSUFFICIENT_FUNDS".into()),
        );
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let mut event = make_event("u1", "payment_failed", Utc::now());
        event
            .properties
            .insert("failure_reason".into(), Value::String("INSUFFICIENT_FUNDS".into()));
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.matched_rule.as_deref(), Some("r"));
    }

    #[tokio::test]
    async fn gte_condition_requires_non_null_actual() {
        let rule = field_rule(
            "r",
            "payment_failed",
            "properties.attempt_number",
            FieldOperator::Gte,
            Value::from(3),
        );
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let event = make_event("u1", "payment_failed", Utc::now());
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.action_type, ActionType::None);
    }

    #[tokio::test]
    async fn prior_event_within_window_matches() {
        let rule = Rule {
            conditions: vec![Condition::PriorEvent {
                event_type: "signup_completed".into(),
                hours: 24,
            }],
            ..field_rule(
                "bank_link_nudge",
                "link_bank_success",
                "properties.x",
                FieldOperator::Equals,
                Value::Null,
            )
        };
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut seed = factory.begin().await.unwrap();
        let prior_ts = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        seed.add_event(make_event("u2", "signup_completed", prior_ts))
            .await
            .unwrap();
        seed.commit().await.unwrap();

        let mut tx = factory.begin().await.unwrap();
        let current_ts = Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap();
        let event = make_event("u2", "link_bank_success", current_ts);
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.matched_rule.as_deref(), Some("bank_link_nudge"));
    }

    #[tokio::test]
    async fn prior_event_past_window_does_not_match() {
        let rule = Rule {
            conditions: vec![Condition::PriorEvent {
                event_type: "signup_completed".into(),
                hours: 24,
            }],
            ..field_rule(
                "bank_link_nudge",
                "link_bank_success",
                "properties.x",
                FieldOperator::Equals,
                Value::Null,
            )
        };
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut seed = factory.begin().await.unwrap();
        let prior_ts = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        seed.add_event(make_event("u2", "signup_completed", prior_ts))
            .await
            .unwrap();
        seed.commit().await.unwrap();

        let mut tx = factory.begin().await.unwrap();
        // Exactly hours + 1 microsecond past the window.
        let current_ts = prior_ts + chrono::Duration::hours(24) + chrono::Duration::microseconds(1);
        let event = make_event("u2", "link_bank_success", current_ts);
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.action_type, ActionType::None);
    }

    #[tokio::test]
    async fn prior_event_missing_does_not_match() {
        let rule = Rule {
            conditions: vec![Condition::PriorEvent {
                event_type: "signup_completed".into(),
                hours: 24,
            }],
            ..field_rule(
                "bank_link_nudge",
                "link_bank_success",
                "properties.x",
                FieldOperator::Equals,
                Value::Null,
            )
        };
        let catalog = RuleCatalog::from_rules(vec![rule]);
        let evaluator = CatalogEvaluator::new(catalog);

        let factory = MemoryRepoFactory::new();
        let mut tx = factory.begin().await.unwrap();
        let event = make_event("u3", "link_bank_success", Utc::now());
        let decision = evaluator.evaluate(tx.as_mut(), &event, None).await.unwrap();
        assert_eq!(decision.action_type, ActionType::None);
    }
}
