use std::collections::HashSet;

use nudge_core::outcome::{ActionType, Channel, SuppressionMode};

use crate::error::ValidationError;
use crate::ir::{Action, Condition, FieldOperator, Rule, Suppression, Trigger};

const ALLOWED_FIELD_PREFIXES: [&str; 2] = ["properties.", "user_traits."];

/// An immutable, validated rule catalog, frozen for the process lifetime.
///
/// Constructed once at startup via [`RuleCatalog::validate`]; nothing in
/// the pipeline ever mutates a catalog after it is built, so it is safely
/// shared across concurrent event-processing handlers without locking.
#[derive(Debug, Clone)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// Validate and freeze a list of candidate rules, collecting every
    /// validation error found rather than stopping at the first one.
    ///
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found across the whole document.
    pub fn validate(rules: Vec<RuleInput>) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut compiled = Vec::with_capacity(rules.len());
        let mut seen_names = HashSet::new();

        for (idx, rule) in rules.into_iter().enumerate() {
            let path = format!("rules[{idx}]");
            match compile_rule(rule, &path, &mut errors) {
                Some(rule) => {
                    if !rule.name.is_empty() && !seen_names.insert(rule.name.clone()) {
                        errors.push(ValidationError::DuplicateName {
                            name: rule.name.clone(),
                        });
                    }
                    compiled.push(rule);
                }
                None => continue,
            }
        }

        if errors.is_empty() {
            Ok(Self { rules: compiled })
        } else {
            Err(errors)
        }
    }

    /// Build a catalog from already-validated rules, e.g. in tests. Skips
    /// the validation pass; callers are responsible for invariants holding.
    #[must_use]
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }
}

/// The unvalidated shape a rule catalog document parses into, before
/// [`RuleCatalog::validate`] compiles it into IR [`Rule`]s. A YAML (or any
/// other) frontend builds these from its own document shape.
#[derive(Debug, Clone, Default)]
pub struct RuleInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub trigger_event_type: Option<String>,
    pub conditions: Vec<ConditionInput>,
    pub action_type: Option<String>,
    pub action_template_name: Option<String>,
    pub action_delivery_method: Option<String>,
    pub suppression_mode: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ConditionInput {
    Field {
        field: Option<String>,
        operator: Option<String>,
        value: Option<serde_json::Value>,
    },
    PriorEvent {
        event_type: Option<String>,
        hours: Option<i64>,
    },
    /// Neither `field` nor `prior_event`, or both at once.
    Malformed { has_field: bool, has_prior_event: bool },
}

fn compile_rule(
    input: RuleInput,
    path: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Rule> {
    let name = match input.name.filter(|n| !n.trim().is_empty()) {
        Some(name) => name,
        None => {
            errors.push(ValidationError::MissingName { path: path.to_owned() });
            String::new()
        }
    };

    let trigger_event_type = match input.trigger_event_type.filter(|e| !e.trim().is_empty()) {
        Some(event_type) => event_type,
        None => {
            errors.push(ValidationError::MissingTriggerEventType {
                path: path.to_owned(),
            });
            String::new()
        }
    };

    let mut conditions = Vec::with_capacity(input.conditions.len());
    for (cidx, cond) in input.conditions.into_iter().enumerate() {
        let cpath = format!("{path}.conditions.all[{cidx}]");
        if let Some(compiled) = compile_condition(cond, &cpath, errors) {
            conditions.push(compiled);
        }
    }

    let action_type = compile_action_type(input.action_type.as_deref(), path, errors);
    let delivery_method =
        compile_delivery_method(input.action_delivery_method.as_deref(), path, errors);
    let template_name = match input
        .action_template_name
        .filter(|t| !t.trim().is_empty())
    {
        Some(t) => t,
        None => {
            errors.push(ValidationError::MissingTemplateName {
                path: path.to_owned(),
            });
            String::new()
        }
    };

    if let (Some(ActionType::Alert), Some(method)) = (action_type, delivery_method) {
        if method != Channel::Internal {
            errors.push(ValidationError::AlertRequiresInternal {
                path: path.to_owned(),
            });
        }
    }

    let mode = compile_suppression_mode(input.suppression_mode.as_deref(), path, errors);

    Some(Rule {
        name,
        description: input.description,
        enabled: input.enabled.unwrap_or(true),
        trigger: Trigger {
            event_type: trigger_event_type,
        },
        conditions,
        action: Action {
            action_type: action_type.unwrap_or(ActionType::Send),
            template_name,
            delivery_method: delivery_method.unwrap_or(Channel::Email),
        },
        suppression: Suppression {
            mode: mode.unwrap_or(SuppressionMode::None),
        },
    })
}

fn compile_condition(
    input: ConditionInput,
    path: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Condition> {
    match input {
        ConditionInput::Malformed {
            has_field,
            has_prior_event,
        } => {
            if has_field && has_prior_event {
                errors.push(ValidationError::AmbiguousCondition {
                    path: path.to_owned(),
                });
            } else {
                errors.push(ValidationError::EmptyCondition {
                    path: path.to_owned(),
                });
            }
            None
        }
        ConditionInput::Field {
            field,
            operator,
            value,
        } => {
            let field = match field.filter(|f| !f.trim().is_empty()) {
                Some(f) => {
                    if !ALLOWED_FIELD_PREFIXES.iter().any(|p| f.starts_with(p)) {
                        errors.push(ValidationError::BadFieldPrefix {
                            path: path.to_owned(),
                        });
                    }
                    f
                }
                None => {
                    errors.push(ValidationError::MissingField {
                        path: path.to_owned(),
                    });
                    String::new()
                }
            };

            let operator = match operator.as_deref() {
                Some("equals") => FieldOperator::Equals,
                Some("gte") => FieldOperator::Gte,
                _ => {
                    errors.push(ValidationError::BadOperator {
                        path: path.to_owned(),
                    });
                    FieldOperator::Equals
                }
            };

            let value = match value {
                Some(v) => v,
                None => {
                    errors.push(ValidationError::MissingValue {
                        path: path.to_owned(),
                    });
                    serde_json::Value::Null
                }
            };

            Some(Condition::Field {
                field,
                operator,
                value,
            })
        }
        ConditionInput::PriorEvent { event_type, hours } => {
            let event_type = match event_type.filter(|e| !e.trim().is_empty()) {
                Some(e) => e,
                None => {
                    errors.push(ValidationError::MissingPriorEventType {
                        path: path.to_owned(),
                    });
                    String::new()
                }
            };

            let hours = match hours.filter(|h| *h > 0).and_then(|h| u32::try_from(h).ok()) {
                Some(h) => h,
                None => {
                    errors.push(ValidationError::BadPriorEventHours {
                        path: path.to_owned(),
                    });
                    0
                }
            };

            Some(Condition::PriorEvent { event_type, hours })
        }
    }
}

fn compile_action_type(
    raw: Option<&str>,
    path: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<ActionType> {
    match raw {
        Some("send") => Some(ActionType::Send),
        Some("alert") => Some(ActionType::Alert),
        _ => {
            errors.push(ValidationError::BadActionType {
                path: path.to_owned(),
            });
            None
        }
    }
}

fn compile_delivery_method(
    raw: Option<&str>,
    path: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Channel> {
    match raw {
        Some("email") => Some(Channel::Email),
        Some("sms") => Some(Channel::Sms),
        Some("internal") => Some(Channel::Internal),
        _ => {
            errors.push(ValidationError::BadDeliveryMethod {
                path: path.to_owned(),
            });
            None
        }
    }
}

fn compile_suppression_mode(
    raw: Option<&str>,
    path: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SuppressionMode> {
    match raw {
        None => Some(SuppressionMode::None),
        Some("once_ever") => Some(SuppressionMode::OnceEver),
        Some("once_per_calendar_day") => Some(SuppressionMode::OncePerCalendarDay),
        Some("none") => Some(SuppressionMode::None),
        Some(_) => {
            errors.push(ValidationError::BadSuppressionMode {
                path: path.to_owned(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_rule() -> RuleInput {
        RuleInput {
            name: Some("welcome_email".into()),
            description: None,
            enabled: Some(true),
            trigger_event_type: Some("signup_completed".into()),
            conditions: vec![ConditionInput::Field {
                field: Some("user_traits.marketing_opt_in".into()),
                operator: Some("equals".into()),
                value: Some(serde_json::json!(true)),
            }],
            action_type: Some("send".into()),
            action_template_name: Some("WELCOME_EMAIL".into()),
            action_delivery_method: Some("email".into()),
            suppression_mode: Some("once_ever".into()),
        }
    }

    #[test]
    fn valid_catalog_compiles() {
        let catalog = RuleCatalog::validate(vec![valid_rule()]).unwrap();
        assert_eq!(catalog.rules().len(), 1);
        assert_eq!(catalog.rules()[0].name, "welcome_email");
    }

    #[test]
    fn missing_name_is_collected_not_fatal_alone() {
        let mut rule = valid_rule();
        rule.name = None;
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert!(matches!(err[0], ValidationError::MissingName { .. }));
    }

    #[test]
    fn all_errors_collected_in_one_pass() {
        let mut rule = valid_rule();
        rule.name = None;
        rule.trigger_event_type = None;
        rule.action_template_name = None;
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert_eq!(err.len(), 3);
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = RuleCatalog::validate(vec![valid_rule(), valid_rule()]).unwrap_err();
        assert!(matches!(err[0], ValidationError::DuplicateName { .. }));
    }

    #[test]
    fn field_prefix_enforced() {
        let mut rule = valid_rule();
        rule.conditions = vec![ConditionInput::Field {
            field: Some("event.user_id".into()),
            operator: Some("equals".into()),
            value: Some(serde_json::json!("x")),
        }];
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert!(matches!(err[0], ValidationError::BadFieldPrefix { .. }));
    }

    #[test]
    fn ambiguous_condition_rejected() {
        let mut rule = valid_rule();
        rule.conditions = vec![ConditionInput::Malformed {
            has_field: true,
            has_prior_event: true,
        }];
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert!(matches!(err[0], ValidationError::AmbiguousCondition { .. }));
    }

    #[test]
    fn alert_requires_internal_delivery() {
        let mut rule = valid_rule();
        rule.action_type = Some("alert".into());
        rule.action_delivery_method = Some("email".into());
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert!(matches!(err[0], ValidationError::AlertRequiresInternal { .. }));
    }

    #[test]
    fn alert_with_internal_delivery_is_valid() {
        let mut rule = valid_rule();
        rule.action_type = Some("alert".into());
        rule.action_delivery_method = Some("internal".into());
        let catalog = RuleCatalog::validate(vec![rule]).unwrap();
        assert_eq!(catalog.rules()[0].action.action_type, ActionType::Alert);
    }

    #[test]
    fn suppression_defaults_to_none_when_omitted() {
        let mut rule = valid_rule();
        rule.suppression_mode = None;
        let catalog = RuleCatalog::validate(vec![rule]).unwrap();
        assert_eq!(catalog.rules()[0].suppression.mode, SuppressionMode::None);
    }

    #[test]
    fn unknown_suppression_mode_rejected() {
        let mut rule = valid_rule();
        rule.suppression_mode = Some("hourly".into());
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert!(matches!(err[0], ValidationError::BadSuppressionMode { .. }));
    }

    #[test]
    fn prior_event_hours_must_be_positive() {
        let mut rule = valid_rule();
        rule.conditions = vec![ConditionInput::PriorEvent {
            event_type: Some("signup_completed".into()),
            hours: Some(0),
        }];
        let err = RuleCatalog::validate(vec![rule]).unwrap_err();
        assert!(matches!(err[0], ValidationError::BadPriorEventHours { .. }));
    }

    #[test]
    fn empty_conditions_all_is_valid() {
        let mut rule = valid_rule();
        rule.conditions = vec![];
        let catalog = RuleCatalog::validate(vec![rule]).unwrap();
        assert!(catalog.rules()[0].conditions.is_empty());
    }
}
