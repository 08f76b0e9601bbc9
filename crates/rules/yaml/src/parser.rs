use serde_yaml_ng::Mapping;
use serde_yaml_ng::Value;

use nudge_rules::{ConditionInput, RuleInput};

pub(crate) fn read_str(mapping: &Mapping, key: &str) -> Option<String> {
    mapping
        .get(key)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

pub(crate) fn read_bool(mapping: &Mapping, key: &str) -> Option<bool> {
    mapping.get(key).and_then(Value::as_bool)
}

pub(crate) fn read_i64(mapping: &Mapping, key: &str) -> Option<i64> {
    mapping.get(key).and_then(Value::as_i64)
}

/// Extract a `RuleInput` from a rule's YAML mapping, pulling each field out
/// loosely (a field with the wrong shape resolves to `None` rather than
/// aborting the whole document) so validation can name exactly which
/// fields are missing or malformed.
pub(crate) fn extract_rule_input(mapping: &Mapping) -> RuleInput {
    let trigger_event_type = mapping
        .get("trigger")
        .and_then(Value::as_mapping)
        .and_then(|t| read_str(t, "event_type"));

    let conditions = mapping
        .get("conditions")
        .and_then(Value::as_mapping)
        .and_then(|c| c.get("all"))
        .and_then(Value::as_sequence)
        .map(|seq| seq.iter().map(extract_condition_input).collect())
        .unwrap_or_default();

    let action = mapping.get("action").and_then(Value::as_mapping);
    let action_type = action.and_then(|a| read_str(a, "type"));
    let action_template_name = action.and_then(|a| read_str(a, "template_name"));
    let action_delivery_method = action.and_then(|a| read_str(a, "delivery_method"));

    let suppression_mode = mapping
        .get("suppression")
        .and_then(Value::as_mapping)
        .and_then(|s| read_str(s, "mode"));

    RuleInput {
        name: read_str(mapping, "name"),
        description: read_str(mapping, "description"),
        enabled: read_bool(mapping, "enabled"),
        trigger_event_type,
        conditions,
        action_type,
        action_template_name,
        action_delivery_method,
        suppression_mode,
    }
}

fn extract_condition_input(raw: &Value) -> ConditionInput {
    let Some(mapping) = raw.as_mapping() else {
        return ConditionInput::Malformed {
            has_field: false,
            has_prior_event: false,
        };
    };

    let has_field = mapping.contains_key("field");
    let has_prior_event = mapping.contains_key("prior_event");

    if has_field && has_prior_event {
        return ConditionInput::Malformed {
            has_field: true,
            has_prior_event: true,
        };
    }

    if has_field {
        return ConditionInput::Field {
            field: read_str(mapping, "field"),
            operator: read_str(mapping, "operator"),
            value: mapping.get("value").map(value_to_json),
        };
    }

    if has_prior_event {
        let prior = mapping.get("prior_event").and_then(Value::as_mapping);
        return ConditionInput::PriorEvent {
            event_type: prior.and_then(|p| read_str(p, "event_type")),
            hours: prior.and_then(|p| read_i64(p, "hours")),
        };
    }

    ConditionInput::Malformed {
        has_field: false,
        has_prior_event: false,
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
