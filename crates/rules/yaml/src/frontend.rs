use std::path::Path;

use nudge_rules::{RuleCatalog, RuleInput, ValidationError};
use serde_yaml_ng::Value;

use crate::parser::extract_rule_input;

/// Loads a rule-catalog document from a YAML string or file and compiles
/// it into a frozen [`RuleCatalog`].
///
/// Every validation error found across the whole document is returned
/// together — the catalog either loads cleanly or not at all, since the
/// process refuses to start on any invalid rule.
pub struct YamlCatalogLoader;

impl YamlCatalogLoader {
    /// # Errors
    ///
    /// Returns every [`ValidationError`] found in `content`.
    pub fn load(content: &str) -> Result<RuleCatalog, Vec<ValidationError>> {
        let document: Value = serde_yaml_ng::from_str(content)
            .map_err(|e| vec![ValidationError::DocumentParse(e.to_string())])?;

        let root = document
            .as_mapping()
            .ok_or_else(|| vec![ValidationError::RootNotAMapping])?;

        let rules_seq = root
            .get("rules")
            .and_then(Value::as_sequence)
            .ok_or_else(|| vec![ValidationError::RulesNotAList])?;

        let mut structural_errors = Vec::new();
        let mut inputs: Vec<RuleInput> = Vec::with_capacity(rules_seq.len());

        for (idx, raw) in rules_seq.iter().enumerate() {
            match raw.as_mapping() {
                Some(mapping) => inputs.push(extract_rule_input(mapping)),
                None => {
                    structural_errors.push(ValidationError::NotAMapping {
                        path: format!("rules[{idx}]"),
                    });
                    inputs.push(RuleInput::default());
                }
            }
        }

        match RuleCatalog::validate(inputs) {
            Ok(catalog) if structural_errors.is_empty() => Ok(catalog),
            Ok(_) => Err(structural_errors),
            Err(mut validation_errors) => {
                structural_errors.append(&mut validation_errors);
                Err(structural_errors)
            }
        }
    }

    /// # Errors
    ///
    /// Returns a single [`ValidationError::DocumentParse`] if the file
    /// cannot be read, or every validation error found in its contents.
    pub fn load_file(path: &Path) -> Result<RuleCatalog, Vec<ValidationError>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            vec![ValidationError::DocumentParse(format!(
                "cannot read {}: {e}",
                path.display()
            ))]
        })?;
        Self::load(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_DOC: &str = r"
rules:
  - name: welcome_email
    trigger:
      event_type: signup_completed
    conditions:
      all:
        - field: user_traits.marketing_opt_in
          operator: equals
          value: true
    action:
      type: send
      template_name: WELCOME_EMAIL
      delivery_method: email
    suppression:
      mode: once_ever
";

    #[test]
    fn loads_valid_document() {
        let catalog = YamlCatalogLoader::load(VALID_DOC).unwrap();
        assert_eq!(catalog.rules().len(), 1);
        assert_eq!(catalog.rules()[0].name, "welcome_email");
    }

    #[test]
    fn rejects_missing_rules_key() {
        let err = YamlCatalogLoader::load("not_rules: []").unwrap_err();
        assert!(matches!(err[0], ValidationError::RulesNotAList));
    }

    #[test]
    fn rejects_non_mapping_root() {
        let err = YamlCatalogLoader::load("- just\n- a\n- list").unwrap_err();
        assert!(matches!(err[0], ValidationError::RootNotAMapping));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = YamlCatalogLoader::load(": not: valid: yaml:").unwrap_err();
        assert!(matches!(err[0], ValidationError::DocumentParse(_)));
    }

    #[test]
    fn collects_every_error_in_one_pass() {
        let doc = r"
rules:
  - trigger:
      event_type: signup_completed
    action:
      type: send
      delivery_method: email
  - name: dup
    trigger:
      event_type: x
    action:
      type: send
      template_name: T
      delivery_method: email
  - name: dup
    trigger:
      event_type: x
    action:
      type: send
      template_name: T
      delivery_method: email
";
        let errors = YamlCatalogLoader::load(doc).unwrap_err();
        // Missing name + missing template_name on rule 0, duplicate name
        // across rules 1 and 2.
        assert!(errors.len() >= 3);
    }

    #[test]
    fn prior_event_condition_round_trips() {
        let doc = r"
rules:
  - name: bank_link_nudge
    trigger:
      event_type: link_bank_success
    conditions:
      all:
        - prior_event:
            event_type: signup_completed
            hours: 24
    action:
      type: send
      template_name: BANK_LINK_NUDGE_SMS
      delivery_method: sms
";
        let catalog = YamlCatalogLoader::load(doc).unwrap();
        assert_eq!(catalog.rules()[0].conditions.len(), 1);
    }

    #[test]
    fn suppression_defaults_when_omitted() {
        let doc = r"
rules:
  - name: high_risk_alert
    trigger:
      event_type: payment_failed
    conditions:
      all:
        - field: properties.attempt_number
          operator: gte
          value: 3
    action:
      type: alert
      template_name: HIGH_RISK_ALERT
      delivery_method: internal
";
        let catalog = YamlCatalogLoader::load(doc).unwrap();
        assert_eq!(
            catalog.rules()[0].suppression.mode,
            nudge_core::outcome::SuppressionMode::None
        );
    }
}
