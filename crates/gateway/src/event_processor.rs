use std::sync::Arc;

use nudge_core::{new_id, Channel, Decision, Event, EventIn, Outcome, SendRequest, Suppression};
use nudge_provider::{MessagingProvider, SendMessage};
use nudge_repo::RepoFactory;
use nudge_rules::RuleEvaluator;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::suppression::SuppressionGate;

/// Everything `process_event` decided, returned to the HTTP layer as
/// `EventProcessingResult`.
#[derive(Debug, Clone)]
pub struct ProcessEventResult {
    pub event_id: String,
    pub user_id: String,
    pub event_type: String,
    pub matched_rule: Option<String>,
    pub action_type: nudge_core::ActionType,
    pub template_name: Option<String>,
    pub channel: Option<Channel>,
    pub outcome: Outcome,
    pub reason: String,
}

/// The orchestrator tying the rule evaluator, suppression gate, repository
/// and messaging provider together behind a single transaction per event.
pub struct EventProcessor {
    repo: Arc<dyn RepoFactory>,
    evaluator: Arc<dyn RuleEvaluator>,
    provider: Arc<dyn MessagingProvider>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(
        repo: Arc<dyn RepoFactory>,
        evaluator: Arc<dyn RuleEvaluator>,
        provider: Arc<dyn MessagingProvider>,
    ) -> Self {
        Self {
            repo,
            evaluator,
            provider,
        }
    }

    /// Run the full decision pipeline for one inbound event: persist, evaluate
    /// rules, evaluate suppression, dispatch or suppress, record the audit
    /// `Decision`, commit.
    ///
    /// # Errors
    ///
    /// Rolls back and returns the first [`GatewayError`] hit at any step —
    /// repository, evaluator or provider failure all abort the transaction,
    /// leaving no partial `Decision` row behind.
    pub async fn process_event(&self, payload: EventIn) -> Result<ProcessEventResult, GatewayError> {
        let mut txn = self.repo.begin().await?;

        match self.run(txn.as_mut(), payload).await {
            Ok(result) => {
                txn.commit().await?;
                info!(
                    user_id = %result.user_id,
                    event_type = %result.event_type,
                    outcome = %result.outcome,
                    "event processed"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(error = %err, "event processing failed, rolling back");
                txn.rollback().await?;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        txn: &mut dyn nudge_repo::RepoTransaction,
        payload: EventIn,
    ) -> Result<ProcessEventResult, GatewayError> {
        let raw_event = Event::from_payload(payload, new_id(), chrono::Utc::now());
        let event = txn.add_event(raw_event).await?;

        let traits_ref = event.user_traits.as_ref();
        let decision = self.evaluator.evaluate(txn, &event, traits_ref).await?;

        let (outcome, suppression_reason) =
            SuppressionGate::evaluate(txn, &event.user_id, &decision, event.event_timestamp)
                .await?;

        let channel = match outcome {
            Outcome::Alert => Some(Channel::Internal),
            Outcome::Allow | Outcome::Suppress => decision.delivery_method,
            Outcome::None => None,
        };

        match outcome {
            Outcome::Allow | Outcome::Alert => {
                let resolved_channel = channel.unwrap_or(Channel::Internal);
                let reason = format!(
                    "rule:{}",
                    decision.matched_rule.as_deref().unwrap_or("unknown")
                );
                let template_name = decision.template_name.clone().unwrap_or_default();

                txn.add_send_request(SendRequest {
                    id: new_id(),
                    user_id: event.user_id.clone(),
                    event_id: Some(event.id.clone()),
                    event_timestamp: Some(event.event_timestamp),
                    template_name: template_name.clone(),
                    channel: resolved_channel,
                    reason: reason.clone(),
                    decided_at: chrono::Utc::now(),
                })
                .await?;

                self.provider
                    .send_message(SendMessage {
                        user_id: event.user_id.clone(),
                        template_name,
                        channel: resolved_channel,
                        text: decision.template_name.clone().unwrap_or_default(),
                        reason,
                    })
                    .await?;
            }
            Outcome::Suppress => {
                let template_name = decision.template_name.clone().unwrap_or_default();
                txn.add_suppression(Suppression {
                    id: new_id(),
                    user_id: event.user_id.clone(),
                    event_id: Some(event.id.clone()),
                    template_name,
                    suppression_reason: suppression_reason.clone().unwrap_or_default(),
                    decided_at: chrono::Utc::now(),
                })
                .await?;
            }
            Outcome::None => {}
        }

        let decision_reason = match outcome {
            Outcome::Suppress => suppression_reason.clone().unwrap_or_default(),
            _ => decision.reason.clone(),
        };

        txn.add_decision(Decision {
            id: new_id(),
            user_id: event.user_id.clone(),
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            matched_rule: decision.matched_rule.clone(),
            action_type: decision.action_type,
            outcome,
            reason: decision_reason.clone(),
            template_name: decision.template_name.clone(),
            channel,
            created_at: chrono::Utc::now(),
        })
        .await?;

        Ok(ProcessEventResult {
            event_id: event.id,
            user_id: event.user_id,
            event_type: event.event_type,
            matched_rule: decision.matched_rule,
            action_type: decision.action_type,
            template_name: decision.template_name,
            channel,
            outcome,
            reason: decision_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{TimeZone, Utc};
    use nudge_core::outcome::SuppressionMode;
    use nudge_core::UserTraitsIn;
    use nudge_provider::FileLogProvider;
    use nudge_repo_memory::MemoryRepoFactory;
    use nudge_rules::{CatalogEvaluator, RuleCatalog, RuleInput};
    use nudge_rules_yaml::YamlCatalogLoader;

    use super::*;

    fn welcome_catalog() -> RuleCatalog {
        YamlCatalogLoader::load(
            r"
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
",
        )
        .unwrap()
    }

    fn processor(catalog: RuleCatalog, log_path: &std::path::Path) -> EventProcessor {
        EventProcessor::new(
            Arc::new(MemoryRepoFactory::new()),
            Arc::new(CatalogEvaluator::new(catalog)),
            Arc::new(FileLogProvider::new(log_path.to_path_buf())),
        )
    }

    fn signup_event(user_id: &str, ts: chrono::DateTime<Utc>) -> EventIn {
        EventIn {
            user_id: user_id.to_owned(),
            event_type: "signup_completed".to_owned(),
            event_timestamp: ts,
            properties: Some(HashMap::new()),
            user_traits: Some(UserTraitsIn {
                email: Some("a@example.com".to_owned()),
                country: None,
                marketing_opt_in: Some(true),
                risk_segment: None,
            }),
        }
    }

    #[tokio::test]
    async fn allow_then_suppress_on_repeat() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("messages.log");
        let processor = processor(welcome_catalog(), &log_path);
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let first = processor
            .process_event(signup_event("u1", ts))
            .await
            .unwrap();
        assert_eq!(first.outcome, Outcome::Allow);
        assert_eq!(first.channel, Some(Channel::Email));
        assert_eq!(first.matched_rule.as_deref(), Some("welcome_email"));

        let second = processor
            .process_event(signup_event("u1", ts))
            .await
            .unwrap();
        assert_eq!(second.outcome, Outcome::Suppress);
        assert_eq!(second.reason, "once_ever");
    }

    #[tokio::test]
    async fn unknown_event_type_yields_none_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("messages.log");
        let processor = processor(welcome_catalog(), &log_path);
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let result = processor
            .process_event(EventIn {
                user_id: "u5".to_owned(),
                event_type: "some_unknown_event".to_owned(),
                event_timestamp: ts,
                properties: None,
                user_traits: None,
            })
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::None);
        assert!(result.matched_rule.is_none());
        assert_eq!(result.reason, "No matching rule");
    }

    #[tokio::test]
    async fn alert_action_uses_internal_channel() {
        let catalog = RuleCatalog::validate(vec![RuleInput {
            name: Some("high_risk_alert".to_owned()),
            trigger_event_type: Some("payment_failed".to_owned()),
            conditions: vec![nudge_rules::ConditionInput::Field {
                field: Some("properties.attempt_number".to_owned()),
                operator: Some("gte".to_owned()),
                value: Some(serde_json::json!(3)),
            }],
            action_type: Some("alert".to_owned()),
            action_template_name: Some("HIGH_RISK_ALERT".to_owned()),
            action_delivery_method: Some("internal".to_owned()),
            ..Default::default()
        }])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("messages.log");
        let processor = processor(catalog, &log_path);
        let ts = Utc.with_ymd_and_hms(2025, 1, 4, 0, 0, 0).unwrap();

        let result = processor
            .process_event(EventIn {
                user_id: "u4".to_owned(),
                event_type: "payment_failed".to_owned(),
                event_timestamp: ts,
                properties: Some(HashMap::from([(
                    "attempt_number".to_owned(),
                    serde_json::json!(3),
                )])),
                user_traits: None,
            })
            .await
            .unwrap();

        assert_eq!(result.outcome, Outcome::Alert);
        assert_eq!(result.channel, Some(Channel::Internal));
    }

    #[tokio::test]
    async fn rolled_back_on_provider_failure() {
        struct FailingProvider;

        #[async_trait::async_trait]
        impl MessagingProvider for FailingProvider {
            async fn send_message(
                &self,
                _message: SendMessage,
            ) -> Result<(), nudge_provider::ProviderError> {
                Err(nudge_provider::ProviderError::DeliveryFailed(
                    "boom".to_owned(),
                ))
            }
        }

        let processor = EventProcessor::new(
            Arc::new(MemoryRepoFactory::new()),
            Arc::new(CatalogEvaluator::new(welcome_catalog())),
            Arc::new(FailingProvider),
        );
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        let err = processor.process_event(signup_event("u1", ts)).await;
        assert!(err.is_err());
    }
}
