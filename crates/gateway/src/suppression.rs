use chrono::{DateTime, Utc};
use nudge_core::{ActionType, Outcome, RuleDecision, SuppressionMode};
use nudge_repo::RepoTransaction;

use crate::error::GatewayError;

/// Per-template send-frequency veto, applied after the rule evaluator has
/// already decided *what* to send but before anything is dispatched.
///
/// Alerts always bypass suppression — an operator must be notified
/// regardless of how often the same template would otherwise fire.
pub struct SuppressionGate;

impl SuppressionGate {
    /// Evaluate the suppression decision table for a `RuleDecision` already
    /// produced by the rule evaluator.
    ///
    /// `event_timestamp` anchors the `once_per_calendar_day` window; it is
    /// the triggering event's own timestamp, not the current time.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Repo`] if a `SendRequest` existence lookup
    /// fails.
    pub async fn evaluate(
        repo: &mut dyn RepoTransaction,
        user_id: &str,
        decision: &RuleDecision,
        event_timestamp: DateTime<Utc>,
    ) -> Result<(Outcome, Option<String>), GatewayError> {
        match decision.action_type {
            ActionType::None => Ok((Outcome::None, None)),
            ActionType::Alert => Ok((Outcome::Alert, None)),
            ActionType::Send => {
                let mode = decision.suppression_mode.unwrap_or(SuppressionMode::None);
                let template_name = decision.template_name.as_deref().unwrap_or_default();

                match mode {
                    SuppressionMode::None => Ok((Outcome::Allow, None)),
                    SuppressionMode::OnceEver => {
                        let exists = repo
                            .send_request_exists_for_user_and_template(user_id, template_name)
                            .await?;
                        if exists {
                            Ok((Outcome::Suppress, Some("once_ever".to_owned())))
                        } else {
                            Ok((Outcome::Allow, None))
                        }
                    }
                    SuppressionMode::OncePerCalendarDay => {
                        let exists = repo
                            .send_request_exists_in_day_so_far(
                                user_id,
                                template_name,
                                event_timestamp,
                            )
                            .await?;
                        if exists {
                            Ok((
                                Outcome::Suppress,
                                Some("once_per_calendar_day".to_owned()),
                            ))
                        } else {
                            Ok((Outcome::Allow, None))
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use nudge_core::Channel;
    use nudge_repo::{RepoFactory, RepoTransaction};
    use nudge_repo_memory::MemoryRepoFactory;

    use super::*;

    fn decision(mode: SuppressionMode) -> RuleDecision {
        RuleDecision {
            action_type: ActionType::Send,
            template_name: Some("WELCOME_EMAIL".to_owned()),
            delivery_method: Some(Channel::Email),
            suppression_mode: Some(mode),
            matched_rule: Some("welcome".to_owned()),
            reason: "Matched rule: welcome".to_owned(),
        }
    }

    #[tokio::test]
    async fn none_action_type_never_suppresses() {
        let factory = MemoryRepoFactory::new();
        let mut txn = factory.begin().await.unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let (outcome, reason) = SuppressionGate::evaluate(
            txn.as_mut(),
            "user-1",
            &RuleDecision::no_match(),
            ts,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::None);
        assert!(reason.is_none());
    }

    #[tokio::test]
    async fn alert_always_bypasses_suppression() {
        let factory = MemoryRepoFactory::new();
        let mut txn = factory.begin().await.unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let mut d = decision(SuppressionMode::OnceEver);
        d.action_type = ActionType::Alert;
        let (outcome, reason) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, ts)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Alert);
        assert!(reason.is_none());
    }

    #[tokio::test]
    async fn once_ever_allows_first_send_then_suppresses() {
        let factory = MemoryRepoFactory::new();
        let mut txn = factory.begin().await.unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let d = decision(SuppressionMode::OnceEver);

        let (outcome, _) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, ts)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Allow);

        txn.add_send_request(nudge_core::SendRequest {
            id: nudge_core::new_id(),
            user_id: "user-1".to_owned(),
            event_id: None,
            event_timestamp: Some(ts),
            template_name: "WELCOME_EMAIL".to_owned(),
            channel: Channel::Email,
            reason: "rule:welcome".to_owned(),
            decided_at: ts,
        })
        .await
        .unwrap();

        let (outcome, reason) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, ts)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Suppress);
        assert_eq!(reason.as_deref(), Some("once_ever"));
    }

    #[tokio::test]
    async fn once_per_calendar_day_resets_the_next_day() {
        let factory = MemoryRepoFactory::new();
        let mut txn = factory.begin().await.unwrap();
        let day1_morning = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let day1_later = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 1, 2, 1, 0, 0).unwrap();
        let d = decision(SuppressionMode::OncePerCalendarDay);

        txn.add_send_request(nudge_core::SendRequest {
            id: nudge_core::new_id(),
            user_id: "user-1".to_owned(),
            event_id: None,
            event_timestamp: Some(day1_morning),
            template_name: "WELCOME_EMAIL".to_owned(),
            channel: Channel::Email,
            reason: "rule:welcome".to_owned(),
            decided_at: day1_morning,
        })
        .await
        .unwrap();

        let (outcome, _) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, day1_later)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Suppress);

        let (outcome, _) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, day2)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Allow);
    }

    #[tokio::test]
    async fn once_per_calendar_day_boundary_is_strict_interior() {
        let factory = MemoryRepoFactory::new();
        let mut txn = factory.begin().await.unwrap();
        let day_start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let d = decision(SuppressionMode::OncePerCalendarDay);

        txn.add_send_request(nudge_core::SendRequest {
            id: nudge_core::new_id(),
            user_id: "user-1".to_owned(),
            event_id: None,
            event_timestamp: Some(day_start),
            template_name: "WELCOME_EMAIL".to_owned(),
            channel: Channel::Email,
            reason: "rule:welcome".to_owned(),
            decided_at: day_start,
        })
        .await
        .unwrap();

        // Existing row sits exactly on the start-of-day boundary; it must not
        // suppress a same-day event, including one at the exact same instant.
        let (outcome, _) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, day_start)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Allow);
    }

    #[tokio::test]
    async fn mode_none_always_allows() {
        let factory = MemoryRepoFactory::new();
        let mut txn = factory.begin().await.unwrap();
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        let d = decision(SuppressionMode::None);
        let (outcome, reason) = SuppressionGate::evaluate(txn.as_mut(), "user-1", &d, ts)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Allow);
        assert!(reason.is_none());
    }
}
