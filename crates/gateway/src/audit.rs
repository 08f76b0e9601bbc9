use nudge_core::outcome::{ActionType, Channel, Outcome};
use nudge_repo::{RepoError, RepoFactory};

/// One row of a user's audit trail: a flattened, read-only view of a
/// persisted `Decision`.
#[derive(Debug, Clone)]
pub struct AuditLogItem {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Always `"decision"` — the only kind of audit row this system writes.
    pub kind: &'static str,
    pub event_id: String,
    pub user_id: String,
    pub event_type: String,
    pub matched_rule: Option<String>,
    pub action_type: ActionType,
    pub outcome: Outcome,
    pub reason: String,
    pub template_name: Option<String>,
    pub channel: Option<Channel>,
}

/// The read path returned by `GET /audit/{user_id}`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    pub user_id: String,
    pub items: Vec<AuditLogItem>,
}

/// Read-only projection over a user's `Decision` history.
///
/// A thin wrapper around `DecisionRepo::list_by_user`; it never raises for
/// an unknown user, since "no decisions recorded yet" and "user does not
/// exist" are indistinguishable from this side of the repository.
pub struct AuditProjector {
    repo: std::sync::Arc<dyn RepoFactory>,
}

impl AuditProjector {
    #[must_use]
    pub fn new(repo: std::sync::Arc<dyn RepoFactory>) -> Self {
        Self { repo }
    }

    /// # Errors
    ///
    /// Returns [`RepoError`] if the repository lookup itself fails; an
    /// unknown `user_id` is not an error, it yields an empty `items` list.
    pub async fn get_audit_log(&self, user_id: &str) -> Result<AuditLog, RepoError> {
        let mut txn = self.repo.begin().await?;
        let mut decisions = txn.list_decisions_by_user(user_id).await?;
        txn.rollback().await?;

        // Newest-first: the repository contract returns ascending by
        // created_at, so reverse rather than re-query descending.
        decisions.sort_by_key(|d| d.created_at);
        decisions.reverse();

        let items = decisions
            .into_iter()
            .map(|d| AuditLogItem {
                timestamp: d.created_at,
                kind: "decision",
                event_id: d.event_id,
                user_id: d.user_id,
                event_type: d.event_type,
                matched_rule: d.matched_rule,
                action_type: d.action_type,
                outcome: d.outcome,
                reason: d.reason,
                template_name: d.template_name,
                channel: d.channel,
            })
            .collect();

        Ok(AuditLog {
            user_id: user_id.to_owned(),
            items,
        })
    }
}
