use thiserror::Error;

/// Errors that can occur while processing a single event through the
/// gateway pipeline.
///
/// Every variant here aborts the event's transaction: repository failures
/// and messaging-provider failures are both grounds for rollback, so no
/// partial `Decision` row is ever left behind.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("repository error: {0}")]
    Repo(#[from] nudge_repo::RepoError),

    #[error("rule evaluation error: {0}")]
    Eval(#[from] nudge_rules::EvalError),

    #[error("messaging provider error: {0}")]
    Provider(#[from] nudge_provider::ProviderError),
}
