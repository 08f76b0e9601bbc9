use thiserror::Error;

/// Failure modes surfaced by any repository backend.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("transaction already completed")]
    TransactionClosed,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
