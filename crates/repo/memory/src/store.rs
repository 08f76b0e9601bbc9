use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use nudge_core::{Decision, Event, SendRequest, Suppression};
use nudge_repo::{RepoError, RepoFactory, RepoTransaction};

use crate::transaction::MemoryTransaction;

/// Backing storage shared by every transaction opened against a
/// [`MemoryRepoFactory`]. `DashMap` gives us lock-free reads across
/// concurrent transactions; the transaction itself provides the
/// commit/rollback boundary by staging writes locally until `commit`.
#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) events: DashMap<String, Event>,
    pub(crate) events_by_user: DashMap<String, Vec<String>>,
    pub(crate) send_requests: DashMap<String, SendRequest>,
    pub(crate) send_requests_by_user: DashMap<String, Vec<String>>,
    pub(crate) suppressions: DashMap<String, Suppression>,
    pub(crate) suppressions_by_user: DashMap<String, Vec<String>>,
    pub(crate) decisions: DashMap<String, Decision>,
    pub(crate) decisions_by_user: DashMap<String, Vec<String>>,
}

/// In-memory repository backend. Suitable for development and tests; state
/// does not survive process restart.
pub struct MemoryRepoFactory {
    inner: Arc<Inner>,
}

impl MemoryRepoFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }
}

impl Default for MemoryRepoFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepoFactory for MemoryRepoFactory {
    async fn begin(&self) -> Result<Box<dyn RepoTransaction>, RepoError> {
        Ok(Box::new(MemoryTransaction::new(Arc::clone(&self.inner))))
    }
}
