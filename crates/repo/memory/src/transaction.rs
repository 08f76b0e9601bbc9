use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nudge_core::{Decision, Event, SendRequest, Suppression};
use nudge_repo::{RepoError, RepoTransaction};

use crate::store::Inner;

/// A transaction against [`MemoryRepoFactory`](crate::MemoryRepoFactory).
///
/// Writes are staged locally and only folded into the shared `DashMap`s on
/// [`commit`](RepoTransaction::commit), so a transaction that is rolled back
/// (or simply dropped) leaves no trace in the backing store. Reads within
/// the transaction see both the shared store and this transaction's own
/// staged writes, giving read-your-own-writes within the unit of work.
pub(crate) struct MemoryTransaction {
    inner: Arc<Inner>,
    staged_events: Vec<Event>,
    staged_send_requests: Vec<SendRequest>,
    staged_suppressions: Vec<Suppression>,
    staged_decisions: Vec<Decision>,
}

impl MemoryTransaction {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            staged_events: Vec::new(),
            staged_send_requests: Vec::new(),
            staged_suppressions: Vec::new(),
            staged_decisions: Vec::new(),
        }
    }

    fn visible_events_by_user(&self, user_id: &str) -> Vec<Event> {
        let mut out: Vec<Event> = self
            .inner
            .events_by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.inner.events.get(id).map(|e| e.value().clone()))
                    .collect()
            })
            .unwrap_or_default();
        out.extend(
            self.staged_events
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned(),
        );
        out
    }

    fn visible_send_requests_by_user(&self, user_id: &str) -> Vec<SendRequest> {
        let mut out: Vec<SendRequest> = self
            .inner
            .send_requests_by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.inner.send_requests.get(id).map(|s| s.value().clone()))
                    .collect()
            })
            .unwrap_or_default();
        out.extend(
            self.staged_send_requests
                .iter()
                .filter(|s| s.user_id == user_id)
                .cloned(),
        );
        out
    }
}

#[async_trait]
impl RepoTransaction for MemoryTransaction {
    async fn add_event(&mut self, event: Event) -> Result<Event, RepoError> {
        self.staged_events.push(event.clone());
        Ok(event)
    }

    async fn get_event_by_id(&mut self, event_id: &str) -> Result<Option<Event>, RepoError> {
        if let Some(e) = self.staged_events.iter().find(|e| e.id == event_id) {
            return Ok(Some(e.clone()));
        }
        Ok(self.inner.events.get(event_id).map(|e| e.value().clone()))
    }

    async fn list_events_by_user(&mut self, user_id: &str) -> Result<Vec<Event>, RepoError> {
        let mut rows = self.visible_events_by_user(user_id);
        rows.sort_by_key(|e| e.event_timestamp);
        rows.reverse();
        Ok(rows)
    }

    async fn latest_event_by_user_and_type(
        &mut self,
        user_id: &str,
        event_type: &str,
    ) -> Result<Option<Event>, RepoError> {
        let latest = self
            .visible_events_by_user(user_id)
            .into_iter()
            .filter(|e| e.event_type == event_type)
            .max_by_key(|e| e.event_timestamp);
        Ok(latest)
    }

    async fn add_send_request(
        &mut self,
        send_request: SendRequest,
    ) -> Result<SendRequest, RepoError> {
        self.staged_send_requests.push(send_request.clone());
        Ok(send_request)
    }

    async fn send_request_exists_for_user_and_template(
        &mut self,
        user_id: &str,
        template_name: &str,
    ) -> Result<bool, RepoError> {
        Ok(self
            .visible_send_requests_by_user(user_id)
            .into_iter()
            .any(|s| s.template_name == template_name))
    }

    async fn send_request_exists_in_day_so_far(
        &mut self,
        user_id: &str,
        template_name: &str,
        provided_ts: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let day_start =
            Utc.from_utc_datetime(&provided_ts.date_naive().and_hms_opt(0, 0, 0).unwrap());
        Ok(self
            .visible_send_requests_by_user(user_id)
            .into_iter()
            .any(|s| {
                s.template_name == template_name
                    && s.event_timestamp.is_some_and(|ts| ts > day_start && ts < provided_ts)
            }))
    }

    async fn list_send_requests_by_user(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<SendRequest>, RepoError> {
        let mut rows = self.visible_send_requests_by_user(user_id);
        rows.sort_by_key(|s| s.decided_at);
        Ok(rows)
    }

    async fn add_suppression(
        &mut self,
        suppression: Suppression,
    ) -> Result<Suppression, RepoError> {
        self.staged_suppressions.push(suppression.clone());
        Ok(suppression)
    }

    async fn list_suppressions_by_user(
        &mut self,
        user_id: &str,
    ) -> Result<Vec<Suppression>, RepoError> {
        let mut out: Vec<Suppression> = self
            .inner
            .suppressions_by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.inner.suppressions.get(id).map(|s| s.value().clone()))
                    .collect()
            })
            .unwrap_or_default();
        out.extend(
            self.staged_suppressions
                .iter()
                .filter(|s| s.user_id == user_id)
                .cloned(),
        );
        out.sort_by_key(|s| s.decided_at);
        Ok(out)
    }

    async fn add_decision(&mut self, decision: Decision) -> Result<Decision, RepoError> {
        self.staged_decisions.push(decision.clone());
        Ok(decision)
    }

    async fn list_decisions_by_user(&mut self, user_id: &str) -> Result<Vec<Decision>, RepoError> {
        let mut out: Vec<Decision> = self
            .inner
            .decisions_by_user
            .get(user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.inner.decisions.get(id).map(|d| d.value().clone()))
                    .collect()
            })
            .unwrap_or_default();
        out.extend(
            self.staged_decisions
                .iter()
                .filter(|d| d.user_id == user_id)
                .cloned(),
        );
        out.sort_by_key(|d| d.created_at);
        Ok(out)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        for event in self.staged_events {
            self.inner
                .events_by_user
                .entry(event.user_id.clone())
                .or_default()
                .push(event.id.clone());
            self.inner.events.insert(event.id.clone(), event);
        }
        for send_request in self.staged_send_requests {
            self.inner
                .send_requests_by_user
                .entry(send_request.user_id.clone())
                .or_default()
                .push(send_request.id.clone());
            self.inner
                .send_requests
                .insert(send_request.id.clone(), send_request);
        }
        for suppression in self.staged_suppressions {
            self.inner
                .suppressions_by_user
                .entry(suppression.user_id.clone())
                .or_default()
                .push(suppression.id.clone());
            self.inner
                .suppressions
                .insert(suppression.id.clone(), suppression);
        }
        for decision in self.staged_decisions {
            self.inner
                .decisions_by_user
                .entry(decision.user_id.clone())
                .or_default()
                .push(decision.id.clone());
            self.inner.decisions.insert(decision.id.clone(), decision);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        // Staged writes simply never reach the shared maps.
        Ok(())
    }
}
