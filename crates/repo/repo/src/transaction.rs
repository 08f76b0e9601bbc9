use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nudge_core::{Decision, Event, SendRequest, Suppression};

use crate::error::RepoError;

/// A unit of work spanning the event, send-request, suppression and decision
/// stores.
///
/// A transaction is opened by [`RepoFactory::begin`] and must be ended with
/// exactly one of [`commit`](RepoTransaction::commit) or
/// [`rollback`](RepoTransaction::rollback). Dropping a transaction without
/// calling either leaves the backend to discard any staged writes; backends
/// must never surface a half-applied transaction to a reader.
///
/// The four read/write groups below correspond to the event, send-request,
/// suppression and decision repository contracts. They are folded into one
/// trait because every write in this system happens inside a single
/// transaction shared by all four stores — there is no caller that needs
/// only one of them transactionally isolated from the others.
#[async_trait]
pub trait RepoTransaction: Send {
    // -- events --------------------------------------------------------

    async fn add_event(&mut self, event: Event) -> Result<Event, RepoError>;

    async fn get_event_by_id(&mut self, event_id: &str) -> Result<Option<Event>, RepoError>;

    /// All events recorded for `user_id`, by `event_timestamp` descending.
    async fn list_events_by_user(&mut self, user_id: &str) -> Result<Vec<Event>, RepoError>;

    /// Most recent event of `event_type` recorded for `user_id`, by
    /// `event_timestamp` descending (not restricted to before the current
    /// event). Backs the `prior_event` condition.
    async fn latest_event_by_user_and_type(
        &mut self,
        user_id: &str,
        event_type: &str,
    ) -> Result<Option<Event>, RepoError>;

    // -- send requests ---------------------------------------------------

    async fn add_send_request(&mut self, send_request: SendRequest) -> Result<SendRequest, RepoError>;

    /// Backs `suppression_mode: once_ever`.
    async fn send_request_exists_for_user_and_template(
        &mut self,
        user_id: &str,
        template_name: &str,
    ) -> Result<bool, RepoError>;

    /// Backs `suppression_mode: once_per_calendar_day`. `provided_ts` is the
    /// triggering event's own timestamp; the window is the UTC calendar day
    /// containing it, with both boundaries excluded. Rows whose
    /// `event_timestamp` is `None` never count.
    async fn send_request_exists_in_day_so_far(
        &mut self,
        user_id: &str,
        template_name: &str,
        provided_ts: DateTime<Utc>,
    ) -> Result<bool, RepoError>;

    async fn list_send_requests_by_user(&mut self, user_id: &str) -> Result<Vec<SendRequest>, RepoError>;

    // -- suppressions ----------------------------------------------------

    async fn add_suppression(&mut self, suppression: Suppression) -> Result<Suppression, RepoError>;

    async fn list_suppressions_by_user(&mut self, user_id: &str) -> Result<Vec<Suppression>, RepoError>;

    // -- decisions ---------------------------------------------------------

    async fn add_decision(&mut self, decision: Decision) -> Result<Decision, RepoError>;

    async fn list_decisions_by_user(&mut self, user_id: &str) -> Result<Vec<Decision>, RepoError>;

    /// Consumes and commits the transaction, making every write visible to
    /// subsequent reads.
    async fn commit(self: Box<Self>) -> Result<(), RepoError>;

    /// Consumes and discards the transaction. Called when any step of event
    /// processing fails after staging writes, including provider dispatch
    /// failure.
    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}

/// Opens transactions against a concrete backend (in-memory or Postgres).
///
/// Boxed rather than generic so a server can pick its backend at startup
/// from configuration and hand callers a single `Arc<dyn RepoFactory>`.
#[async_trait]
pub trait RepoFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RepoTransaction>, RepoError>;
}
