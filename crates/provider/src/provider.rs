use async_trait::async_trait;
use nudge_core::outcome::Channel;

use crate::error::ProviderError;

/// A single outbound dispatch, fully resolved by the gateway before the
/// provider ever sees it.
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub user_id: String,
    pub template_name: String,
    pub channel: Channel,
    /// Pre-rendered message body. Template rendering itself is out of scope;
    /// the gateway passes the template name through verbatim as the text.
    pub text: String,
    pub reason: String,
}

/// External messaging capability invoked for `allow` and `alert` outcomes.
///
/// Invoked inside the same transaction as the rest of event processing: a
/// provider error aborts the transaction, so no `SendRequest` or `Decision`
/// row is left describing a dispatch that never happened.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    async fn send_message(&self, message: SendMessage) -> Result<(), ProviderError>;
}
