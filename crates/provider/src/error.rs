use thiserror::Error;

/// Errors that can occur while dispatching a message through a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not write or reach its delivery destination.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The provider was given invalid configuration (e.g. an unwritable path).
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
