mod error;
mod file_log;
mod provider;

pub use error::ProviderError;
pub use file_log::FileLogProvider;
pub use provider::{MessagingProvider, SendMessage};
