use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::ProviderError;
use crate::provider::{MessagingProvider, SendMessage};

/// Reference messaging provider: appends one line per dispatch to a local
/// file.
///
/// Appends are serialized behind a single writer lock so concurrent
/// dispatches never interleave partial lines; this is the only shared
/// mutable state a `FileLogProvider` holds.
pub struct FileLogProvider {
    path: PathBuf,
    writer: Mutex<()>,
}

impl FileLogProvider {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }
}

#[async_trait]
impl MessagingProvider for FileLogProvider {
    async fn send_message(&self, message: SendMessage) -> Result<(), ProviderError> {
        let line = format!(
            "user_id={} | template={} | channel={} | text={} | reason={}\n",
            message.user_id, message.template_name, message.channel, message.text, message.reason,
        );

        let _guard = self.writer.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| ProviderError::DeliveryFailed(e.to_string()))?;
        Ok(())
    }
}
