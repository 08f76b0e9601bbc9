use serde::Deserialize;

/// Configuration for the append-log messaging provider stub.
#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
    /// Path to the append-log file; one line is written per dispatch.
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
        }
    }
}

fn default_log_path() -> String {
    "messages.log".to_owned()
}
