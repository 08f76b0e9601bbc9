use serde::Deserialize;

/// Rule-catalog loading configuration.
#[derive(Debug, Deserialize)]
pub struct RulesConfig {
    /// Path to the YAML rule catalog document, loaded once at startup.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

fn default_path() -> String {
    "rules.yaml".to_owned()
}
