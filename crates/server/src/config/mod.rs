mod provider;
mod repo;
mod rules;
mod server;

pub use provider::ProviderConfig;
pub use repo::{PostgresSubConfig, RepoBackend, RepoConfig};
pub use rules::RulesConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Top-level configuration for `nudge-server`, loaded from a TOML file.
///
/// Every section defaults independently, so a missing config file (or a
/// config file that only overrides one section) falls back to the rest of
/// these defaults rather than refusing to start.
#[derive(Debug, Default, Deserialize)]
pub struct NudgeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub repo: RepoConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_all_defaults() {
        let config: NudgeConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.repo.backend, RepoBackend::Memory);
        assert_eq!(config.rules.path, "rules.yaml");
        assert_eq!(config.provider.log_path, "messages.log");
    }

    #[test]
    fn partial_document_overrides_only_named_fields() {
        let config: NudgeConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [repo]
            backend = "postgres"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.repo.backend, RepoBackend::Postgres);
        assert_eq!(config.repo.postgres.pool_size, 5);
    }
}
