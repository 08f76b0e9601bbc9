use serde::Deserialize;

/// Which repository backend to open at startup.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepoBackend {
    #[default]
    Memory,
    Postgres,
}

/// Repository backend selection, plus the connection settings for the
/// Postgres sub-table.
#[derive(Debug, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub backend: RepoBackend,
    #[serde(default)]
    pub postgres: PostgresSubConfig,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            backend: RepoBackend::default(),
            postgres: PostgresSubConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PostgresSubConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
}

impl Default for PostgresSubConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            pool_size: default_pool_size(),
            schema: default_schema(),
            table_prefix: default_table_prefix(),
        }
    }
}

fn default_url() -> String {
    "postgres://localhost:5432/nudge".to_owned()
}

fn default_pool_size() -> u32 {
    5
}

fn default_schema() -> String {
    "public".to_owned()
}

fn default_table_prefix() -> String {
    "nudge_".to_owned()
}
