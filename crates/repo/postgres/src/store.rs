use std::sync::Arc;

use async_trait::async_trait;
use nudge_repo::{RepoError, RepoFactory, RepoTransaction};
use sqlx::PgPool;

use crate::config::PostgresConfig;
use crate::migrations;
use crate::transaction::PostgresTransaction;

/// Build `PgConnectOptions` from a [`PostgresConfig`], applying SSL settings
/// when configured.
fn build_connect_options(
    config: &PostgresConfig,
) -> Result<sqlx::postgres::PgConnectOptions, RepoError> {
    let mut options: sqlx::postgres::PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| RepoError::Backend(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => sqlx::postgres::PgSslMode::Disable,
            "prefer" => sqlx::postgres::PgSslMode::Prefer,
            "require" => sqlx::postgres::PgSslMode::Require,
            "verify-ca" => sqlx::postgres::PgSslMode::VerifyCa,
            "verify-full" => sqlx::postgres::PgSslMode::VerifyFull,
            other => return Err(RepoError::Backend(format!("unknown ssl_mode: {other}"))),
        };
        options = options.ssl_mode(ssl_mode);
    }

    if let Some(ref path) = config.ssl_root_cert {
        options = options.ssl_root_cert(path);
    }

    Ok(options)
}

/// `PostgreSQL`-backed repository factory.
///
/// Uses `sqlx::PgPool` for connection pooling; each [`RepoFactory::begin`]
/// call opens one real database transaction, which is committed or rolled
/// back by the returned [`PostgresTransaction`].
pub struct PostgresRepoFactory {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresRepoFactory {
    /// Connect to `PostgreSQL`, build the connection pool, and run
    /// migrations to ensure the required tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] if connecting or migrating fails.
    pub async fn new(config: PostgresConfig) -> Result<Self, RepoError> {
        let connect_options = build_connect_options(&config)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| RepoError::Backend(e.to_string()))?;

        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| RepoError::Backend(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// Build a factory from an existing pool, e.g. one shared with other
    /// subsystems. Runs migrations on creation.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::Backend`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, RepoError> {
        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| RepoError::Backend(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }
}

#[async_trait]
impl RepoFactory for PostgresRepoFactory {
    async fn begin(&self) -> Result<Box<dyn RepoTransaction>, RepoError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Backend(e.to_string()))?;
        Ok(Box::new(PostgresTransaction::new(
            tx,
            Arc::clone(&self.config),
        )))
    }
}
