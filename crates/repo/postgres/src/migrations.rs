use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Run database migrations, creating required tables if they do not exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let events_table = config.events_table();
    let send_requests_table = config.send_requests_table();
    let suppressions_table = config.suppressions_table();
    let decisions_table = config.decisions_table();

    let create_events = format!(
        "CREATE TABLE IF NOT EXISTS {events_table} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            event_timestamp TIMESTAMPTZ NOT NULL,
            properties JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL,
            has_traits BOOLEAN NOT NULL DEFAULT false,
            trait_email TEXT,
            trait_country TEXT,
            trait_marketing_opt_in BOOLEAN,
            trait_risk_segment TEXT
        )"
    );
    let create_events_user_idx = format!(
        "CREATE INDEX IF NOT EXISTS {}events_user_type_idx ON {events_table} (user_id, event_type, event_timestamp)",
        config.table_prefix
    );

    let create_send_requests = format!(
        "CREATE TABLE IF NOT EXISTS {send_requests_table} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            event_id TEXT,
            event_timestamp TIMESTAMPTZ,
            template_name TEXT NOT NULL,
            channel TEXT NOT NULL,
            reason TEXT NOT NULL,
            decided_at TIMESTAMPTZ NOT NULL
        )"
    );
    let create_send_requests_idx = format!(
        "CREATE INDEX IF NOT EXISTS {}send_requests_user_template_idx ON {send_requests_table} (user_id, template_name)",
        config.table_prefix
    );

    let create_suppressions = format!(
        "CREATE TABLE IF NOT EXISTS {suppressions_table} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            event_id TEXT,
            template_name TEXT NOT NULL,
            suppression_reason TEXT NOT NULL,
            decided_at TIMESTAMPTZ NOT NULL
        )"
    );
    let create_suppressions_idx = format!(
        "CREATE INDEX IF NOT EXISTS {}suppressions_user_idx ON {suppressions_table} (user_id)",
        config.table_prefix
    );

    let create_decisions = format!(
        "CREATE TABLE IF NOT EXISTS {decisions_table} (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            event_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            matched_rule TEXT,
            action_type TEXT NOT NULL,
            outcome TEXT NOT NULL,
            reason TEXT NOT NULL,
            template_name TEXT,
            channel TEXT,
            created_at TIMESTAMPTZ NOT NULL
        )"
    );
    let create_decisions_idx = format!(
        "CREATE INDEX IF NOT EXISTS {}decisions_user_created_idx ON {decisions_table} (user_id, created_at)",
        config.table_prefix
    );

    sqlx::query(&create_events).execute(pool).await?;
    sqlx::query(&create_events_user_idx).execute(pool).await?;
    sqlx::query(&create_send_requests).execute(pool).await?;
    sqlx::query(&create_send_requests_idx).execute(pool).await?;
    sqlx::query(&create_suppressions).execute(pool).await?;
    sqlx::query(&create_suppressions_idx).execute(pool).await?;
    sqlx::query(&create_decisions).execute(pool).await?;
    sqlx::query(&create_decisions_idx).execute(pool).await?;

    Ok(())
}
