use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use nudge_gateway::{AuditProjector, EventProcessor};
use nudge_repo::RepoFactory;
use nudge_repo_memory::MemoryRepoFactory;
use nudge_rules::CatalogEvaluator;
use nudge_rules_yaml::YamlCatalogLoader;
use nudge_server::api::{router, AppState};
use nudge_server::config::{NudgeConfig, RepoBackend};

/// Standalone HTTP server for the decision engine.
#[derive(Parser, Debug)]
#[command(name = "nudge-server", about = "Marketing-messaging decision engine server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "nudge.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config: NudgeConfig = if Path::new(&cli.config).exists() {
        let contents = std::fs::read_to_string(&cli.config)?;
        toml::from_str(&contents)?
    } else {
        info!(path = %cli.config, "config file not found, using defaults");
        toml::from_str("")?
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let catalog = match YamlCatalogLoader::load_file(Path::new(&config.rules.path)) {
        Ok(catalog) => catalog,
        Err(errors) => {
            for error in &errors {
                tracing::error!(path = %config.rules.path, %error, "rule catalog validation failed");
            }
            return Err(format!(
                "refusing to start: {} error(s) in rule catalog {}",
                errors.len(),
                config.rules.path
            )
            .into());
        }
    };
    info!(path = %config.rules.path, rules = catalog.rules().len(), "loaded rule catalog");

    let repo: Arc<dyn RepoFactory> = match config.repo.backend {
        RepoBackend::Memory => {
            info!("using in-memory repository backend");
            Arc::new(MemoryRepoFactory::new())
        }
        RepoBackend::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let pg_config = nudge_repo_postgres::PostgresConfig {
                    url: config.repo.postgres.url.clone(),
                    pool_size: config.repo.postgres.pool_size,
                    schema: config.repo.postgres.schema.clone(),
                    table_prefix: config.repo.postgres.table_prefix.clone(),
                    ssl_mode: None,
                    ssl_root_cert: None,
                };
                info!(schema = %pg_config.schema, "using postgres repository backend");
                Arc::new(nudge_repo_postgres::PostgresRepoFactory::new(pg_config).await?)
            }
            #[cfg(not(feature = "postgres"))]
            {
                return Err("postgres backend selected but this binary was built without the \"postgres\" feature".into());
            }
        }
    };

    let evaluator = Arc::new(CatalogEvaluator::new(catalog));
    let provider = Arc::new(nudge_provider::FileLogProvider::new(
        config.provider.log_path.clone(),
    ));

    let processor = Arc::new(EventProcessor::new(
        Arc::clone(&repo),
        evaluator,
        provider,
    ));
    let projector = Arc::new(AuditProjector::new(Arc::clone(&repo)));

    let state = AppState {
        processor,
        projector,
    };

    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "nudge-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("nudge-server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
