//! Journal Query server binary.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use journal_query::collab::locale::StaticLocaleService;
use journal_query::config::Config;
use journal_query::db::{self, SqliteRepository};
use journal_query::observe::TracingObserver;
use journal_query::query::QueryService;
use journal_query::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting journal query service");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        default_locale = %config.default_locale,
        failure_policy = ?config.failure_policy,
        version_policy = ?config.version_policy,
        "Query settings"
    );

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(SqliteRepository::new(pool));

    let shutdown = CancellationToken::new();
    let service = QueryService::new(
        repo.clone(),
        repo,
        Arc::new(StaticLocaleService::new(config.available_locales.clone())),
        Arc::new(TracingObserver),
        config.query_settings(),
    )
    .with_shutdown(shutdown.clone());

    let state = AppState {
        service: Arc::new(service),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown requested, cancelling in-flight queries");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
