use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info};

use lectern::adapters::{run_migrations, PostgresSessionStore, RandomCodeGenerator, TopicBroker};
use lectern::application::{CheckpointerConfig, LiveSessionService};
use lectern::config::{AppConfig, ConfigError};
use lectern::domain::foundation::DomainError;
use lectern::telemetry::{self, TelemetryError};

#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    let config = AppConfig::load()?;
    config.validate().map_err(ConfigError::from)?;
    telemetry::init(&config.logging)?;
    info!(environment = ?config.environment, "lectern starting");

    // ── Durable store ───────────────────────────────────
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        info!("migrations applied");
    }
    let store = Arc::new(PostgresSessionStore::new(pool));

    // ── Live registry ───────────────────────────────────
    let topics = Arc::new(TopicBroker::new(config.live.channel_capacity));
    let service = LiveSessionService::boot(store, topics, Arc::new(RandomCodeGenerator::new())).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let checkpointer = config.live.checkpoint_interval().map(|interval| {
        let checkpointer = service.checkpointer(CheckpointerConfig::default().with_interval(interval));
        info!(interval_secs = interval.as_secs(), "checkpointer started");
        tokio::spawn(async move { checkpointer.run(shutdown_rx).await })
    });

    info!(live_sessions = service.registry().len().await, "lectern ready");

    // ── Shutdown ────────────────────────────────────────
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    if let Some(task) = checkpointer {
        match task.await {
            Ok(report) => info!(written = report.written, failed = report.failed, "checkpointer stopped"),
            Err(err) => error!(%err, "checkpointer task panicked"),
        }
    }

    service.shutdown().await?;
    info!("lectern shut down");
    Ok(())
}
