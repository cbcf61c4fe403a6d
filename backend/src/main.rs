use std::sync::Arc;
use std::time::Duration;

use backend::{
    attempts::{recorder::FailedAttemptRecorder, recorder_sqlx::SqlxFailedAttemptRecorder},
    config::AppConfig,
    db::Db,
    identity::{StaticIdentity, system_user},
    logger::init_tracing,
    metrics::counters::Counters,
    movement::engine::MovementEngine,
    movement::repository_sqlx::SqlxMovementRepository,
    product::repository_sqlx::SqlxProductRepository,
    warehouse::registry_sqlx::SqlxWarehouseRegistry,
};
use chrono::{Duration as ChronoDuration, Utc};

/// Initializes DB, creates the schema, and wires the movement engine over the
/// sqlx repositories.
///
/// The recorder is returned separately so the retention loop can keep using it
/// after the engine has been handed out.
async fn init_engine(
    cfg: &AppConfig,
) -> anyhow::Result<(Arc<MovementEngine>, Arc<SqlxFailedAttemptRecorder>)> {
    let db = Db::connect(&cfg.database_url).await?;
    db.init_schema().await?;

    let attempts = Arc::new(SqlxFailedAttemptRecorder::new(db.pool.clone()));

    let engine = Arc::new(MovementEngine::new(
        Arc::new(SqlxMovementRepository::new(db.pool.clone())),
        Arc::new(SqlxProductRepository::new(db.pool.clone())),
        Arc::new(SqlxWarehouseRegistry::new(db.pool.clone())),
        attempts.clone(),
        // Headless bootstrap: submissions are attributed to the system user
        // until a request-scoped identity is plugged in.
        Arc::new(StaticIdentity(system_user())),
        Counters::default(),
    ));

    Ok((engine, attempts))
}

/// Starts the retention loop (fixed cadence). Each tick prunes failed attempts
/// older than the configured window.
fn start_attempt_retention_loop(
    attempts: Arc<SqlxFailedAttemptRecorder>,
    retention_days: i64,
    interval: Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            let cutoff = Utc::now() - ChronoDuration::days(retention_days);
            match attempts.purge_older_than(cutoff).await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "pruned failed-attempt log"),
                Err(e) => tracing::error!(error=?e, "failed-attempt purge failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sqlx::any::install_default_drivers();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    tracing::info!("Starting Stockflow backend...");

    let cfg = AppConfig::from_env();

    let (_engine, attempts) = init_engine(&cfg).await?;

    // Startup probe: the attempt log is the first thing ops reach for.
    let recent = attempts.recent(cfg.recent_attempts_limit).await?;
    tracing::info!(recent_failures = recent.len(), "failed-attempt log online");

    start_attempt_retention_loop(
        attempts,
        cfg.attempt_retention_days,
        Duration::from_secs(3600),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    Ok(())
}
