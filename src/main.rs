//! CareHub Watch: headless notification watcher.
//!
//! Keeps a notification store in sync with the database, raises a log
//! alert for every live insert and reports the unread count as it changes.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use carehub_core::config::AppConfig;
use carehub_core::error::AppError;
use carehub_database::connection::DatabasePool;
use carehub_database::repositories::NotificationRepository;
use carehub_realtime::NotificationCenter;
use carehub_realtime::alert::TracingAlertSink;
use carehub_realtime::feed::PgNotificationFeed;
use carehub_realtime::table::postgres::PgNotificationTable;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Watcher error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file, environment overlay and variables
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("CAREHUB_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    let env = std::env::var("CAREHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let overlay = format!("config/{}.toml", env);

    AppConfig::load_with_overlay(&config_path, Some(&overlay))
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main watcher loop
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CareHub Watch v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;

    if std::env::var("CAREHUB_SKIP_MIGRATIONS").is_err() {
        tracing::info!("Running database migrations...");
        carehub_database::migration::run_migrations(db.pool()).await?;
    }

    // ── Step 2: Notification center ──────────────────────────────
    let repo = NotificationRepository::with_table(db.pool().clone(), &config.sync.table)?;
    let table = Arc::new(PgNotificationTable::new(repo, None));
    let center = NotificationCenter::new(table, &config.sync);

    // ── Step 3: Live feed, then initial pull ─────────────────────
    let feed = PgNotificationFeed::new(db.pool().clone(), &config.sync);
    let subscription = center
        .subscribe(&feed, Arc::new(TracingAlertSink))
        .await?;

    if let Err(e) = center.refresh().await {
        tracing::warn!("Initial pull failed, waiting for live updates: {}", e);
    }

    // ── Step 4: Report changes until shutdown ────────────────────
    let mut versions = center.watch();
    let mut last_unread = None;
    loop {
        let unread = center.unread_count();
        if last_unread != Some(unread) {
            tracing::info!(unread, records = center.store.len(), "Unread notifications");
            last_unread = Some(unread);
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = versions.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!("Shutting down");
    subscription.shutdown().await;

    let metrics = center.metrics();
    tracing::info!(
        pulls = metrics.pulls_applied,
        coalesced = metrics.pulls_coalesced,
        failed = metrics.pulls_failed,
        alerts = metrics.alerts_raised,
        "Watcher stopped"
    );

    db.close().await;
    Ok(())
}
