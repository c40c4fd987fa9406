//! Follow the live feed from a terminal.

use std::sync::Arc;

use chrono::Utc;
use clap::Args;

use crate::output;
use carehub_core::error::AppError;
use carehub_core::types::id::UserId;
use carehub_database::repositories::NotificationRepository;
use carehub_realtime::NotificationCenter;
use carehub_realtime::alert::{ChannelAlertSink, relative_time};
use carehub_realtime::feed::PgNotificationFeed;
use carehub_realtime::table::postgres::PgNotificationTable;

/// Arguments for the watch command
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Scope to one recipient (their notifications plus broadcasts)
    #[arg(short, long)]
    pub user: Option<UserId>,
}

/// Print each incoming notification until interrupted
pub async fn execute(args: &WatchArgs, config_path: &str) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let repo = NotificationRepository::with_table(pool.clone(), &config.sync.table)?;
    let center = NotificationCenter::new(
        Arc::new(PgNotificationTable::new(repo, args.user)),
        &config.sync,
    );
    let feed = PgNotificationFeed::new(pool, &config.sync);

    let (sink, mut toasts) = ChannelAlertSink::new();
    let subscription = center.subscribe(&feed, Arc::new(sink)).await?;

    let outcome = center.refresh().await?;
    println!(
        "Watching '{}': {} notifications, {} unread. Ctrl-C to stop.",
        config.sync.table, outcome.records, outcome.unread
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            toast = toasts.recv() => {
                let Some(toast) = toast else { break };
                println!(
                    "[{}] {} {}: {}",
                    toast.urgency.as_str().to_uppercase(),
                    relative_time(toast.timestamp, Utc::now()),
                    toast.title,
                    toast.message
                );
            }
        }
    }

    subscription.shutdown().await;
    output::print_success(&format!("Stopped; {} unread", center.unread_count()));
    Ok(())
}
