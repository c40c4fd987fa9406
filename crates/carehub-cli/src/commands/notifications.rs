//! Notification CLI commands.

use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use carehub_core::error::AppError;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_database::repositories::NotificationRepository;
use carehub_entity::notification::{NewNotification, Notification, NotificationType};
use carehub_realtime::alert::relative_time;
use carehub_realtime::table::NotificationTable;
use carehub_realtime::table::postgres::PgNotificationTable;
use carehub_realtime::{NotificationCenter, UpdateOutcome};

/// Arguments for notification commands
#[derive(Debug, Args)]
pub struct NotificationArgs {
    /// Scope to one recipient (their notifications plus broadcasts)
    #[arg(short, long, global = true)]
    pub user: Option<UserId>,

    /// Notification subcommand
    #[command(subcommand)]
    pub command: NotificationCommand,
}

/// Notification subcommands
#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    /// List the most recent notifications
    List {
        /// Only show unread notifications
        #[arg(long)]
        unread: bool,
    },
    /// Show the unread count
    Unread,
    /// Mark one notification as read
    MarkRead {
        /// Notification ID
        id: NotificationId,
    },
    /// Mark every visible notification as read
    MarkAllRead {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Insert a notification (announced on the live feed)
    Send {
        /// Type: emergency, appointment, system, alert
        #[arg(short, long, default_value = "system")]
        kind: NotificationType,
        /// Title
        #[arg(short, long)]
        title: String,
        /// Message body
        #[arg(short, long)]
        message: String,
        /// Extra JSON payload
        #[arg(short, long)]
        data: Option<String>,
    },
}

/// Notification display row for table output
#[derive(Debug, Serialize, Tabled)]
struct NotificationRow {
    /// Notification ID
    id: String,
    /// Type
    #[tabled(rename = "type")]
    #[serde(rename = "type")]
    kind: String,
    /// Urgency
    urgency: String,
    /// Title
    title: String,
    /// Message
    message: String,
    /// Read flag
    read: String,
    /// Age
    received: String,
}

impl NotificationRow {
    fn from_notification(n: &Notification) -> Self {
        Self {
            id: n.id.to_string(),
            kind: n.kind.to_string(),
            urgency: n.kind.urgency().to_string(),
            title: n.title.clone(),
            message: n.message.chars().take(60).collect(),
            read: if n.is_read { "yes" } else { "no" }.to_string(),
            received: relative_time(n.created_at, Utc::now()),
        }
    }
}

/// Unread summary for item output
#[derive(Debug, Serialize)]
struct UnreadSummary {
    unread: usize,
    shown: usize,
}

/// Execute notification commands
pub async fn execute(
    args: &NotificationArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let pool = super::create_db_pool(&config).await?;
    let repo = NotificationRepository::with_table(pool, &config.sync.table)?;
    let table = Arc::new(PgNotificationTable::new(repo, args.user));
    let center = NotificationCenter::new(table.clone(), &config.sync);

    match &args.command {
        NotificationCommand::List { unread } => {
            center.refresh().await?;
            let rows: Vec<NotificationRow> = center
                .notifications()
                .iter()
                .filter(|n| !*unread || n.is_unread())
                .map(NotificationRow::from_notification)
                .collect();

            output::print_list(&rows, format);
        }
        NotificationCommand::Unread => {
            let outcome = center.refresh().await?;
            output::print_item(
                &UnreadSummary {
                    unread: outcome.unread,
                    shown: outcome.records,
                },
                format,
            );
        }
        NotificationCommand::MarkRead { id } => {
            let confirmation = center.mark_as_read(*id).await?;
            match confirmation.confirmed {
                UpdateOutcome::Updated => {
                    output::print_success(&format!(
                        "Notification {id} marked as read ({} unread)",
                        center.unread_count()
                    ));
                }
                UpdateOutcome::NotFound => {
                    output::print_warning(&format!("Notification {id} not found; nothing to do"));
                }
            }
            if let Err(e) = &confirmation.refetch {
                output::print_warning(&format!("Could not refresh notifications: {e}"));
            }
        }
        NotificationCommand::MarkAllRead { force } => {
            if !force {
                let scope = match args.user {
                    Some(user) => format!("user {user}"),
                    None => "ALL users".to_string(),
                };
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Mark every notification for {scope} as read?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let confirmation = center.mark_all_as_read(args.user).await?;
            output::print_success(&format!(
                "{} notifications marked as read",
                confirmation.confirmed
            ));
            if let Err(e) = &confirmation.refetch {
                output::print_warning(&format!("Could not refresh notifications: {e}"));
            }
        }
        NotificationCommand::Send {
            kind,
            title,
            message,
            data,
        } => {
            let mut new = NewNotification::new(*kind, title.clone(), message.clone());
            if let Some(user) = args.user {
                new = new.for_user(user);
            }
            if let Some(data) = data {
                new = new.with_data(serde_json::from_str(data)?);
            }

            let stored = table.insert(new).await?;
            output::print_success(&format!(
                "Sent {} notification '{}' ({})",
                stored.kind, stored.title, stored.id
            ));
        }
    }

    Ok(())
}
