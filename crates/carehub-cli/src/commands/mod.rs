//! CLI command definitions and dispatch.

pub mod migrate;
pub mod notifications;
pub mod watch;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use carehub_core::config::AppConfig;
use carehub_core::error::AppError;

/// CareHub: clinical notification feed
#[derive(Debug, Parser)]
#[command(name = "carehub", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Read, acknowledge and send notifications
    Notifications(notifications::NotificationArgs),
    /// Follow the live feed and print toasts
    Watch(watch::WatchArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.config).await,
            Commands::Notifications(args) => {
                notifications::execute(args, &self.config, self.format).await
            }
            Commands::Watch(args) => watch::execute(args, &self.config).await,
        }
    }
}

/// Helper: load configuration from file
pub fn load_config(config_path: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(config_path)
        .map_err(|e| AppError::configuration(format!("Failed to load config: {e}")))
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<sqlx::PgPool, AppError> {
    let pool = carehub_database::connection::DatabasePool::connect(&config.database).await?;
    Ok(pool.into_pool())
}
