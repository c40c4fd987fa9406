//! Notification repository implementation.

use sqlx::PgPool;

use carehub_core::error::{AppError, ErrorKind};
use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_entity::notification::{NewNotification, Notification};

/// Columns selected for every notification read.
const COLUMNS: &str = "id, type, title, message, user_id, data, is_read, created_at";

/// Repository for the remote `notifications` table.
///
/// Recipient scoping follows the dashboard convention: a user sees rows
/// addressed to them plus broadcast rows (`user_id IS NULL`). Passing `None`
/// as the user disables scoping.
#[derive(Debug, Clone)]
pub struct NotificationRepository {
    pool: PgPool,
    table: String,
}

impl NotificationRepository {
    /// Create a repository over the default `notifications` table.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table: "notifications".to_string(),
        }
    }

    /// Create a repository over a custom table name.
    ///
    /// The name is interpolated into SQL, so only plain identifiers are accepted.
    pub fn with_table(pool: PgPool, table: &str) -> AppResult<Self> {
        if !is_plain_identifier(table) {
            return Err(AppError::configuration(format!(
                "Invalid notification table name: '{table}'"
            )));
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    /// The table this repository reads and writes.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Fetch the `limit` most recent notifications, newest first.
    pub async fn find_recent(
        &self,
        limit: usize,
        user_id: Option<UserId>,
    ) -> AppResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM {} \
             WHERE ($1::uuid IS NULL OR user_id IS NULL OR user_id = $1) \
             ORDER BY created_at DESC, id DESC LIMIT $2",
            self.table
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to list notifications", e)
            })
    }

    /// Find a single notification.
    pub async fn find_by_id(&self, id: NotificationId) -> AppResult<Option<Notification>> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table);

        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find notification", e))
    }

    /// Count unread notifications visible to a user.
    pub async fn count_unread(&self, user_id: Option<UserId>) -> AppResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} \
             WHERE is_read = FALSE AND ($1::uuid IS NULL OR user_id IS NULL OR user_id = $1)",
            self.table
        );

        sqlx::query_scalar::<_, i64>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))
    }

    /// Insert a notification and return the stored row.
    pub async fn create(&self, new: &NewNotification) -> AppResult<Notification> {
        new.validate()?;

        let sql = format!(
            "INSERT INTO {} (type, title, message, user_id, data) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLUMNS}",
            self.table
        );

        sqlx::query_as::<_, Notification>(&sql)
            .bind(new.kind)
            .bind(&new.title)
            .bind(&new.message)
            .bind(new.user_id)
            .bind(&new.data)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to create notification", e)
            })
    }

    /// Mark a notification as read.
    ///
    /// Returns `false` when no row has the given id.
    pub async fn mark_read(&self, id: NotificationId) -> AppResult<bool> {
        let sql = format!("UPDATE {} SET is_read = TRUE WHERE id = $1", self.table);

        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;

        Ok(result.rows_affected() > 0)
    }

    /// Mark every unread notification visible to a user as read.
    pub async fn mark_all_read(&self, user_id: Option<UserId>) -> AppResult<u64> {
        let sql = format!(
            "UPDATE {} SET is_read = TRUE \
             WHERE is_read = FALSE AND ($1::uuid IS NULL OR user_id IS NULL OR user_id = $1)",
            self.table
        );

        let result = sqlx::query(&sql)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark all read", e))?;

        Ok(result.rows_affected())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, optionally schema-qualified once.
fn is_plain_identifier(name: &str) -> bool {
    let mut parts = name.split('.');
    let valid = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };
    match (parts.next(), parts.next(), parts.next()) {
        (Some(table), None, None) => valid(table),
        (Some(schema), Some(table), None) => valid(schema) && valid(table),
        _ => false,
    }
}
