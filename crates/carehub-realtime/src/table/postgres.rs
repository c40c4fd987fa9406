//! [`NotificationTable`] backed by the PostgreSQL repository.

use async_trait::async_trait;

use carehub_core::result::AppResult;
use carehub_core::types::id::{NotificationId, UserId};
use carehub_database::repositories::NotificationRepository;
use carehub_entity::notification::{NewNotification, Notification};

use super::{NotificationTable, UpdateOutcome};

/// PostgreSQL table scoped to one dashboard user.
#[derive(Debug, Clone)]
pub struct PgNotificationTable {
    repo: NotificationRepository,
    user: Option<UserId>,
}

impl PgNotificationTable {
    /// Wrap a repository; `user` scopes pulls to that recipient plus broadcasts.
    pub fn new(repo: NotificationRepository, user: Option<UserId>) -> Self {
        Self { repo, user }
    }
}

#[async_trait]
impl NotificationTable for PgNotificationTable {
    async fn select_recent(&self, limit: usize) -> AppResult<Vec<Notification>> {
        self.repo.find_recent(limit, self.user).await
    }

    async fn mark_read(&self, id: NotificationId) -> AppResult<UpdateOutcome> {
        if self.repo.mark_read(id).await? {
            Ok(UpdateOutcome::Updated)
        } else {
            Ok(UpdateOutcome::NotFound)
        }
    }

    async fn mark_all_read(&self, user: Option<UserId>) -> AppResult<u64> {
        self.repo.mark_all_read(user.or(self.user)).await
    }

    async fn insert(&self, new: NewNotification) -> AppResult<Notification> {
        self.repo.create(&new).await
    }

    fn recipient(&self) -> Option<UserId> {
        self.user
    }
}
