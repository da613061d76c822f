//! Notification inbox.

use cinelog_common::{AppError, AppResult};
use cinelog_db::{
    Page, PageRequest, entities::notification, repositories::NotificationRepository,
};

use super::activity::{ActivityKind, ActivityRecorder};

/// Notifications shown per page.
pub const NOTIFICATIONS_PAGE_SIZE: u64 = 5;

/// Result of dismissing notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    Deleted,
    DeletedAll,
    NothingToDelete,
}

impl Dismissal {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Deleted => "Notification has been deleted.",
            Self::DeletedAll => "All notifications have been deleted.",
            Self::NothingToDelete => "No notifications found to delete.",
        }
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::NothingToDelete)
    }
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    activity: ActivityRecorder,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository, activity: ActivityRecorder) -> Self {
        Self {
            notification_repo,
            activity,
        }
    }

    /// The inbox of `user_id`, newest first.
    pub async fn list(&self, user_id: &str, page: Option<u64>) -> AppResult<Page<notification::Model>> {
        let notifications = self
            .notification_repo
            .find_by_recipient(user_id, PageRequest::new(page, NOTIFICATIONS_PAGE_SIZE))
            .await?;
        self.activity.record(user_id, &ActivityKind::BrowsedNotifications).await;
        Ok(notifications)
    }

    /// Delete one notification from the inbox of `user_id`.
    pub async fn destroy(&self, user_id: &str, id: &str) -> AppResult<Dismissal> {
        if self.notification_repo.delete_owned(id, user_id).await? == 0 {
            return Err(AppError::NotFound("Notification not found.".to_string()));
        }
        self.activity.record(user_id, &ActivityKind::DeletedNotification).await;
        Ok(Dismissal::Deleted)
    }

    /// Empty the inbox of `user_id`.
    pub async fn delete_all(&self, user_id: &str) -> AppResult<Dismissal> {
        let removed = self.notification_repo.delete_all_for_recipient(user_id).await?;
        if removed == 0 {
            return Ok(Dismissal::NothingToDelete);
        }

        tracing::debug!(user_id = %user_id, removed, "Dismissed notifications");
        self.activity.record(user_id, &ActivityKind::DismissedNotifications).await;
        Ok(Dismissal::DeletedAll)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cinelog_db::{entities::activity, repositories::ActivityRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_activity(action: &str) -> activity::Model {
        activity::Model {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            action: action.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> NotificationService {
        let db = Arc::new(db.into_connection());
        NotificationService::new(
            NotificationRepository::new(db.clone()),
            ActivityRecorder::new(ActivityRepository::new(db)),
        )
    }

    #[tokio::test]
    async fn test_destroy_foreign_notification_is_not_found() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]));

        let result = service.destroy("u1", "n-of-someone-else").await;
        match result {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Notification not found."),
            other => panic!("Expected NotFound error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_all_empty_inbox() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]));

        let outcome = service.delete_all("u1").await.unwrap();
        assert_eq!(outcome, Dismissal::NothingToDelete);
        assert!(!outcome.is_success());
        assert_eq!(outcome.message(), "No notifications found to delete.");
    }

    #[tokio::test]
    async fn test_delete_all_records_activity() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .append_query_results([[create_test_activity("Dismiss all notifications")]]),
        );

        assert_eq!(service.delete_all("u1").await.unwrap(), Dismissal::DeletedAll);
    }
}
