//! Notification repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{
    Notification,
    notification::{self, Notifiable, NotificationAction},
};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Notifications addressed to a user, newest first.
    pub async fn find_by_recipient(
        &self,
        recipient_id: &str,
        request: PageRequest,
    ) -> AppResult<Page<notification::Model>> {
        let query = Notification::find()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Notifications about one notifiable with the given action.
    pub async fn find_for_notifiable(
        &self,
        notifiable: &Notifiable,
        action: NotificationAction,
    ) -> AppResult<Vec<notification::Model>> {
        Notification::find()
            .filter(notification::Column::NotifiableType.eq(notifiable.kind()))
            .filter(notification::Column::NotifiableId.eq(notifiable.id()))
            .filter(notification::Column::Action.eq(action))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert one notification on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: notification::ActiveModel,
    ) -> AppResult<notification::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a batch of notifications on the given connection.
    pub async fn create_many_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        models: Vec<notification::ActiveModel>,
    ) -> AppResult<u64> {
        if models.is_empty() {
            return Ok(0);
        }
        Notification::insert_many(models)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove notifications about one notifiable with the given action.
    pub async fn delete_for_notifiable_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        notifiable: &Notifiable,
        action: NotificationAction,
    ) -> AppResult<u64> {
        Notification::delete_many()
            .filter(notification::Column::NotifiableType.eq(notifiable.kind()))
            .filter(notification::Column::NotifiableId.eq(notifiable.id()))
            .filter(notification::Column::Action.eq(action))
            .exec(conn)
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete one notification owned by the recipient.
    pub async fn delete_owned(&self, id: &str, recipient_id: &str) -> AppResult<u64> {
        Notification::delete_many()
            .filter(notification::Column::Id.eq(id))
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every notification addressed to a user.
    pub async fn delete_all_for_recipient(&self, recipient_id: &str) -> AppResult<u64> {
        Notification::delete_many()
            .filter(notification::Column::RecipientId.eq(recipient_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotifiableType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(
        id: &str,
        recipient_id: &str,
        action: NotificationAction,
    ) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient_id.to_string(),
            actor_id: "actor".to_string(),
            action,
            notifiable_type: NotifiableType::Comment,
            notifiable_id: "c1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_for_notifiable() {
        let n = create_test_notification("n1", "admin1", NotificationAction::CreatedReview);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n.clone()]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let found = repo
            .find_for_notifiable(
                &Notifiable::Comment("c1".to_string()),
                NotificationAction::CreatedReview,
            )
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].notifiable(), Notifiable::Comment("c1".to_string()));
    }

    #[tokio::test]
    async fn test_create_many_skips_empty_batch() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = NotificationRepository::new(db.clone());
        assert_eq!(repo.create_many_in(db.as_ref(), vec![]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_all_for_recipient() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        assert_eq!(repo.delete_all_for_recipient("u1").await.unwrap(), 3);
    }
}
