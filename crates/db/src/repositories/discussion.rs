//! Discussion repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Discussion, discussion};
use cinelog_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder};

/// Discussion repository for database operations.
#[derive(Clone)]
pub struct DiscussionRepository {
    db: Arc<DatabaseConnection>,
}

impl DiscussionRepository {
    /// Create a new discussion repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a discussion by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<discussion::Model>> {
        Discussion::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Newest first.
    pub async fn list(&self, request: PageRequest) -> AppResult<Page<discussion::Model>> {
        let query = Discussion::find()
            .order_by_desc(discussion::Column::CreatedAt)
            .order_by_desc(discussion::Column::Id);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Create a discussion.
    pub async fn create(&self, model: discussion::ActiveModel) -> AppResult<discussion::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a discussion.
    pub async fn update(&self, model: discussion::ActiveModel) -> AppResult<discussion::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a discussion. Reactions and replies cascade.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Discussion::delete_by_id(id)
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
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_list_newest_first() {
        let discussion = discussion::Model {
            id: "d1".to_string(),
            content: "Best heist movie?".to_string(),
            user_id: "u1".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[discussion]])
                .into_connection(),
        );

        let repo = DiscussionRepository::new(db);
        let page = repo.list(PageRequest::new(None, 10)).await.unwrap();
        assert_eq!(page.items[0].content, "Best heist movie?");
    }
}
