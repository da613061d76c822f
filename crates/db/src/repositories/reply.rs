//! Reply repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Reply, reply};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

/// Reply repository for database operations.
#[derive(Clone)]
pub struct ReplyRepository {
    db: Arc<DatabaseConnection>,
}

impl ReplyRepository {
    /// Create a new reply repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reply by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<reply::Model>> {
        Reply::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replies under a discussion, newest first.
    pub async fn find_by_discussion(
        &self,
        discussion_id: &str,
        request: PageRequest,
    ) -> AppResult<Page<reply::Model>> {
        let query = Reply::find()
            .filter(reply::Column::DiscussionId.eq(discussion_id))
            .order_by_desc(reply::Column::CreatedAt)
            .order_by_desc(reply::Column::Id);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Create a reply.
    pub async fn create(&self, model: reply::ActiveModel) -> AppResult<reply::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a reply.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Reply::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
