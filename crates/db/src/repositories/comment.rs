//! Comment repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Comment, comment};
use chrono::Utc;
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Select, Set,
};

fn movie_comments(movie_id: &str, include_pending: bool) -> Select<Comment> {
    let query = Comment::find()
        .filter(comment::Column::MovieId.eq(movie_id))
        .order_by_desc(comment::Column::CreatedAt);

    if include_pending {
        query
    } else {
        query.filter(comment::Column::Status.eq(true))
    }
}

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Comments of a movie, newest first.
    ///
    /// Pending comments are only included when `include_pending` is set.
    pub async fn find_by_movie(
        &self,
        movie_id: &str,
        include_pending: bool,
        request: PageRequest,
    ) -> AppResult<Page<comment::Model>> {
        let query = movie_comments(movie_id, include_pending);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Insert a comment on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: comment::ActiveModel,
    ) -> AppResult<comment::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a comment visible.
    pub async fn approve_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment: comment::Model,
    ) -> AppResult<comment::Model> {
        let mut active: comment::ActiveModel = comment.into();
        active.status = Set(true);
        active.updated_at = Set(Utc::now().into());
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment, returning the number of rows removed.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<u64> {
        Comment::delete_by_id(id)
            .exec(conn)
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
