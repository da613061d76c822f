//! Reaction repository.

use std::sync::Arc;

use crate::entities::{Reaction, reaction};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::OnConflict,
};

/// Reaction repository for database operations.
#[derive(Clone)]
pub struct ReactionRepository {
    db: Arc<DatabaseConnection>,
}

impl ReactionRepository {
    /// Create a new reaction repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reaction by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<reaction::Model>> {
        Reaction::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reactions on a discussion.
    pub async fn find_by_discussion(&self, discussion_id: &str) -> AppResult<Vec<reaction::Model>> {
        Reaction::find()
            .filter(reaction::Column::DiscussionId.eq(discussion_id))
            .order_by_asc(reaction::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert the reaction, replacing the type of an existing one for the
    /// same (user, discussion).
    pub async fn upsert(&self, model: reaction::ActiveModel) -> AppResult<reaction::Model> {
        Reaction::insert(model)
            .on_conflict(
                OnConflict::columns([reaction::Column::UserId, reaction::Column::DiscussionId])
                    .update_columns([reaction::Column::ReactionType, reaction::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a reaction.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Reaction::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
