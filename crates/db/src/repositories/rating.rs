//! Rating repository.

use std::sync::Arc;

use crate::entities::{Rating, rating};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect,
    sea_query::OnConflict,
};

/// Rating repository for database operations.
#[derive(Clone)]
pub struct RatingRepository {
    db: Arc<DatabaseConnection>,
}

impl RatingRepository {
    /// Create a new rating repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a rating by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<rating::Model>> {
        Rating::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the rating a user gave a movie.
    pub async fn find_by_user_and_movie(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> AppResult<Option<rating::Model>> {
        Rating::find()
            .filter(rating::Column::UserId.eq(user_id))
            .filter(rating::Column::MovieId.eq(movie_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Highest rating value a user gave a movie.
    pub async fn max_for_user(&self, user_id: &str, movie_id: &str) -> AppResult<Option<i32>> {
        let max: Option<Option<i32>> = Rating::find()
            .select_only()
            .column_as(rating::Column::Rating.max(), "max_rating")
            .filter(rating::Column::UserId.eq(user_id))
            .filter(rating::Column::MovieId.eq(movie_id))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(max.flatten())
    }

    /// Insert the rating, or overwrite the value of the existing one for the
    /// same (user, movie).
    pub async fn upsert_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: rating::ActiveModel,
    ) -> AppResult<rating::Model> {
        Rating::insert(model)
            .on_conflict(
                OnConflict::columns([rating::Column::UserId, rating::Column::MovieId])
                    .update_columns([rating::Column::Rating, rating::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_with_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or update using the shared connection.
    pub async fn upsert(&self, model: rating::ActiveModel) -> AppResult<rating::Model> {
        self.upsert_in(self.db.as_ref(), model).await
    }

    /// Delete a rating.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Rating::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
