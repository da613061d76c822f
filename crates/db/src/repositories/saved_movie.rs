//! Saved movie repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Movie, SavedMovie, movie, saved_movie};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, sea_query::OnConflict,
};

/// Saved movie repository for database operations.
#[derive(Clone)]
pub struct SavedMovieRepository {
    db: Arc<DatabaseConnection>,
}

impl SavedMovieRepository {
    /// Create a new saved movie repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the row linking a user to a movie.
    pub async fn find_by_user_and_movie(
        &self,
        user_id: &str,
        movie_id: &str,
    ) -> AppResult<Option<saved_movie::Model>> {
        SavedMovie::find()
            .filter(saved_movie::Column::UserId.eq(user_id))
            .filter(saved_movie::Column::MovieId.eq(movie_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Link a user to a movie. Returns `false` when the link already existed.
    pub async fn add(&self, model: saved_movie::ActiveModel) -> AppResult<bool> {
        let inserted = SavedMovie::insert(model)
            .on_conflict(
                OnConflict::columns([saved_movie::Column::UserId, saved_movie::Column::MovieId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(inserted > 0)
    }

    /// Remove the link between a user and a movie.
    pub async fn remove(&self, user_id: &str, movie_id: &str) -> AppResult<u64> {
        SavedMovie::delete_many()
            .filter(saved_movie::Column::UserId.eq(user_id))
            .filter(saved_movie::Column::MovieId.eq(movie_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete one row owned by the user.
    pub async fn delete_owned(&self, id: &str, user_id: &str) -> AppResult<u64> {
        SavedMovie::delete_many()
            .filter(saved_movie::Column::Id.eq(id))
            .filter(saved_movie::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every row of the user.
    pub async fn delete_all_for_user(&self, user_id: &str) -> AppResult<u64> {
        SavedMovie::delete_many()
            .filter(saved_movie::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// The user's movies, most recent link first.
    pub async fn movies_of(
        &self,
        user_id: &str,
        request: PageRequest,
    ) -> AppResult<Page<movie::Model>> {
        let query = Movie::find()
            .join(JoinType::InnerJoin, saved_movie::Relation::Movie.def().rev())
            .filter(saved_movie::Column::UserId.eq(user_id))
            .order_by_desc(saved_movie::Column::CreatedAt);
        fetch_page(self.db.as_ref(), query, request).await
    }
}
