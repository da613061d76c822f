//! A user's saved movies and viewing history.

use cinelog_common::{AppError, AppResult};
use cinelog_db::{
    Page, PageRequest,
    entities::{movie, user},
    repositories::{HistoryRepository, SavedMovieRepository},
};

use super::activity::{ActivityKind, ActivityRecorder};
use super::catalog::FILTER_PAGE_SIZE;

/// Library service for business logic.
#[derive(Clone)]
pub struct LibraryService {
    saved_movie_repo: SavedMovieRepository,
    history_repo: HistoryRepository,
    activity: ActivityRecorder,
}

impl LibraryService {
    /// Create a new library service.
    #[must_use]
    pub const fn new(
        saved_movie_repo: SavedMovieRepository,
        history_repo: HistoryRepository,
        activity: ActivityRecorder,
    ) -> Self {
        Self {
            saved_movie_repo,
            history_repo,
            activity,
        }
    }

    /// Saved movies, most recently saved first.
    pub async fn saved_movies(
        &self,
        user: &user::Model,
        page: Option<u64>,
    ) -> AppResult<Page<movie::Model>> {
        let movies = self
            .saved_movie_repo
            .movies_of(&user.id, PageRequest::new(page, FILTER_PAGE_SIZE))
            .await?;
        self.activity.record(&user.id, &ActivityKind::BrowsedSavedMovies).await;
        Ok(movies)
    }

    /// Viewed movies, most recent first.
    pub async fn history(
        &self,
        user: &user::Model,
        page: Option<u64>,
    ) -> AppResult<Page<movie::Model>> {
        self.history_repo
            .movies_of(&user.id, PageRequest::new(page, FILTER_PAGE_SIZE))
            .await
    }

    /// Drop one history entry of the user.
    pub async fn remove_history(&self, user: &user::Model, id: &str) -> AppResult<()> {
        if self.history_repo.delete_owned(id, &user.id).await? == 0 {
            return Err(AppError::NotFound("History not found.".to_string()));
        }
        Ok(())
    }

    /// Drop the whole history of the user.
    pub async fn clear_history(&self, user: &user::Model) -> AppResult<u64> {
        let removed = self.history_repo.delete_all_for_user(&user.id).await?;
        tracing::debug!(user_id = %user.id, removed, "Cleared history");
        Ok(removed)
    }
}
