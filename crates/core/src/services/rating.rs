//! Star ratings.

use chrono::Utc;
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{
    entities::{movie, rating, user},
    repositories::{MovieRepository, RatingRepository},
};
use sea_orm::Set;
use serde::Deserialize;

use super::catalog::MAX_RATING;

/// Rating form.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RatingInput {
    pub rating: i32,
}

/// Result of a rating change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatingChange {
    Added(rating::Model),
    Updated(rating::Model),
    /// Removed from the movie
    Removed(movie::Model),
}

impl RatingChange {
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Added(_) => "Rating Added!",
            Self::Updated(_) => "Your rating has been updated.",
            Self::Removed(_) => "Rating has been successfully removed.",
        }
    }
}

/// Rating service for business logic.
#[derive(Clone)]
pub struct RatingService {
    rating_repo: RatingRepository,
    movie_repo: MovieRepository,
    id_gen: IdGenerator,
}

impl RatingService {
    /// Create a new rating service.
    #[must_use]
    pub const fn new(rating_repo: RatingRepository, movie_repo: MovieRepository) -> Self {
        Self {
            rating_repo,
            movie_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Rate a movie, replacing the user's previous rating.
    pub async fn rate(
        &self,
        user: &user::Model,
        movie_id: &str,
        input: RatingInput,
    ) -> AppResult<RatingChange> {
        if !(1..=MAX_RATING).contains(&input.rating) {
            return Err(AppError::Invalid(FieldErrors::single(
                "rating",
                "is not included in the list",
            )));
        }
        let movie = self.movie_repo.get_by_id(movie_id).await?;

        let existed = self
            .rating_repo
            .find_by_user_and_movie(&user.id, &movie.id)
            .await?
            .is_some();

        let now = Utc::now();
        let rating = self
            .rating_repo
            .upsert(rating::ActiveModel {
                id: Set(self.id_gen.generate()),
                rating: Set(input.rating),
                user_id: Set(user.id.clone()),
                movie_id: Set(movie.id),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await?;

        Ok(if existed {
            RatingChange::Updated(rating)
        } else {
            RatingChange::Added(rating)
        })
    }

    /// Remove a rating. Only its owner or an admin may do so.
    pub async fn destroy(&self, user: &user::Model, id: &str) -> AppResult<RatingChange> {
        let rating = self
            .rating_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Rating not found.".to_string()))?;
        if rating.user_id != user.id && !user.is_admin {
            return Err(AppError::Forbidden(
                "You are not authorized to perform this action.".to_string(),
            ));
        }

        let movie = self.movie_repo.get_by_id(&rating.movie_id).await?;
        self.rating_repo.delete(&rating.id).await?;
        Ok(RatingChange::Removed(movie))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Rater".to_string(),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            is_admin: false,
            image_key: None,
            token: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_movie(id: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            name: "Heat".to_string(),
            review: "Crime".to_string(),
            casts: None,
            release_date: NaiveDate::from_ymd_opt(1995, 12, 15).unwrap(),
            country: None,
            production: None,
            director: None,
            duration: "2h 50m".to_string(),
            trailer_url: "https://example.com/heat".to_string(),
            rating: None,
            user_id: Some("admin".to_string()),
            image_key: "movies/heat.jpg".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_rating(id: &str, user_id: &str, value: i32) -> rating::Model {
        rating::Model {
            id: id.to_string(),
            rating: value,
            user_id: user_id.to_string(),
            movie_id: "m1".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> RatingService {
        let db = Arc::new(db.into_connection());
        RatingService::new(RatingRepository::new(db.clone()), MovieRepository::new(db))
    }

    #[tokio::test]
    async fn test_rate_out_of_range() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        for value in [0, 6, -1] {
            let result = service
                .rate(&create_test_user("u1"), "m1", RatingInput { rating: value })
                .await;
            assert!(matches!(result, Err(AppError::Invalid(_))));
        }
    }

    #[tokio::test]
    async fn test_rate_first_time_is_added() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([Vec::<rating::Model>::new()])
                .append_query_results([[create_test_rating("r1", "u1", 4)]]),
        );

        let change = service
            .rate(&create_test_user("u1"), "m1", RatingInput { rating: 4 })
            .await
            .unwrap();
        assert_eq!(change.message(), "Rating Added!");
    }

    #[tokio::test]
    async fn test_rate_again_is_updated() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_rating("r1", "u1", 2)]])
                .append_query_results([[create_test_rating("r1", "u1", 5)]]),
        );

        let change = service
            .rate(&create_test_user("u1"), "m1", RatingInput { rating: 5 })
            .await
            .unwrap();
        assert!(matches!(&change, RatingChange::Updated(r) if r.rating == 5));
        assert_eq!(change.message(), "Your rating has been updated.");
    }

    #[tokio::test]
    async fn test_destroy_someone_elses_rating() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_rating("r1", "u1", 3)]]),
        );

        let result = service.destroy(&create_test_user("u2"), "r1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
