//! Movie management, detail page and saved list.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{
    Page, PageRequest,
    entities::{comment, genre, history, movie, saved_movie, user},
    repositories::{
        CommentRepository, GenreRepository, HistoryRepository, MovieRepository,
        RatingRepository, SavedMovieRepository,
    },
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::activity::{ActivityKind, ActivityRecorder};
use super::attachment::{Attachments, ImageUpload};
use super::catalog::clamp_max_rating;
use super::moderation::COMMENTS_PAGE_SIZE;

const IMAGE_SCOPE: &str = "movies";

/// Movie form.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MovieInput {
    #[validate(length(min = 1, message = "can't be blank"))]
    pub name: String,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub review: String,
    #[serde(default)]
    pub casts: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub production: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    pub release_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "can't be blank"))]
    pub duration: String,
    pub trailer_url: String,
    #[serde(default)]
    pub genre_ids: Vec<String>,
}

impl MovieInput {
    /// Field checks that need no database access.
    fn field_errors(&self, image: Option<&ImageUpload>, image_required: bool) -> FieldErrors {
        let mut errors = self
            .validate()
            .err()
            .map(|e| FieldErrors::from(&e))
            .unwrap_or_default();

        if self.release_date.is_none() {
            errors.add("release_date", "can't be blank");
        }
        if self.trailer_url.trim().is_empty() {
            errors.add("trailer_url", "can't be blank");
        } else if !is_web_url(&self.trailer_url) {
            errors.add("trailer_url", "is not a valid URL");
        }
        if self.genre_ids.is_empty() {
            errors.add("genres", "must be present");
        }
        match image {
            Some(upload) if !upload.is_image() => errors.add("image", "must be an image"),
            None if image_required => errors.add("image", "can't be blank"),
            _ => {}
        }
        errors
    }
}

fn is_web_url(value: &str) -> bool {
    url::Url::parse(value.trim())
        .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Everything the movie page shows.
#[derive(Debug, Clone, Serialize)]
pub struct MovieDetail {
    pub movie: movie::Model,
    pub genres: Vec<genre::Model>,
    pub comments: Page<comment::Model>,
    /// Highest rating the viewer gave, `0` when unrated or anonymous
    pub max_rating: i32,
    pub saved: bool,
}

/// Result of a saved list change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavedListChange {
    Saved,
    Removed,
    NotSaved,
}

impl SavedListChange {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Saved => "Movie saved successfully.",
            Self::Removed => "Movie was removed from saved list successfully.",
            Self::NotSaved => "Movie is not in saved list",
        }
    }
}

/// Movie service for business logic.
#[derive(Clone)]
pub struct MovieService {
    db: Arc<DatabaseConnection>,
    movie_repo: MovieRepository,
    genre_repo: GenreRepository,
    comment_repo: CommentRepository,
    rating_repo: RatingRepository,
    history_repo: HistoryRepository,
    saved_movie_repo: SavedMovieRepository,
    activity: ActivityRecorder,
    attachments: Attachments,
    id_gen: IdGenerator,
}

impl MovieService {
    /// Create a new movie service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        movie_repo: MovieRepository,
        genre_repo: GenreRepository,
        comment_repo: CommentRepository,
        rating_repo: RatingRepository,
        history_repo: HistoryRepository,
        saved_movie_repo: SavedMovieRepository,
        activity: ActivityRecorder,
        attachments: Attachments,
    ) -> Self {
        Self {
            db,
            movie_repo,
            genre_repo,
            comment_repo,
            rating_repo,
            history_repo,
            saved_movie_repo,
            activity,
            attachments,
            id_gen: IdGenerator::new(),
        }
    }

    /// Find a movie by ID.
    pub async fn get(&self, id: &str) -> AppResult<movie::Model> {
        self.movie_repo.get_by_id(id).await
    }

    /// Genres of a movie.
    pub async fn genres_of(&self, movie: &movie::Model) -> AppResult<Vec<genre::Model>> {
        self.movie_repo.genres_of(movie).await
    }

    async fn check_references(
        &self,
        input: &MovieInput,
        current_id: Option<&str>,
        errors: &mut FieldErrors,
    ) -> AppResult<()> {
        if !input.name.is_empty()
            && let Some(existing) = self.movie_repo.find_by_name(&input.name).await?
            && Some(existing.id.as_str()) != current_id
        {
            errors.add("name", "has already been taken");
        }

        if !input.genre_ids.is_empty() {
            let mut wanted = input.genre_ids.clone();
            wanted.sort_unstable();
            wanted.dedup();
            let found = self.genre_repo.find_by_ids(&wanted).await?;
            if found.len() != wanted.len() {
                errors.add("genres", "contain an unknown genre");
            }
        }
        Ok(())
    }

    /// Create a movie owned by `creator`.
    pub async fn create(
        &self,
        creator: &user::Model,
        mut input: MovieInput,
        image: Option<ImageUpload>,
    ) -> AppResult<movie::Model> {
        let mut errors = input.field_errors(image.as_ref(), true);
        self.check_references(&input, None, &mut errors).await?;
        errors.into_result()?;

        let (Some(image), Some(release_date)) = (image, input.release_date) else {
            return Err(AppError::Internal("Validated movie lost its fields".to_string()));
        };
        input.genre_ids.sort_unstable();
        input.genre_ids.dedup();

        let image_key = self.attachments.store(IMAGE_SCOPE, &image).await?;
        let now = Utc::now();
        let model = movie::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            review: Set(input.review),
            casts: Set(blank_to_none(input.casts)),
            release_date: Set(release_date),
            country: Set(blank_to_none(input.country)),
            production: Set(blank_to_none(input.production)),
            director: Set(blank_to_none(input.director)),
            duration: Set(input.duration),
            trailer_url: Set(input.trailer_url.trim().to_string()),
            rating: Set(None),
            user_id: Set(Some(creator.id.clone())),
            image_key: Set(image_key.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let result = async {
            let txn = self.db.begin().await?;
            let movie = self.movie_repo.create_in(&txn, model).await?;
            self.movie_repo
                .set_genres_in(&txn, &movie.id, &input.genre_ids)
                .await?;
            txn.commit().await?;
            Ok::<_, AppError>(movie)
        }
        .await;

        match result {
            Ok(movie) => {
                tracing::info!(movie_id = %movie.id, name = %movie.name, "Movie created");
                Ok(movie)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to create movie");
                self.attachments.remove(&image_key).await;
                Err(e)
            }
        }
    }

    /// Update a movie, replacing its genres and optionally its image.
    pub async fn update(
        &self,
        id: &str,
        mut input: MovieInput,
        image: Option<ImageUpload>,
    ) -> AppResult<movie::Model> {
        let current = self.movie_repo.get_by_id(id).await?;

        let mut errors = input.field_errors(image.as_ref(), false);
        self.check_references(&input, Some(&current.id), &mut errors).await?;
        errors.into_result()?;

        let Some(release_date) = input.release_date else {
            return Err(AppError::Internal("Validated movie lost its fields".to_string()));
        };
        input.genre_ids.sort_unstable();
        input.genre_ids.dedup();

        let new_key = match &image {
            Some(upload) => Some(self.attachments.store(IMAGE_SCOPE, upload).await?),
            None => None,
        };
        let old_key = current.image_key.clone();

        let mut model: movie::ActiveModel = current.into();
        model.name = Set(input.name);
        model.review = Set(input.review);
        model.casts = Set(blank_to_none(input.casts));
        model.release_date = Set(release_date);
        model.country = Set(blank_to_none(input.country));
        model.production = Set(blank_to_none(input.production));
        model.director = Set(blank_to_none(input.director));
        model.duration = Set(input.duration);
        model.trailer_url = Set(input.trailer_url.trim().to_string());
        if let Some(key) = &new_key {
            model.image_key = Set(key.clone());
        }
        model.updated_at = Set(Utc::now().into());

        let result = async {
            let txn = self.db.begin().await?;
            let movie = self.movie_repo.update_in(&txn, model).await?;
            self.movie_repo
                .set_genres_in(&txn, &movie.id, &input.genre_ids)
                .await?;
            txn.commit().await?;
            Ok::<_, AppError>(movie)
        }
        .await;

        match result {
            Ok(movie) => {
                if new_key.is_some() {
                    self.attachments.remove(&old_key).await;
                }
                tracing::info!(movie_id = %movie.id, "Movie updated");
                Ok(movie)
            }
            Err(e) => {
                tracing::error!(error = %e, movie_id = %id, "Failed to update movie");
                if let Some(key) = new_key {
                    self.attachments.remove(&key).await;
                }
                Err(e)
            }
        }
    }

    /// Delete a movie and everything hanging off it.
    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        let movie = self.movie_repo.get_by_id(id).await?;

        let txn = self.db.begin().await?;
        if self.movie_repo.delete_in(&txn, &movie.id).await? == 0 {
            return Err(AppError::NotFound("Movie not found.".to_string()));
        }
        txn.commit().await?;

        self.attachments.remove(&movie.image_key).await;
        tracing::info!(movie_id = %movie.id, "Movie destroyed");
        Ok(())
    }

    /// The movie page as `viewer` sees it.
    ///
    /// Signed-in viewers get the visit recorded in their history and activity.
    pub async fn show(
        &self,
        viewer: Option<&user::Model>,
        id: &str,
        page: Option<u64>,
    ) -> AppResult<MovieDetail> {
        let movie = self.movie_repo.get_by_id(id).await?;

        let (max_rating, saved) = match viewer {
            Some(user) => {
                self.activity
                    .record(&user.id, &ActivityKind::ViewedMovie { movie: movie.name.clone() })
                    .await;
                self.history_repo
                    .add(history::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        user_id: Set(user.id.clone()),
                        movie_id: Set(movie.id.clone()),
                        created_at: Set(Utc::now().into()),
                    })
                    .await?;
                let max = self.rating_repo.max_for_user(&user.id, &movie.id).await?;
                let saved = self
                    .saved_movie_repo
                    .find_by_user_and_movie(&user.id, &movie.id)
                    .await?
                    .is_some();
                (clamp_max_rating(max), saved)
            }
            None => (0, false),
        };

        let include_pending = viewer.is_some_and(|u| u.is_admin);
        let comments = self
            .comment_repo
            .find_by_movie(&movie.id, include_pending, PageRequest::new(page, COMMENTS_PAGE_SIZE))
            .await?;
        let genres = self.movie_repo.genres_of(&movie).await?;

        Ok(MovieDetail {
            movie,
            genres,
            comments,
            max_rating,
            saved,
        })
    }

    /// Bookmark a movie. Saving twice is a no-op.
    pub async fn save(&self, user: &user::Model, id: &str) -> AppResult<SavedListChange> {
        let movie = self.movie_repo.get_by_id(id).await?;
        self.saved_movie_repo
            .add(saved_movie::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id.clone()),
                movie_id: Set(movie.id.clone()),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        self.activity
            .record(&user.id, &ActivityKind::SavedMovie { movie: movie.name })
            .await;
        Ok(SavedListChange::Saved)
    }

    /// Remove a bookmark.
    pub async fn unsave(&self, user: &user::Model, id: &str) -> AppResult<SavedListChange> {
        let movie = self.movie_repo.get_by_id(id).await?;
        if self.saved_movie_repo.remove(&user.id, &movie.id).await? == 0 {
            return Ok(SavedListChange::NotSaved);
        }
        self.activity
            .record(&user.id, &ActivityKind::UnsavedMovie { movie: movie.name })
            .await;
        Ok(SavedListChange::Removed)
    }
}
