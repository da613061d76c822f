//! Application state, authentication and route authorization.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use cinelog_common::{AppResult, Config, StorageBackend};
use cinelog_core::{
    Action, ActivityRecorder, ActivityService, Attachments, CatalogService, CommentService,
    DiscussionService, FeedbackService, GenreService, LibraryService, Mailer, MovieService,
    NotificationService, RatingService, Requirement, Resource, UserService, YearService,
    authorize, requirement,
};
use cinelog_db::{
    entities::user,
    repositories::{
        ActivityRepository, CommentRepository, DiscussionRepository, FeedbackRepository,
        GenreRepository, HistoryRepository, MovieRepository, NotificationRepository,
        RatingRepository, ReactionRepository, ReplyRepository, SavedMovieRepository,
        UserRepository, YearRepository,
    },
};
use sea_orm::DatabaseConnection;

use crate::response::OrRedirect;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub movie_service: MovieService,
    pub catalog_service: CatalogService,
    pub comment_service: CommentService,
    pub rating_service: RatingService,
    pub genre_service: GenreService,
    pub year_service: YearService,
    pub notification_service: NotificationService,
    pub activity_service: ActivityService,
    pub discussion_service: DiscussionService,
    pub library_service: LibraryService,
    pub feedback_service: FeedbackService,
}

impl AppState {
    /// Wire every service onto one connection pool.
    pub fn new(
        db: Arc<DatabaseConnection>,
        storage: Arc<dyn StorageBackend>,
        mailer: Arc<dyn Mailer>,
        config: &Config,
    ) -> AppResult<Self> {
        let tz = config.app.tz()?;
        let year_match = config.app.year_match;

        let user_repo = UserRepository::new(db.clone());
        let movie_repo = MovieRepository::new(db.clone());
        let genre_repo = GenreRepository::new(db.clone());
        let year_repo = YearRepository::new(db.clone());
        let comment_repo = CommentRepository::new(db.clone());
        let rating_repo = RatingRepository::new(db.clone());
        let history_repo = HistoryRepository::new(db.clone());
        let saved_movie_repo = SavedMovieRepository::new(db.clone());
        let notification_repo = NotificationRepository::new(db.clone());
        let activity_repo = ActivityRepository::new(db.clone());

        let activity = ActivityRecorder::new(activity_repo.clone());
        let attachments = Attachments::new(storage);

        Ok(Self {
            user_service: UserService::new(
                db.clone(),
                user_repo.clone(),
                activity.clone(),
                attachments.clone(),
            ),
            movie_service: MovieService::new(
                db.clone(),
                movie_repo.clone(),
                genre_repo.clone(),
                comment_repo.clone(),
                rating_repo.clone(),
                history_repo.clone(),
                saved_movie_repo.clone(),
                activity.clone(),
                attachments,
            ),
            catalog_service: CatalogService::new(
                movie_repo.clone(),
                genre_repo.clone(),
                year_repo.clone(),
                rating_repo.clone(),
                history_repo.clone(),
                activity.clone(),
                year_match,
                tz,
            ),
            comment_service: CommentService::new(
                db.clone(),
                comment_repo,
                notification_repo.clone(),
                movie_repo.clone(),
                user_repo.clone(),
                activity.clone(),
            ),
            rating_service: RatingService::new(rating_repo, movie_repo.clone()),
            genre_service: GenreService::new(db.clone(), genre_repo, movie_repo.clone()),
            year_service: YearService::new(db.clone(), year_repo, movie_repo, year_match),
            notification_service: NotificationService::new(notification_repo, activity.clone()),
            activity_service: ActivityService::new(activity_repo, user_repo, tz),
            discussion_service: DiscussionService::new(
                DiscussionRepository::new(db.clone()),
                ReactionRepository::new(db.clone()),
                ReplyRepository::new(db.clone()),
                activity.clone(),
            ),
            library_service: LibraryService::new(saved_movie_repo, history_repo, activity),
            feedback_service: FeedbackService::new(
                db.clone(),
                FeedbackRepository::new(db),
                mailer,
                config.mail.operator_address.clone(),
            ),
        })
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` into the request's user.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate(token.trim()).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}

/// Authorization middleware, run after routing.
pub async fn policy_middleware(req: Request<Body>, next: Next) -> Response {
    let required = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|path| route_policy(req.method(), path.as_str()))
        .map_or(Requirement::Admin, |(resource, action)| {
            requirement(resource, action)
        });

    if let Err(rejection) =
        authorize(required, req.extensions().get::<user::Model>()).or_redirect("/", "authorize")
    {
        return rejection.into_response();
    }
    next.run(req).await
}

/// Which policy entry a route answers to.
#[must_use]
pub fn route_policy(method: &Method, path: &str) -> Option<(Resource, Action)> {
    use Action as A;
    use Resource as R;

    let entry = match (method.as_str(), path) {
        ("POST", "/users/sign_up") => (R::Account, A::Create),
        ("PATCH", "/users/profile") => (R::Account, A::Update),
        ("DELETE", "/users/account") => (R::Account, A::Destroy),
        ("POST", "/users/sign_in") => (R::Session, A::Create),
        ("DELETE", "/users/sign_out") => (R::Session, A::Destroy),

        ("GET", "/" | "/movies") => (R::Movie, A::Index),
        ("POST", "/movies") => (R::Movie, A::Create),
        ("GET", "/movies/{id}") => (R::Movie, A::Show),
        ("PATCH", "/movies/{id}") => (R::Movie, A::Update),
        ("DELETE", "/movies/{id}") => (R::Movie, A::Destroy),
        ("GET", "/search") => (R::Movie, A::Search),
        ("GET", "/movies_by_genre/{genre_id}") => (R::Movie, A::ByGenre),
        ("GET", "/up_coming") => (R::Movie, A::UpComing),
        ("GET", "/movies/find_cast_relate_movie/{cast}/{movie_id}") => {
            (R::Movie, A::RelatedByCast)
        }
        ("GET", "/movies/find_director_relate_movie/{director}/{movie_id}") => {
            (R::Movie, A::RelatedByDirector)
        }
        ("POST", "/movies/{id}/save") => (R::Movie, A::Save),
        ("POST", "/movies/{id}/unsave") => (R::Movie, A::Unsave),

        ("GET", "/movies/{id}/comments") => (R::Comment, A::Index),
        ("POST", "/movies/{id}/users/{user_id}/comments") => (R::Comment, A::Create),
        ("DELETE", "/movies/{id}/users/{user_id}/comments/{comment_id}") => {
            (R::Comment, A::Destroy)
        }
        ("PUT", "/movies/{id}/users/{user_id}/comments/{comment_id}/approve") => {
            (R::Comment, A::Approve)
        }

        ("POST", "/movies/{id}/ratings") => (R::Rating, A::Create),
        ("DELETE", "/movies/{id}/ratings/{rating_id}") => (R::Rating, A::Destroy),

        ("GET", "/genres") => (R::Genre, A::Index),
        ("POST", "/genres") => (R::Genre, A::Create),
        ("GET", "/genres/search") => (R::Genre, A::Search),
        ("GET", "/genres/export") => (R::Genre, A::Export),
        ("POST", "/genres/import") => (R::Genre, A::Import),
        ("GET", "/genres/{id}") => (R::Genre, A::Show),
        ("PATCH", "/genres/{id}") => (R::Genre, A::Update),
        ("DELETE", "/genres/{id}") => (R::Genre, A::Destroy),

        ("GET", "/years") => (R::Year, A::Index),
        ("POST", "/years") => (R::Year, A::Create),
        ("GET", "/years/search") => (R::Year, A::Search),
        ("GET", "/years/export") => (R::Year, A::Export),
        ("POST", "/years/import") => (R::Year, A::Import),
        ("GET", "/years/{id}") => (R::Year, A::Show),
        ("PATCH", "/years/{id}") => (R::Year, A::Update),
        ("DELETE", "/years/{id}") => (R::Year, A::Destroy),

        ("GET", "/users") => (R::User, A::Index),
        ("POST", "/users/create_registration") => (R::User, A::Create),
        ("GET", "/users/search") => (R::User, A::Search),
        ("GET", "/users/export") => (R::User, A::Export),
        ("POST", "/users/import") => (R::User, A::Import),
        ("GET", "/users/dashboard") => (R::User, A::Dashboard),
        ("GET", "/users/filter_by_user") => (R::User, A::FilterByUser),
        ("GET", "/users/filter_by_time") => (R::User, A::FilterByTime),
        ("GET", "/users/{id}") => (R::User, A::Show),
        ("PATCH", "/users/{id}") => (R::User, A::Update),
        ("DELETE", "/users/{id}") => (R::User, A::Destroy),
        ("DELETE", "/users/{id}/delete_image") => (R::User, A::DeleteImage),
        ("GET", "/users/{id}/saved_movies") => (R::SavedMovie, A::Index),
        ("POST", "/users/{id}/unsave") => (R::User, A::Unsave),

        ("DELETE", "/activities/delete_all" | "/users/{id}/activities/delete_all") => {
            (R::Activity, A::DeleteAll)
        }
        ("GET", "/activities/export") => (R::Activity, A::Export),
        ("DELETE", "/activities/{id}/delete_single") => (R::Activity, A::Destroy),

        ("GET", "/discussions") => (R::Discussion, A::Index),
        ("POST", "/discussions") => (R::Discussion, A::Create),
        ("GET", "/discussions/{id}") => (R::Discussion, A::Show),
        ("PATCH", "/discussions/{id}") => (R::Discussion, A::Update),
        ("DELETE", "/discussions/{id}") => (R::Discussion, A::Destroy),
        ("POST", "/discussions/{id}/reactions") => (R::Reaction, A::Create),
        ("DELETE", "/discussions/{id}/reactions/{reaction_id}") => (R::Reaction, A::Destroy),
        ("POST", "/discussions/{id}/replies") => (R::Reply, A::Create),
        ("DELETE", "/discussions/{id}/replies/{reply_id}") => (R::Reply, A::Destroy),

        ("GET", "/notifications") => (R::Notification, A::Index),
        ("DELETE", "/notifications/delete_all") => (R::Notification, A::DeleteAll),
        ("DELETE", "/notifications/{id}") => (R::Notification, A::Destroy),

        ("GET", "/histories") => (R::History, A::Index),
        ("DELETE", "/histories/delete_all") => (R::History, A::DeleteAll),
        ("DELETE", "/histories/{id}") => (R::History, A::Destroy),

        ("GET", "/saved_movies") => (R::SavedMovie, A::Index),
        ("POST", "/saved_movies") => (R::SavedMovie, A::Create),

        ("POST", "/feedbacks") => (R::Feedback, A::Create),

        _ => return None,
    };
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_policy_lookup() {
        assert_eq!(
            route_policy(&Method::PUT, "/movies/{id}/users/{user_id}/comments/{comment_id}/approve"),
            Some((Resource::Comment, Action::Approve))
        );
        assert_eq!(
            route_policy(&Method::GET, "/search"),
            Some((Resource::Movie, Action::Search))
        );
        assert_eq!(route_policy(&Method::GET, "/nowhere"), None);
    }
}
