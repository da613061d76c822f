//! Reviews and their moderation.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use cinelog_common::{AppError, AppResult};
use cinelog_core::{CommentOutcome, CreateCommentInput};

use super::PageQuery;
use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{Flash, Handled, OrRedirect},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movies/{id}/comments", get(index))
        .route("/movies/{id}/users/{user_id}/comments", post(create))
        .route(
            "/movies/{id}/users/{user_id}/comments/{comment_id}",
            delete(destroy),
        )
        .route(
            "/movies/{id}/users/{user_id}/comments/{comment_id}/approve",
            put(approve),
        )
}

/// Failures go back to the movie page, or to the list when the movie or
/// review is gone.
fn or_back_to_movie<T>(result: AppResult<T>, movie_id: &str, action: &'static str) -> Handled<T> {
    let back = match &result {
        Err(AppError::NotFound(_)) => "/movies".to_string(),
        _ => format!("/movies/{movie_id}"),
    };
    result.or_redirect(back, action)
}

fn flash(movie_id: &str, outcome: &CommentOutcome) -> Flash {
    let back = format!("/movies/{movie_id}");
    if outcome.is_success() {
        Flash::notice(back, outcome.message())
    } else {
        Flash::alert(back, outcome.message())
    }
}

async fn index(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let comments = state
        .comment_service
        .visible_comments(&movie_id, viewer.as_ref(), query.page)
        .await
        .or_redirect(format!("/movies/{movie_id}"), "load reviews")?;
    Ok(Json(comments).into_response())
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((movie_id, user_id)): Path<(String, String)>,
    Form(input): Form<CreateCommentInput>,
) -> Handled {
    let outcome = or_back_to_movie(
        state.comment_service.create(&user, &user_id, &movie_id, input).await,
        &movie_id,
        "create the review",
    )?;
    Ok(flash(&movie_id, &outcome).into_response())
}

async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((movie_id, _user_id, comment_id)): Path<(String, String, String)>,
) -> Handled {
    let outcome = or_back_to_movie(
        state.comment_service.destroy(&user, &movie_id, &comment_id).await,
        &movie_id,
        "delete the review",
    )?;
    Ok(flash(&movie_id, &outcome).into_response())
}

async fn approve(
    AuthUser(admin): AuthUser,
    State(state): State<AppState>,
    Path((movie_id, _user_id, comment_id)): Path<(String, String, String)>,
) -> Handled {
    let outcome = or_back_to_movie(
        state.comment_service.approve(&admin, &movie_id, &comment_id).await,
        &movie_id,
        "approve the review",
    )?;
    Ok(flash(&movie_id, &outcome).into_response())
}
