//! Star ratings.

use axum::{
    Form, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, post},
};
use cinelog_core::RatingInput;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Flash, Handled, OrRedirect},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/movies/{id}/ratings", post(create))
        .route("/movies/{id}/ratings/{rating_id}", delete(destroy))
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
    Form(input): Form<RatingInput>,
) -> Handled {
    let back = format!("/movies/{movie_id}");
    let change = state
        .rating_service
        .rate(&user, &movie_id, input)
        .await
        .or_redirect(back.clone(), "rate the movie")?;
    Ok(Flash::notice(back, change.message()).into_response())
}

async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((movie_id, rating_id)): Path<(String, String)>,
) -> Handled {
    let back = format!("/movies/{movie_id}");
    let change = state
        .rating_service
        .destroy(&user, &rating_id)
        .await
        .or_redirect(back.clone(), "remove the rating")?;
    Ok(Flash::notice(back, change.message()).into_response())
}
