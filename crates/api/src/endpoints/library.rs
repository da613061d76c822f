//! Saved movies and viewing history of the signed-in user.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
};
use serde::Deserialize;

use super::PageQuery;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Flash, Handled, OrRedirect},
};

const HISTORIES: &str = "/histories";
const SAVED_MOVIES: &str = "/saved_movies";

#[derive(Debug, Deserialize)]
struct SaveForm {
    movie_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/histories", get(history))
        .route("/histories/delete_all", delete(clear_history))
        .route("/histories/{id}", delete(remove_history))
        .route("/saved_movies", get(saved_movies).post(save))
}

async fn history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let movies = state
        .library_service
        .history(&user, query.page)
        .await
        .or_redirect("/", "load your history")?;
    Ok(Json(movies).into_response())
}

async fn remove_history(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Handled {
    state
        .library_service
        .remove_history(&user, &id)
        .await
        .or_redirect(HISTORIES, "remove the movie from your history")?;
    Ok(Flash::notice(HISTORIES, "Movie was removed from your history.").into_response())
}

async fn clear_history(AuthUser(user): AuthUser, State(state): State<AppState>) -> Handled {
    let removed = state
        .library_service
        .clear_history(&user)
        .await
        .or_redirect(HISTORIES, "clear your history")?;
    let flash = if removed == 0 {
        Flash::alert(HISTORIES, "No history found to delete.")
    } else {
        Flash::notice(HISTORIES, "Your history has been cleared.")
    };
    Ok(flash.into_response())
}

async fn saved_movies(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let movies = state
        .library_service
        .saved_movies(&user, query.page)
        .await
        .or_redirect("/", "load saved movies")?;
    Ok(Json(movies).into_response())
}

async fn save(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Form(form): Form<SaveForm>,
) -> Handled {
    let change = state
        .movie_service
        .save(&user, &form.movie_id)
        .await
        .or_redirect(SAVED_MOVIES, "save the movie")?;
    Ok(Flash::notice(SAVED_MOVIES, change.message()).into_response())
}
