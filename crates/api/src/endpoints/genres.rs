//! Genre administration.

use axum::{
    Form, Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use cinelog_core::GenreInput;

use super::{PageQuery, SearchQuery};
use crate::{
    extractors::{FilePart, FormData, MaybeAuthUser},
    middleware::AppState,
    response::{Flash, Handled, OrRedirect, download},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/genres", get(index).post(create))
        .route("/genres/search", get(search))
        .route("/genres/export", get(export))
        .route("/genres/import", post(import))
        .route("/genres/{id}", get(show).patch(update).delete(destroy))
}

async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Handled {
    let genres = state
        .genre_service
        .list(query.page)
        .await
        .or_redirect("/", "load genres")?;
    Ok(Json(genres).into_response())
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let listing = state
        .catalog_service
        .by_genre(viewer.as_ref(), &id, query.page)
        .await
        .or_redirect("/genres", "load the genre")?;
    Ok(Json(listing).into_response())
}

async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Handled {
    let genres = state
        .genre_service
        .search(query.keyword.as_deref(), query.page)
        .await
        .or_redirect("/genres", "search genres")?;
    Ok(Json(genres).into_response())
}

async fn create(State(state): State<AppState>, Form(input): Form<GenreInput>) -> Handled {
    state
        .genre_service
        .create(input)
        .await
        .or_redirect("/genres", "create the genre")?;
    Ok(Flash::notice("/genres", "Genre was successfully created.").into_response())
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<GenreInput>,
) -> Handled {
    state
        .genre_service
        .update(&id, input)
        .await
        .or_redirect("/genres", "update the genre")?;
    Ok(Flash::notice("/genres", "Genre was successfully updated.").into_response())
}

async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Handled {
    state
        .genre_service
        .destroy(&id)
        .await
        .or_redirect("/genres", "destroy the genre")?;
    Ok(Flash::notice("/genres", "Genre was successfully destroyed.").into_response())
}

async fn import(State(state): State<AppState>, multipart: Multipart) -> Handled {
    let mut form = FormData::read(multipart)
        .await
        .or_redirect("/genres", "import genres")?;
    let summary = state
        .genre_service
        .import(form.take_file("file").map(FilePart::into_upload))
        .await
        .or_redirect("/genres", "import genres")?;
    Ok(Flash::from_result("/genres", summary.message("genres")).into_response())
}

async fn export(State(state): State<AppState>) -> Handled {
    let export = state
        .genre_service
        .export()
        .await
        .or_redirect("/genres", "export genres")?;
    Ok(download(export))
}
