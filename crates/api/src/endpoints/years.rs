//! Release year administration.

use axum::{
    Form, Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use cinelog_core::YearInput;

use super::{PageQuery, SearchQuery};
use crate::{
    extractors::{FilePart, FormData, MaybeAuthUser},
    middleware::AppState,
    response::{Flash, Handled, OrRedirect, download},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/years", get(index).post(create))
        .route("/years/search", get(search))
        .route("/years/export", get(export))
        .route("/years/import", post(import))
        .route("/years/{id}", get(show).patch(update).delete(destroy))
}

async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Handled {
    let years = state
        .year_service
        .list(query.page)
        .await
        .or_redirect("/", "load years")?;
    Ok(Json(years).into_response())
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let listing = state
        .catalog_service
        .by_year(viewer.as_ref(), &id, query.page)
        .await
        .or_redirect("/years", "load the year")?;
    Ok(Json(listing).into_response())
}

async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Handled {
    let years = state
        .year_service
        .search(query.keyword.as_deref(), query.page)
        .await
        .or_redirect("/years", "search years")?;
    Ok(Json(years).into_response())
}

async fn create(State(state): State<AppState>, Form(input): Form<YearInput>) -> Handled {
    state
        .year_service
        .create(input)
        .await
        .or_redirect("/years", "create the year")?;
    Ok(Flash::notice("/years", "Year was successfully created.").into_response())
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<YearInput>,
) -> Handled {
    state
        .year_service
        .update(&id, input)
        .await
        .or_redirect("/years", "update the year")?;
    Ok(Flash::notice("/years", "Year was successfully updated.").into_response())
}

async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Handled {
    state
        .year_service
        .destroy(&id)
        .await
        .or_redirect("/years", "destroy the year")?;
    Ok(Flash::notice("/years", "Year was successfully destroyed.").into_response())
}

async fn import(State(state): State<AppState>, multipart: Multipart) -> Handled {
    let mut form = FormData::read(multipart)
        .await
        .or_redirect("/years", "import years")?;
    let summary = state
        .year_service
        .import(form.take_file("file").map(FilePart::into_upload))
        .await
        .or_redirect("/years", "import years")?;
    Ok(Flash::from_result("/years", summary.message("years")).into_response())
}

async fn export(State(state): State<AppState>) -> Handled {
    let export = state
        .year_service
        .export()
        .await
        .or_redirect("/years", "export years")?;
    Ok(download(export))
}
