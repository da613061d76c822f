//! Movie catalog endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use cinelog_core::MovieInput;

use super::{PageQuery, SearchQuery};
use crate::{
    extractors::{AuthUser, FilePart, FormData, MaybeAuthUser},
    middleware::AppState,
    response::{Flash, Handled, OrRedirect},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/movies", get(index).post(create))
        .route("/movies/{id}", get(show).patch(update).delete(destroy))
        .route("/movies/{id}/save", post(save))
        .route("/movies/{id}/unsave", post(unsave))
        .route("/search", get(search))
        .route("/movies_by_genre/{genre_id}", get(by_genre))
        .route("/up_coming", get(up_coming))
        .route(
            "/movies/find_cast_relate_movie/{cast}/{movie_id}",
            get(related_by_cast),
        )
        .route(
            "/movies/find_director_relate_movie/{director}/{movie_id}",
            get(related_by_director),
        )
}

/// Movie fields from a multipart form. `genre_ids[]` repeats.
fn movie_input(form: &FormData) -> MovieInput {
    MovieInput {
        name: form.text_or_default("name"),
        review: form.text_or_default("review"),
        casts: form.text("casts"),
        country: form.text("country"),
        production: form.text("production"),
        director: form.text("director"),
        release_date: form
            .text("release_date")
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
        duration: form.text_or_default("duration"),
        trailer_url: form.text_or_default("trailer_url"),
        genre_ids: form.all("genre_ids"),
    }
}

async fn index(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let listing = state
        .catalog_service
        .index(viewer.as_ref(), query.page)
        .await
        .or_redirect("/", "load movies")?;
    Ok(Json(listing).into_response())
}

async fn show(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let detail = state
        .movie_service
        .show(viewer.as_ref(), &id, query.page)
        .await
        .or_redirect("/movies", "load the movie")?;
    Ok(Json(detail).into_response())
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Handled {
    let mut form = FormData::read(multipart)
        .await
        .or_redirect("/movies", "create the movie")?;
    let image = form.take_file("image").map(FilePart::into_image);
    let movie = state
        .movie_service
        .create(&user, movie_input(&form), image)
        .await
        .or_redirect("/movies", "create the movie")?;
    Ok(Flash::notice(
        format!("/movies/{}", movie.id),
        "Movie was successfully created.",
    )
    .into_response())
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Handled {
    let back = format!("/movies/{id}");
    let mut form = FormData::read(multipart)
        .await
        .or_redirect(back.clone(), "update the movie")?;
    let image = form.take_file("image").map(FilePart::into_image);
    state
        .movie_service
        .update(&id, movie_input(&form), image)
        .await
        .or_redirect(back.clone(), "update the movie")?;
    Ok(Flash::notice(back, "Movie was successfully updated.").into_response())
}

async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Handled {
    state
        .movie_service
        .destroy(&id)
        .await
        .or_redirect("/movies", "destroy the movie")?;
    Ok(Flash::notice("/movies", "Movie was successfully destroyed.").into_response())
}

async fn save(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Handled {
    let back = format!("/movies/{id}");
    let change = state
        .movie_service
        .save(&user, &id)
        .await
        .or_redirect(back.clone(), "save the movie")?;
    Ok(Flash::notice(back, change.message()).into_response())
}

async fn unsave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Handled {
    let back = format!("/movies/{id}");
    let change = state
        .movie_service
        .unsave(&user, &id)
        .await
        .or_redirect(back.clone(), "remove the movie from your list")?;
    Ok(Flash::notice(back, change.message()).into_response())
}

async fn search(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Handled {
    let listing = state
        .catalog_service
        .search(viewer.as_ref(), query.keyword.as_deref(), query.page)
        .await
        .or_redirect("/", "search movies")?;
    Ok(Json(listing).into_response())
}

async fn by_genre(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(genre_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let listing = state
        .catalog_service
        .by_genre(viewer.as_ref(), &genre_id, query.page)
        .await
        .or_redirect("/", "load the genre")?;
    Ok(Json(listing).into_response())
}

async fn up_coming(MaybeAuthUser(viewer): MaybeAuthUser, State(state): State<AppState>) -> Handled {
    let movies = state
        .catalog_service
        .upcoming(viewer.as_ref())
        .await
        .or_redirect("/", "load upcoming movies")?;
    Ok(Json(movies).into_response())
}

async fn related_by_cast(
    State(state): State<AppState>,
    Path((cast, movie_id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let movies = state
        .catalog_service
        .related_by_cast(&cast, &movie_id, query.page)
        .await
        .or_redirect(format!("/movies/{movie_id}"), "load related movies")?;
    Ok(Json(movies).into_response())
}

async fn related_by_director(
    State(state): State<AppState>,
    Path((director, movie_id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let movies = state
        .catalog_service
        .related_by_director(&director, &movie_id, query.page)
        .await
        .or_redirect(format!("/movies/{movie_id}"), "load related movies")?;
    Ok(Json(movies).into_response())
}
