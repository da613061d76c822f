//! User administration and per-user pages.

use axum::{
    Form, Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use cinelog_common::{AppError, AppResult};
use cinelog_core::{UserForm, UserUpdate};
use cinelog_db::entities::user;
use serde::Deserialize;

use super::{PageQuery, SearchQuery};
use crate::{
    extractors::{AuthUser, FilePart, FormData},
    middleware::AppState,
    response::{Flash, Handled, OrRedirect, download},
};

#[derive(Debug, Deserialize)]
struct MovieForm {
    movie_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/create_registration", post(create_registration))
        .route("/users/search", get(search))
        .route("/users/export", get(export))
        .route("/users/import", post(import))
        .route("/users/{id}", get(show).patch(update).delete(destroy))
        .route("/users/{id}/delete_image", delete(delete_image))
        .route("/users/{id}/saved_movies", get(saved_movies))
        .route("/users/{id}/unsave", post(unsave))
}

/// The account a per-user page is about: the caller, or anyone for an admin.
async fn subject(state: &AppState, actor: user::Model, id: &str) -> AppResult<user::Model> {
    if actor.id == id {
        Ok(actor)
    } else if actor.is_admin {
        state.user_service.get(id).await
    } else {
        Err(AppError::Forbidden(
            "You are not authorized to perform this action.".to_string(),
        ))
    }
}

fn user_update(form: &FormData) -> UserUpdate {
    UserUpdate {
        name: form.text("name"),
        email: form.text("email"),
        password: form.text("password"),
        is_admin: form.flag("is_admin"),
    }
}

async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Handled {
    let users = state
        .user_service
        .list(query.page)
        .await
        .or_redirect("/", "load users")?;
    Ok(Json(users).into_response())
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Handled {
    let user = state
        .user_service
        .get(&id)
        .await
        .or_redirect("/users", "load the user")?;
    Ok(Json(user).into_response())
}

async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Handled {
    let users = state
        .user_service
        .search(query.keyword.as_deref().unwrap_or_default(), query.page)
        .await
        .or_redirect("/users", "search users")?;
    Ok(Json(users).into_response())
}

async fn create_registration(
    State(state): State<AppState>,
    Form(form): Form<UserForm>,
) -> Handled {
    state
        .user_service
        .create_registration(form)
        .await
        .or_redirect("/users", "create the user")?;
    Ok(Flash::notice("/users", "User was successfully created.").into_response())
}

async fn update(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Handled {
    let back = format!("/users/{id}");
    let mut form = FormData::read(multipart)
        .await
        .or_redirect(back.clone(), "update the user")?;
    let image = form.take_file("image").map(FilePart::into_image);
    state
        .user_service
        .update(&actor, &id, user_update(&form), image)
        .await
        .or_redirect("/", "update the user")?;
    Ok(Flash::notice(back, "User was successfully updated.").into_response())
}

async fn destroy(State(state): State<AppState>, Path(id): Path<String>) -> Handled {
    state
        .user_service
        .destroy(&id)
        .await
        .or_redirect("/users", "destroy the user")?;
    Ok(Flash::notice("/users", "User was successfully destroyed.").into_response())
}

async fn delete_image(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Handled {
    state
        .user_service
        .delete_image(&actor, &id)
        .await
        .or_redirect("/", "delete the image")?;
    Ok(Flash::notice(format!("/users/{id}"), "Image was successfully deleted.").into_response())
}

async fn saved_movies(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let owner = subject(&state, actor, &id)
        .await
        .or_redirect("/", "load saved movies")?;
    let movies = state
        .library_service
        .saved_movies(&owner, query.page)
        .await
        .or_redirect("/", "load saved movies")?;
    Ok(Json(movies).into_response())
}

async fn unsave(
    AuthUser(actor): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<MovieForm>,
) -> Handled {
    let back = format!("/users/{id}/saved_movies");
    let owner = subject(&state, actor, &id)
        .await
        .or_redirect("/", "remove the movie from the list")?;
    let change = state
        .movie_service
        .unsave(&owner, &form.movie_id)
        .await
        .or_redirect(back.clone(), "remove the movie from the list")?;
    Ok(Flash::notice(back, change.message()).into_response())
}

async fn import(State(state): State<AppState>, multipart: Multipart) -> Handled {
    let mut form = FormData::read(multipart)
        .await
        .or_redirect("/users", "import users")?;
    let summary = state
        .user_service
        .import(form.take_file("file").map(FilePart::into_upload))
        .await
        .or_redirect("/users", "import users")?;
    Ok(Flash::from_result("/users", summary.message("users")).into_response())
}

async fn export(State(state): State<AppState>) -> Handled {
    let export = state
        .user_service
        .export()
        .await
        .or_redirect("/users", "export users")?;
    Ok(download(export))
}
