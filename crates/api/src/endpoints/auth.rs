//! Sign up, sign in and account self-service.

use axum::{
    Form, Json, Router,
    extract::{Multipart, State},
    response::IntoResponse,
    routing::{delete, patch, post},
};
use cinelog_core::RegisterInput;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, FilePart, FormData},
    middleware::AppState,
    response::{Flash, Handled, OrRedirect, SIGN_IN_PATH},
};

#[derive(Debug, Deserialize)]
struct SignInForm {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct DeleteAccountForm {
    #[serde(default)]
    current_password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/sign_up", post(sign_up))
        .route("/users/sign_in", post(sign_in))
        .route("/users/sign_out", delete(sign_out))
        .route("/users/profile", patch(update_profile))
        .route("/users/account", delete(delete_account))
}

async fn sign_up(State(state): State<AppState>, Form(input): Form<RegisterInput>) -> Handled {
    let session = state
        .user_service
        .register(input)
        .await
        .or_redirect("/users/sign_up", "sign up")?;
    Ok(Json(session).into_response())
}

async fn sign_in(State(state): State<AppState>, Form(form): Form<SignInForm>) -> Handled {
    let session = state
        .user_service
        .sign_in(&form.email, &form.password)
        .await
        .or_redirect(SIGN_IN_PATH, "sign in")?;
    Ok(Json(session).into_response())
}

async fn sign_out(AuthUser(user): AuthUser, State(state): State<AppState>) -> Handled {
    state
        .user_service
        .sign_out(&user)
        .await
        .or_redirect("/", "sign out")?;
    Ok(Flash::notice("/", "Signed out successfully.").into_response())
}

async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Handled {
    let mut form = FormData::read(multipart)
        .await
        .or_redirect("/", "update your profile")?;
    let image = form.take_file("image").map(FilePart::into_image);
    state
        .user_service
        .update_profile(&user, form.text("name"), image)
        .await
        .or_redirect("/", "update your profile")?;
    Ok(Flash::notice("/", "Your account has been updated successfully.").into_response())
}

async fn delete_account(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Form(form): Form<DeleteAccountForm>,
) -> Handled {
    state
        .user_service
        .delete_account(&user, &form.current_password)
        .await
        .or_redirect("/", "delete your account")?;
    Ok(Flash::notice("/", "Your account has been successfully cancelled.").into_response())
}
