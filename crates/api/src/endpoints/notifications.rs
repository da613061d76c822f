//! The signed-in user's notifications.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
};
use cinelog_core::Dismissal;

use super::PageQuery;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Flash, Handled, OrRedirect},
};

const NOTIFICATIONS: &str = "/notifications";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(index))
        .route("/notifications/delete_all", delete(delete_all))
        .route("/notifications/{id}", delete(destroy))
}

fn flash(outcome: Dismissal) -> Flash {
    if outcome.is_success() {
        Flash::notice(NOTIFICATIONS, outcome.message())
    } else {
        Flash::alert(NOTIFICATIONS, outcome.message())
    }
}

async fn index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let notifications = state
        .notification_service
        .list(&user.id, query.page)
        .await
        .or_redirect("/", "load notifications")?;
    Ok(Json(notifications).into_response())
}

async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Handled {
    let outcome = state
        .notification_service
        .destroy(&user.id, &id)
        .await
        .or_redirect(NOTIFICATIONS, "delete the notification")?;
    Ok(flash(outcome).into_response())
}

async fn delete_all(AuthUser(user): AuthUser, State(state): State<AppState>) -> Handled {
    let outcome = state
        .notification_service
        .delete_all(&user.id)
        .await
        .or_redirect(NOTIFICATIONS, "delete notifications")?;
    Ok(flash(outcome).into_response())
}
