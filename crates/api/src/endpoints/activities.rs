//! The admin activity dashboard.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
};
use cinelog_core::{ActivityDeletion, TimeWindow};
use serde::Deserialize;

use super::PageQuery;
use crate::{
    middleware::AppState,
    response::{Flash, Handled, OrRedirect, download},
};

const DASHBOARD: &str = "/users/dashboard";

#[derive(Debug, Default, Deserialize)]
struct UserFilter {
    user_id: Option<String>,
    page: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TimeFilter {
    period: Option<String>,
    page: Option<u64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/dashboard", get(dashboard))
        .route("/users/filter_by_user", get(filter_by_user))
        .route("/users/filter_by_time", get(filter_by_time))
        .route("/users/{id}/activities/delete_all", delete(delete_for_user))
        .route("/activities/delete_all", delete(delete_all))
        .route("/activities/export", get(export))
        .route("/activities/{id}/delete_single", delete(delete_single))
}

fn flash(redirect: String, outcome: ActivityDeletion) -> Flash {
    match outcome {
        ActivityDeletion::UserNotFound => Flash::alert(redirect, outcome.message()),
        _ => Flash::notice(redirect, outcome.message()),
    }
}

async fn dashboard(State(state): State<AppState>, Query(query): Query<PageQuery>) -> Handled {
    let dashboard = state
        .activity_service
        .dashboard(query.page)
        .await
        .or_redirect("/", "load activities")?;
    Ok(Json(dashboard).into_response())
}

async fn filter_by_user(
    State(state): State<AppState>,
    Query(query): Query<UserFilter>,
) -> Handled {
    let user_id = query.user_id.as_deref().filter(|id| !id.is_empty());
    let dashboard = state
        .activity_service
        .filter_by_user(user_id, query.page)
        .await
        .or_redirect(DASHBOARD, "filter activities")?;
    Ok(Json(dashboard).into_response())
}

async fn filter_by_time(
    State(state): State<AppState>,
    Query(query): Query<TimeFilter>,
) -> Handled {
    let dashboard = match query.period.as_deref().filter(|p| !p.is_empty()) {
        None => state.activity_service.dashboard(query.page).await,
        Some(period) => match period.parse::<TimeWindow>() {
            Ok(window) => state.activity_service.filter_by_time(window, query.page).await,
            Err(e) => Err(e),
        },
    }
    .or_redirect(DASHBOARD, "filter activities")?;
    Ok(Json(dashboard).into_response())
}

async fn delete_all(State(state): State<AppState>) -> Handled {
    let outcome = state
        .activity_service
        .delete_all()
        .await
        .or_redirect(DASHBOARD, "delete activities")?;
    Ok(flash(DASHBOARD.to_string(), outcome).into_response())
}

async fn delete_for_user(State(state): State<AppState>, Path(user_id): Path<String>) -> Handled {
    let outcome = state
        .activity_service
        .delete_user_activities(&user_id)
        .await
        .or_redirect(DASHBOARD, "delete activities")?;
    let redirect = match outcome {
        ActivityDeletion::NothingToDeleteForUser => {
            format!("/users/filter_by_user?user_id={}", urlencoding::encode(&user_id))
        }
        _ => DASHBOARD.to_string(),
    };
    Ok(flash(redirect, outcome).into_response())
}

async fn delete_single(State(state): State<AppState>, Path(id): Path<String>) -> Handled {
    let outcome = state
        .activity_service
        .delete_single(&id)
        .await
        .or_redirect(DASHBOARD, "delete the activity")?;
    Ok(flash(DASHBOARD.to_string(), outcome).into_response())
}

async fn export(State(state): State<AppState>) -> Handled {
    let export = state
        .activity_service
        .export()
        .await
        .or_redirect(DASHBOARD, "export activities")?;
    Ok(download(export))
}
