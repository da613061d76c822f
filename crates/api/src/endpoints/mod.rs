//! HTTP endpoints.

mod activities;
mod auth;
mod comments;
mod discussions;
mod feedbacks;
mod genres;
mod library;
mod movies;
mod notifications;
mod ratings;
mod users;
mod years;

use axum::{Router, middleware};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::middleware::{AppState, auth_middleware, policy_middleware};

/// `?page=` on listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

/// `?keyword=&page=` on search routes.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub page: Option<u64>,
}

/// Every route, guarded by the authorization policy.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(movies::router())
        .merge(comments::router())
        .merge(ratings::router())
        .merge(genres::router())
        .merge(years::router())
        .merge(users::router())
        .merge(activities::router())
        .merge(discussions::router())
        .merge(notifications::router())
        .merge(library::router())
        .merge(feedbacks::router())
        .route_layer(middleware::from_fn(policy_middleware))
}

/// The complete application: routes, authentication and request tracing.
pub fn app(state: AppState) -> Router {
    router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
