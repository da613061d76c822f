//! The public feedback form.

use axum::{Json, Router, extract::State, routing::post};
use cinelog_core::{FeedbackInput, FeedbackReply};

use crate::middleware::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/feedbacks", post(create))
}

/// Answers `{success, errors}` for the in-page form; never redirects.
async fn create(
    State(state): State<AppState>,
    Json(input): Json<FeedbackInput>,
) -> Json<FeedbackReply> {
    let result = state.feedback_service.submit(input).await;
    Json(FeedbackReply::from_result(&result))
}
