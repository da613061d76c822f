//! Discussion threads with reactions and replies.

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use cinelog_core::{ContentInput, ReactionInput};

use super::PageQuery;
use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{Flash, Handled, OrRedirect},
};

const DISCUSSIONS: &str = "/discussions";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/discussions", get(index).post(create))
        .route("/discussions/{id}", get(show).patch(update).delete(destroy))
        .route("/discussions/{id}/reactions", post(react))
        .route("/discussions/{id}/reactions/{reaction_id}", delete(unreact))
        .route("/discussions/{id}/replies", post(reply))
        .route("/discussions/{id}/replies/{reply_id}", delete(delete_reply))
}

async fn index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let discussions = state
        .discussion_service
        .index(&user, query.page)
        .await
        .or_redirect("/", "load discussions")?;
    Ok(Json(discussions).into_response())
}

async fn show(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Handled {
    let detail = state
        .discussion_service
        .show(&user, &id, query.page)
        .await
        .or_redirect(DISCUSSIONS, "load the discussion")?;
    Ok(Json(detail).into_response())
}

async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Form(input): Form<ContentInput>,
) -> Handled {
    let discussion = state
        .discussion_service
        .create(&user, input)
        .await
        .or_redirect(DISCUSSIONS, "create the discussion")?;
    Ok(Flash::notice(
        format!("/discussions/{}", discussion.id),
        "Discussion was successfully created.",
    )
    .into_response())
}

async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<ContentInput>,
) -> Handled {
    let back = format!("/discussions/{id}");
    state
        .discussion_service
        .update(&user, &id, input)
        .await
        .or_redirect(back.clone(), "update the discussion")?;
    Ok(Flash::notice(back, "Discussion was successfully updated.").into_response())
}

async fn destroy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Handled {
    state
        .discussion_service
        .destroy(&user, &id)
        .await
        .or_redirect(DISCUSSIONS, "destroy the discussion")?;
    Ok(Flash::notice(DISCUSSIONS, "Discussion was successfully destroyed.").into_response())
}

async fn react(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<ReactionInput>,
) -> Handled {
    let back = format!("/discussions/{id}");
    state
        .discussion_service
        .react(&user, &id, input)
        .await
        .or_redirect(back.clone(), "react to the discussion")?;
    Ok(Flash::notice(back, "Reaction was successfully added.").into_response())
}

async fn unreact(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, reaction_id)): Path<(String, String)>,
) -> Handled {
    let back = format!("/discussions/{id}");
    state
        .discussion_service
        .unreact(&user, &id, &reaction_id)
        .await
        .or_redirect(back.clone(), "remove the reaction")?;
    Ok(Flash::notice(back, "Reaction was successfully removed.").into_response())
}

async fn reply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(input): Form<ContentInput>,
) -> Handled {
    let back = format!("/discussions/{id}");
    state
        .discussion_service
        .reply(&user, &id, input)
        .await
        .or_redirect(back.clone(), "reply to the discussion")?;
    Ok(Flash::notice(back, "Reply was successfully created.").into_response())
}

async fn delete_reply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((id, reply_id)): Path<(String, String)>,
) -> Handled {
    let back = format!("/discussions/{id}");
    state
        .discussion_service
        .delete_reply(&user, &id, &reply_id)
        .await
        .or_redirect(back.clone(), "delete the reply")?;
    Ok(Flash::notice(back, "Reply was successfully deleted.").into_response())
}
