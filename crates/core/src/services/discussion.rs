//! Discussions with their reactions and replies.

use chrono::Utc;
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{
    Page, PageRequest,
    entities::{discussion, reaction, reply, user},
    repositories::{DiscussionRepository, ReactionRepository, ReplyRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::activity::{ActivityKind, ActivityRecorder};

/// Discussions per page.
pub const DISCUSSIONS_PAGE_SIZE: u64 = 10;
/// Replies per page under a discussion.
pub const REPLIES_PAGE_SIZE: u64 = 5;

/// Discussion or reply form.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentInput {
    pub content: String,
}

/// Reaction form.
#[derive(Debug, Clone, Deserialize)]
pub struct ReactionInput {
    pub reaction_type: String,
}

fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Invalid(FieldErrors::single(field, "can't be blank")));
    }
    Ok(value.to_string())
}

fn ensure_owner(user: &user::Model, owner_id: &str) -> AppResult<()> {
    if user.id == owner_id || user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not authorized to perform this action.".to_string(),
        ))
    }
}

/// A discussion page.
#[derive(Debug, Clone, Serialize)]
pub struct DiscussionDetail {
    pub discussion: discussion::Model,
    pub replies: Page<reply::Model>,
    pub reactions: Vec<reaction::Model>,
}

/// Discussion service for business logic.
#[derive(Clone)]
pub struct DiscussionService {
    discussion_repo: DiscussionRepository,
    reaction_repo: ReactionRepository,
    reply_repo: ReplyRepository,
    activity: ActivityRecorder,
    id_gen: IdGenerator,
}

impl DiscussionService {
    /// Create a new discussion service.
    #[must_use]
    pub const fn new(
        discussion_repo: DiscussionRepository,
        reaction_repo: ReactionRepository,
        reply_repo: ReplyRepository,
        activity: ActivityRecorder,
    ) -> Self {
        Self {
            discussion_repo,
            reaction_repo,
            reply_repo,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    async fn get(&self, id: &str) -> AppResult<discussion::Model> {
        self.discussion_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Discussion not found.".to_string()))
    }

    /// Discussions, newest first.
    pub async fn index(
        &self,
        user: &user::Model,
        page: Option<u64>,
    ) -> AppResult<Page<discussion::Model>> {
        let discussions = self
            .discussion_repo
            .list(PageRequest::new(page, DISCUSSIONS_PAGE_SIZE))
            .await?;
        self.activity.record(&user.id, &ActivityKind::BrowsedDiscussions).await;
        Ok(discussions)
    }

    /// A discussion with its replies and reactions.
    pub async fn show(
        &self,
        user: &user::Model,
        id: &str,
        page: Option<u64>,
    ) -> AppResult<DiscussionDetail> {
        let discussion = self.get(id).await?;
        let replies = self
            .reply_repo
            .find_by_discussion(&discussion.id, PageRequest::new(page, REPLIES_PAGE_SIZE))
            .await?;
        let reactions = self.reaction_repo.find_by_discussion(&discussion.id).await?;

        self.activity
            .record(
                &user.id,
                &ActivityKind::ViewedDiscussion {
                    content: discussion.content.clone(),
                },
            )
            .await;
        Ok(DiscussionDetail {
            discussion,
            replies,
            reactions,
        })
    }

    /// Start a discussion.
    pub async fn create(
        &self,
        user: &user::Model,
        input: ContentInput,
    ) -> AppResult<discussion::Model> {
        let content = required("content", &input.content)?;
        let now = Utc::now();
        let discussion = self
            .discussion_repo
            .create(discussion::ActiveModel {
                id: Set(self.id_gen.generate()),
                content: Set(content),
                user_id: Set(user.id.clone()),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await?;

        self.activity
            .record(
                &user.id,
                &ActivityKind::CreatedDiscussion {
                    content: discussion.content.clone(),
                },
            )
            .await;
        Ok(discussion)
    }

    /// Edit a discussion.
    pub async fn update(
        &self,
        user: &user::Model,
        id: &str,
        input: ContentInput,
    ) -> AppResult<discussion::Model> {
        let discussion = self.get(id).await?;
        ensure_owner(user, &discussion.user_id)?;
        let content = required("content", &input.content)?;

        let mut model: discussion::ActiveModel = discussion.into();
        model.content = Set(content);
        model.updated_at = Set(Utc::now().into());
        self.discussion_repo.update(model).await
    }

    /// Delete a discussion. Reactions and replies cascade.
    pub async fn destroy(&self, user: &user::Model, id: &str) -> AppResult<()> {
        let discussion = self.get(id).await?;
        ensure_owner(user, &discussion.user_id)?;

        self.discussion_repo.delete(&discussion.id).await?;
        self.activity.record(&user.id, &ActivityKind::DestroyedDiscussion).await;
        Ok(())
    }

    /// React to a discussion, replacing the user's previous reaction.
    pub async fn react(
        &self,
        user: &user::Model,
        discussion_id: &str,
        input: ReactionInput,
    ) -> AppResult<reaction::Model> {
        let discussion = self.get(discussion_id).await?;
        let reaction_type = required("reaction_type", &input.reaction_type)?;

        let now = Utc::now();
        self.reaction_repo
            .upsert(reaction::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id.clone()),
                discussion_id: Set(discussion.id),
                reaction_type: Set(reaction_type),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await
    }

    /// Withdraw a reaction.
    pub async fn unreact(
        &self,
        user: &user::Model,
        discussion_id: &str,
        reaction_id: &str,
    ) -> AppResult<()> {
        let reaction = self
            .reaction_repo
            .find_by_id(reaction_id)
            .await?
            .filter(|r| r.discussion_id == discussion_id)
            .ok_or_else(|| AppError::NotFound("Reaction not found.".to_string()))?;
        ensure_owner(user, &reaction.user_id)?;

        self.reaction_repo.delete(&reaction.id).await?;
        Ok(())
    }

    /// Reply under a discussion.
    pub async fn reply(
        &self,
        user: &user::Model,
        discussion_id: &str,
        input: ContentInput,
    ) -> AppResult<reply::Model> {
        let discussion = self.get(discussion_id).await?;
        let content = required("content", &input.content)?;

        let now = Utc::now();
        let reply = self
            .reply_repo
            .create(reply::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user.id.clone()),
                discussion_id: Set(discussion.id.clone()),
                content: Set(content),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await?;

        self.activity
            .record(
                &user.id,
                &ActivityKind::AddedReply {
                    reply: reply.content.clone(),
                    discussion: discussion.content,
                },
            )
            .await;
        Ok(reply)
    }

    /// Delete a reply.
    pub async fn delete_reply(
        &self,
        user: &user::Model,
        discussion_id: &str,
        reply_id: &str,
    ) -> AppResult<()> {
        let discussion = self.get(discussion_id).await?;
        let reply = self
            .reply_repo
            .find_by_id(reply_id)
            .await?
            .filter(|r| r.discussion_id == discussion.id)
            .ok_or_else(|| AppError::NotFound("Reply not found.".to_string()))?;
        ensure_owner(user, &reply.user_id)?;

        self.reply_repo.delete(&reply.id).await?;
        self.activity
            .record(
                &user.id,
                &ActivityKind::DeletedReply {
                    discussion: discussion.content,
                },
            )
            .await;
        Ok(())
    }
}
