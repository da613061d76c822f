//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What happened to the notifiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    #[sea_orm(string_value = "created_review")]
    CreatedReview,
    #[sea_orm(string_value = "deleted_comment")]
    DeletedComment,
    #[sea_orm(string_value = "approved_comment")]
    ApprovedComment,
}

/// Kind of entity a notification points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotifiableType {
    #[sea_orm(string_value = "Comment")]
    Comment,
}

/// Typed view of the polymorphic `notifiable` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id")]
pub enum Notifiable {
    Comment(String),
}

impl Notifiable {
    #[must_use]
    pub const fn kind(&self) -> NotifiableType {
        match self {
            Self::Comment(_) => NotifiableType::Comment,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Comment(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    pub recipient_id: String,

    /// The user who triggered the notification
    pub actor_id: String,

    pub action: NotificationAction,

    pub notifiable_type: NotifiableType,

    /// Not a foreign key: the target may already be gone
    pub notifiable_id: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    #[must_use]
    pub fn notifiable(&self) -> Notifiable {
        match self.notifiable_type {
            NotifiableType::Comment => Notifiable::Comment(self.notifiable_id.clone()),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ActorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Actor,
}

impl ActiveModelBehavior for ActiveModel {}
