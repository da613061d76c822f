//! Role requirements per resource and action.
//!
//! Ownership ("owner or admin") is checked by the owning service before it
//! writes; this table only answers who may reach an action at all.

use cinelog_common::{AppError, AppResult};
use cinelog_db::entities::user;

/// Something a route acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Movie,
    Genre,
    Year,
    User,
    Comment,
    Rating,
    Discussion,
    Reaction,
    Reply,
    Notification,
    Activity,
    Feedback,
    SavedMovie,
    History,
    Session,
    Account,
}

/// What a route does to its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Index,
    Show,
    Create,
    Update,
    Destroy,
    Search,
    Import,
    Export,
    ByGenre,
    UpComing,
    RelatedByCast,
    RelatedByDirector,
    Dashboard,
    FilterByUser,
    FilterByTime,
    Save,
    Unsave,
    Approve,
    DeleteImage,
    DeleteAll,
}

/// Minimum role for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Requirement {
    Public,
    SignedIn,
    Admin,
}

/// Look up the requirement. Pairs missing from the table need an administrator.
#[must_use]
pub const fn requirement(resource: Resource, action: Action) -> Requirement {
    use Action as A;
    use Requirement::{Admin, Public, SignedIn};
    use Resource as R;

    match (resource, action) {
        (
            R::Movie,
            A::Index
            | A::Show
            | A::Search
            | A::ByGenre
            | A::UpComing
            | A::RelatedByCast
            | A::RelatedByDirector,
        )
        | (R::Year, A::Index | A::Show | A::Search)
        | (R::Comment, A::Index)
        | (R::Feedback, A::Create)
        | (R::Session | R::Account, A::Create) => Public,

        (R::Movie, A::Save | A::Unsave)
        | (R::Genre, A::Index | A::Show | A::Search)
        | (R::User, A::Update | A::DeleteImage | A::Unsave)
        | (R::Comment, A::Create | A::Destroy)
        | (R::Rating, A::Create | A::Destroy)
        | (
            R::Discussion,
            A::Index | A::Show | A::Create | A::Update | A::Destroy,
        )
        | (R::Reaction | R::Reply, A::Create | A::Destroy)
        | (R::Notification, A::Index | A::Destroy | A::DeleteAll)
        | (R::SavedMovie, A::Index | A::Create)
        | (R::History, A::Index | A::Destroy | A::DeleteAll)
        | (R::Session, A::Destroy)
        | (R::Account, A::Update | A::Destroy) => SignedIn,

        _ => Admin,
    }
}

/// Check the caller against a requirement.
pub fn authorize(required: Requirement, user: Option<&user::Model>) -> AppResult<()> {
    match (required, user) {
        (Requirement::Public, _) => Ok(()),
        (_, None) => Err(AppError::Unauthorized(
            "You need to sign in or sign up before continuing.".to_string(),
        )),
        (Requirement::Admin, Some(user)) if !user.is_admin => Err(AppError::Forbidden(
            "You are not authorized to perform this action.".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_user(is_admin: bool) -> user::Model {
        user::Model {
            id: "u1".to_string(),
            name: "Member".to_string(),
            email: "member@example.com".to_string(),
            password_hash: String::new(),
            is_admin,
            image_key: None,
            token: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_catalog_is_public() {
        assert_eq!(requirement(Resource::Movie, Action::Search), Requirement::Public);
        assert_eq!(requirement(Resource::Year, Action::Show), Requirement::Public);
    }

    #[test]
    fn test_admin_only_actions() {
        assert_eq!(requirement(Resource::Movie, Action::Create), Requirement::Admin);
        assert_eq!(requirement(Resource::Comment, Action::Approve), Requirement::Admin);
        assert_eq!(requirement(Resource::Genre, Action::Import), Requirement::Admin);
        assert_eq!(requirement(Resource::User, Action::Dashboard), Requirement::Admin);
        assert_eq!(requirement(Resource::Activity, Action::DeleteAll), Requirement::Admin);
    }

    #[test]
    fn test_unlisted_pairs_need_admin() {
        assert_eq!(requirement(Resource::Feedback, Action::Index), Requirement::Admin);
    }

    #[test]
    fn test_authorize() {
        let member = create_test_user(false);
        let admin = create_test_user(true);

        assert!(authorize(Requirement::Public, None).is_ok());
        assert!(matches!(
            authorize(Requirement::SignedIn, None),
            Err(AppError::Unauthorized(_))
        ));
        assert!(authorize(Requirement::SignedIn, Some(&member)).is_ok());
        assert!(matches!(
            authorize(Requirement::Admin, Some(&member)),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize(Requirement::Admin, Some(&admin)).is_ok());
    }
}
