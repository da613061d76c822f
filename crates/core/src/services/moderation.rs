//! Comment moderation and notification fan-out.
//!
//! A review written by a regular user starts out pending and every admin is
//! notified. Approval swaps those pending notifications for a single
//! `approved_comment` notification to the author. Each write path runs in one
//! transaction so a comment never exists without its notifications.

use std::sync::Arc;

use chrono::Utc;
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{
    Page, PageRequest,
    entities::{
        comment, movie,
        notification::{self, Notifiable, NotificationAction},
        user,
    },
    repositories::{CommentRepository, MovieRepository, NotificationRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;

use super::activity::{ActivityKind, ActivityRecorder};

/// Comments shown per page under a movie.
pub const COMMENTS_PAGE_SIZE: u64 = 5;

const MIN_LENGTH: usize = 100;
const MAX_LENGTH: usize = 600;
const LENGTH_MESSAGE: &str =
    "Review cannot be blank and must be at least 100 characters and at most 600 characters.";

/// Input for writing a review.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentInput {
    pub description: String,
}

impl CreateCommentInput {
    fn validate(&self) -> AppResult<()> {
        let length = self.description.chars().count();
        if self.description.trim().is_empty() || !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(AppError::Invalid(FieldErrors::single("description", LENGTH_MESSAGE)));
        }
        Ok(())
    }
}

/// Result of a moderation action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    /// Written by an admin, visible right away
    Published(comment::Model),
    /// Waiting for an admin
    Pending(comment::Model),
    Approved(comment::Model),
    Deleted,
    /// The row was already gone
    DeleteFailed,
}

impl CommentOutcome {
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Published(_) => "Review was successfully created.",
            Self::Pending(_) => "Your Review is pending. Admin will approve it soon.",
            Self::Approved(_) => "Review approved successfully.",
            Self::Deleted => "Review was successfully deleted.",
            Self::DeleteFailed => "Error deleting review.",
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::DeleteFailed)
    }
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    db: Arc<DatabaseConnection>,
    comment_repo: CommentRepository,
    notification_repo: NotificationRepository,
    movie_repo: MovieRepository,
    user_repo: UserRepository,
    activity: ActivityRecorder,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        comment_repo: CommentRepository,
        notification_repo: NotificationRepository,
        movie_repo: MovieRepository,
        user_repo: UserRepository,
        activity: ActivityRecorder,
    ) -> Self {
        Self {
            db,
            comment_repo,
            notification_repo,
            movie_repo,
            user_repo,
            activity,
            id_gen: IdGenerator::new(),
        }
    }

    /// Comments of a movie as `viewer` may see them.
    ///
    /// Admins see every comment; everyone else only approved ones.
    pub async fn visible_comments(
        &self,
        movie_id: &str,
        viewer: Option<&user::Model>,
        page: Option<u64>,
    ) -> AppResult<Page<comment::Model>> {
        let include_pending = viewer.is_some_and(|u| u.is_admin);
        self.comment_repo
            .find_by_movie(movie_id, include_pending, PageRequest::new(page, COMMENTS_PAGE_SIZE))
            .await
    }

    /// Write a review on a movie.
    pub async fn create(
        &self,
        author: &user::Model,
        path_user_id: &str,
        movie_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<CommentOutcome> {
        if author.id != path_user_id {
            return Err(AppError::Forbidden(
                "You can only write reviews as yourself.".to_string(),
            ));
        }
        input.validate()?;

        let movie = self.movie_repo.get_by_id(movie_id).await?;
        let admins = if author.is_admin {
            Vec::new()
        } else {
            self.user_repo.find_admins().await?
        };

        let now = Utc::now();
        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            description: Set(input.description),
            status: Set(author.is_admin),
            user_id: Set(author.id.clone()),
            movie_id: Set(movie.id.clone()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = self.db.begin().await?;
        let comment = self.comment_repo.create_in(&txn, model).await?;

        if author.is_admin {
            txn.commit().await?;
            tracing::info!(comment_id = %comment.id, movie_id = %movie.id, "Admin review published");
            return Ok(CommentOutcome::Published(comment));
        }

        let notifiable = Notifiable::Comment(comment.id.clone());
        let fan_out: Vec<_> = admins
            .iter()
            .map(|admin| {
                self.notification(&admin.id, &author.id, NotificationAction::CreatedReview, &notifiable)
            })
            .collect();
        self.notification_repo.create_many_in(&txn, fan_out).await?;
        self.activity
            .record_in(&txn, &author.id, &ActivityKind::AddedReview { movie: movie.name.clone() })
            .await?;
        txn.commit().await?;

        tracing::info!(
            comment_id = %comment.id,
            movie_id = %movie.id,
            admins = admins.len(),
            "Review pending approval"
        );
        Ok(CommentOutcome::Pending(comment))
    }

    /// Delete a review and tell its author.
    pub async fn destroy(
        &self,
        actor: &user::Model,
        movie_id: &str,
        comment_id: &str,
    ) -> AppResult<CommentOutcome> {
        let movie = self.movie_repo.get_by_id(movie_id).await?;
        let comment = self.find_on_movie(&movie, comment_id).await?;
        if comment.user_id != actor.id && !actor.is_admin {
            return Err(AppError::Forbidden(
                "You are not authorized to perform this action.".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        if self.comment_repo.delete_in(&txn, &comment.id).await? == 0 {
            txn.rollback().await?;
            tracing::warn!(comment_id = %comment.id, "Review vanished before it could be deleted");
            return Ok(CommentOutcome::DeleteFailed);
        }

        let notifiable = Notifiable::Comment(comment.id.clone());
        self.notification_repo
            .delete_for_notifiable_in(&txn, &notifiable, NotificationAction::CreatedReview)
            .await?;
        self.notification_repo
            .create_in(
                &txn,
                self.notification(
                    &comment.user_id,
                    &actor.id,
                    NotificationAction::DeletedComment,
                    &notifiable,
                ),
            )
            .await?;
        self.activity
            .record_in(&txn, &actor.id, &ActivityKind::DeletedReview { movie: movie.name })
            .await?;
        txn.commit().await?;

        tracing::info!(comment_id = %comment.id, actor_id = %actor.id, "Review deleted");
        Ok(CommentOutcome::Deleted)
    }

    /// Make a pending review visible.
    pub async fn approve(
        &self,
        admin: &user::Model,
        movie_id: &str,
        comment_id: &str,
    ) -> AppResult<CommentOutcome> {
        if !admin.is_admin {
            return Err(AppError::Forbidden(
                "You are not authorized to perform this action.".to_string(),
            ));
        }

        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.movie_id == movie_id)
            .ok_or_else(|| AppError::NotFound("Review not found.".to_string()))?;
        if comment.is_approved() {
            return Ok(CommentOutcome::Approved(comment));
        }
        let author = self.user_repo.get_by_id(&comment.user_id).await?;

        let txn = self.db.begin().await?;
        let comment = self.comment_repo.approve_in(&txn, comment).await?;

        if !author.is_admin {
            let notifiable = Notifiable::Comment(comment.id.clone());
            self.notification_repo
                .delete_for_notifiable_in(&txn, &notifiable, NotificationAction::CreatedReview)
                .await?;
            self.notification_repo
                .create_in(
                    &txn,
                    self.notification(
                        &author.id,
                        &admin.id,
                        NotificationAction::ApprovedComment,
                        &notifiable,
                    ),
                )
                .await?;
        }
        txn.commit().await?;

        tracing::info!(comment_id = %comment.id, admin_id = %admin.id, "Review approved");
        Ok(CommentOutcome::Approved(comment))
    }

    async fn find_on_movie(&self, movie: &movie::Model, comment_id: &str) -> AppResult<comment::Model> {
        self.comment_repo
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.movie_id == movie.id)
            .ok_or_else(|| AppError::NotFound("Review not found.".to_string()))
    }

    fn notification(
        &self,
        recipient_id: &str,
        actor_id: &str,
        action: NotificationAction,
        notifiable: &Notifiable,
    ) -> notification::ActiveModel {
        notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.to_string()),
            actor_id: Set(actor_id.to_string()),
            action: Set(action),
            notifiable_type: Set(notifiable.kind()),
            notifiable_id: Set(notifiable.id().to_string()),
            created_at: Set(Utc::now().into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cinelog_db::{entities::activity, repositories::ActivityRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Statement, Transaction, Value};

    fn create_test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            is_admin,
            image_key: None,
            token: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_movie(id: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            name: "Heat".to_string(),
            review: "Crime epic".to_string(),
            casts: Some("Al Pacino, Robert De Niro".to_string()),
            release_date: NaiveDate::from_ymd_opt(1995, 12, 15).unwrap(),
            country: Some("USA".to_string()),
            production: None,
            director: Some("Michael Mann".to_string()),
            duration: "2h 50m".to_string(),
            trailer_url: "https://example.com/heat".to_string(),
            rating: None,
            user_id: Some("admin".to_string()),
            image_key: "movies/heat.jpg".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_comment(id: &str, user_id: &str, status: bool) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            description: "a".repeat(150),
            status,
            user_id: user_id.to_string(),
            movie_id: "m1".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn create_test_notification(id: &str, action: NotificationAction) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: "u1".to_string(),
            actor_id: "admin".to_string(),
            action,
            notifiable_type: notification::NotifiableType::Comment,
            notifiable_id: "c1".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_activity(action: &str) -> activity::Model {
        activity::Model {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            action: action.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn service(db: &Arc<DatabaseConnection>) -> CommentService {
        CommentService::new(
            db.clone(),
            CommentRepository::new(db.clone()),
            NotificationRepository::new(db.clone()),
            MovieRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            ActivityRecorder::new(ActivityRepository::new(db.clone())),
        )
    }

    fn statements(service: CommentService, db: Arc<DatabaseConnection>) -> String {
        drop(service);
        let db = Arc::try_unwrap(db).ok().unwrap();
        format!("{:?}", db.into_transaction_log()).replace("\\\"", "\"")
    }

    fn transactions(service: CommentService, db: Arc<DatabaseConnection>) -> Vec<Transaction> {
        drop(service);
        Arc::try_unwrap(db).ok().unwrap().into_transaction_log()
    }

    fn inserts_into<'a>(log: &'a [Transaction], table: &str) -> Vec<&'a Statement> {
        let prefix = format!(r#"INSERT INTO "{table}""#);
        log.iter()
            .flat_map(Transaction::statements)
            .filter(|stmt| stmt.sql.starts_with(&prefix))
            .collect()
    }

    fn bound_strings(stmt: &Statement) -> Vec<String> {
        stmt.values
            .iter()
            .flat_map(|values| values.0.iter())
            .filter_map(|value| match value {
                Value::String(Some(s)) => Some(s.as_ref().clone()),
                _ => None,
            })
            .collect()
    }

    fn count(values: &[String], needle: &str) -> usize {
        values.iter().filter(|v| v.as_str() == needle).count()
    }

    fn valid_input() -> CreateCommentInput {
        CreateCommentInput {
            description: "a".repeat(150),
        }
    }

    #[test]
    fn test_validate_length_bounds() {
        let short = CreateCommentInput { description: "a".repeat(99) };
        let long = CreateCommentInput { description: "a".repeat(601) };
        let blank = CreateCommentInput { description: " ".repeat(150) };
        let lower = CreateCommentInput { description: "a".repeat(100) };
        let upper = CreateCommentInput { description: "é".repeat(600) };

        for input in [short, long, blank] {
            match input.validate() {
                Err(AppError::Invalid(fields)) => {
                    assert_eq!(fields.get("description").unwrap(), [LENGTH_MESSAGE.to_string()]);
                }
                other => panic!("Expected Invalid error, got {other:?}"),
            }
        }
        assert!(lower.validate().is_ok());
        assert!(upper.validate().is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_other_users_path() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service(&db);

        let result = service
            .create(&create_test_user("u1", false), "u2", "m1", valid_input())
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_by_regular_user_is_pending_and_notifies_admins() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([vec![
                    create_test_user("admin1", true),
                    create_test_user("admin2", true),
                ]])
                .append_query_results([[create_test_comment("c1", "u1", false)]])
                .append_exec_results([exec(2)])
                .append_query_results([[create_test_activity("Added review in 'Heat'")]])
                .into_connection(),
        );
        let service = service(&db);

        let outcome = service
            .create(&create_test_user("u1", false), "u1", "m1", valid_input())
            .await
            .unwrap();

        match &outcome {
            CommentOutcome::Pending(comment) => assert!(!comment.status),
            other => panic!("Expected pending comment, got {other:?}"),
        }
        assert_eq!(outcome.message(), "Your Review is pending. Admin will approve it soon.");

        let log = transactions(service, db);
        let inserts = inserts_into(&log, "notification");
        assert_eq!(inserts.len(), 1);
        let values = bound_strings(inserts[0]);
        assert_eq!(count(&values, "created_review"), 2);
        assert_eq!(count(&values, "admin1"), 1);
        assert_eq!(count(&values, "admin2"), 1);
        assert_eq!(count(&values, "u1"), 2);

        // Comment, fan-out and activity commit together
        let txn = log
            .iter()
            .find(|t| t.statements().iter().any(|s| s.sql.starts_with(r#"INSERT INTO "notification""#)))
            .unwrap();
        let sql: Vec<&str> = txn.statements().iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(sql.first().copied(), Some("BEGIN"));
        assert_eq!(sql.last().copied(), Some("COMMIT"));
        assert!(sql.iter().any(|s| s.starts_with(r#"INSERT INTO "comment""#)));
        assert!(sql.iter().any(|s| s.starts_with(r#"INSERT INTO "activity""#)));
    }

    #[tokio::test]
    async fn test_create_by_admin_is_published_without_notifications() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_comment("c1", "admin", true)]])
                .into_connection(),
        );
        let service = service(&db);

        let outcome = service
            .create(&create_test_user("admin", true), "admin", "m1", valid_input())
            .await
            .unwrap();

        assert!(matches!(&outcome, CommentOutcome::Published(c) if c.status));
        assert_eq!(outcome.message(), "Review was successfully created.");

        let log = statements(service, db);
        assert!(!log.contains(r#""notification""#));
        assert!(!log.contains(r#""activity""#));
    }

    #[tokio::test]
    async fn test_create_failure_surfaces_error() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_user("admin1", true)]])
                .append_query_results([[create_test_comment("c1", "u1", false)]])
                .append_exec_errors([sea_orm::DbErr::Custom("disk full".to_string())])
                .into_connection(),
        );
        let service = service(&db);

        let result = service
            .create(&create_test_user("u1", false), "u1", "m1", valid_input())
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_destroy_notifies_author() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_comment("c1", "u1", true)]])
                .append_exec_results([exec(1), exec(0)])
                .append_query_results([[create_test_notification(
                    "n1",
                    NotificationAction::DeletedComment,
                )]])
                .append_query_results([[create_test_activity("Deleted review in 'Heat'")]])
                .into_connection(),
        );
        let service = service(&db);

        let outcome = service
            .destroy(&create_test_user("admin", true), "m1", "c1")
            .await
            .unwrap();
        assert_eq!(outcome, CommentOutcome::Deleted);

        let log = statements(service, db);
        assert!(log.contains("deleted_comment"));
        assert!(log.contains(r#"DELETE FROM "comment""#));
    }

    #[tokio::test]
    async fn test_destroy_of_vanished_row_creates_no_notification() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_comment("c1", "u1", true)]])
                .append_exec_results([exec(0)])
                .into_connection(),
        );
        let service = service(&db);

        let outcome = service
            .destroy(&create_test_user("u1", false), "m1", "c1")
            .await
            .unwrap();
        assert_eq!(outcome, CommentOutcome::DeleteFailed);
        assert!(!outcome.is_success());

        let log = statements(service, db);
        assert!(!log.contains(r#"INSERT INTO "notification""#));
    }

    #[tokio::test]
    async fn test_destroy_by_stranger_is_forbidden() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_movie("m1")]])
                .append_query_results([[create_test_comment("c1", "u1", true)]])
                .into_connection(),
        );
        let service = service(&db);

        let result = service.destroy(&create_test_user("u2", false), "m1", "c1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_swaps_pending_notifications() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "u1", false)]])
                .append_query_results([[create_test_user("u1", false)]])
                .append_query_results([[create_test_comment("c1", "u1", true)]])
                .append_exec_results([exec(2)])
                .append_query_results([[create_test_notification(
                    "n1",
                    NotificationAction::ApprovedComment,
                )]])
                .into_connection(),
        );
        let service = service(&db);

        let outcome = service
            .approve(&create_test_user("admin", true), "m1", "c1")
            .await
            .unwrap();
        assert!(matches!(&outcome, CommentOutcome::Approved(c) if c.status));

        let log = transactions(service, db);
        let inserts = inserts_into(&log, "notification");
        assert_eq!(inserts.len(), 1);
        let values = bound_strings(inserts[0]);
        assert_eq!(count(&values, "approved_comment"), 1);
        assert_eq!(count(&values, "u1"), 1);
        assert_eq!(count(&values, "admin"), 1);
        assert!(
            log.iter()
                .flat_map(Transaction::statements)
                .any(|s| s.sql.starts_with(r#"DELETE FROM "notification""#))
        );
    }

    #[tokio::test]
    async fn test_approve_already_visible_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "admin", true)]])
                .into_connection(),
        );
        let service = service(&db);

        let outcome = service
            .approve(&create_test_user("admin", true), "m1", "c1")
            .await
            .unwrap();
        assert_eq!(outcome.message(), "Review approved successfully.");

        let log = statements(service, db);
        assert!(!log.contains(r#""notification""#));
    }

    #[tokio::test]
    async fn test_approve_requires_admin() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service(&db);

        let result = service.approve(&create_test_user("u1", false), "m1", "c1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_comment_on_other_movie_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_comment("c1", "u1", false)]])
                .into_connection(),
        );
        let service = service(&db);

        let result = service.approve(&create_test_user("admin", true), "m2", "c1").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
