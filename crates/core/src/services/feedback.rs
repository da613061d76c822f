//! Contact form.

use std::sync::Arc;

use chrono::Utc;
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{entities::feedback, repositories::FeedbackRepository};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use validator::ValidateEmail;

use super::mailer::{Mailer, OutgoingMail};

const SUBJECT: &str = "New Feedback Received";

/// Feedback form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackInput {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl FeedbackInput {
    fn check(&self) -> AppResult<()> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "can't be blank");
        }
        if self.email.trim().is_empty() {
            errors.add("email", "can't be blank");
        } else if !self.email.trim().validate_email() {
            errors.add("email", "is invalid");
        }
        if self.message.trim().is_empty() {
            errors.add("message", "can't be blank");
        }
        errors.into_result()
    }
}

/// Feedback service for business logic.
#[derive(Clone)]
pub struct FeedbackService {
    db: Arc<DatabaseConnection>,
    feedback_repo: FeedbackRepository,
    mailer: Arc<dyn Mailer>,
    operator_address: String,
    id_gen: IdGenerator,
}

impl FeedbackService {
    /// Create a new feedback service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        feedback_repo: FeedbackRepository,
        mailer: Arc<dyn Mailer>,
        operator_address: String,
    ) -> Self {
        Self {
            db,
            feedback_repo,
            mailer,
            operator_address,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a submission and notify the operator.
    ///
    /// The row is only kept when the mail went out.
    pub async fn submit(&self, input: FeedbackInput) -> AppResult<feedback::Model> {
        input.check()?;

        let model = feedback::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name.trim().to_string()),
            email: Set(input.email.trim().to_string()),
            message: Set(input.message.clone()),
            created_at: Set(Utc::now().into()),
        };

        let txn = self.db.begin().await?;
        let saved = self.feedback_repo.create_in(&txn, model).await?;

        let mail = OutgoingMail {
            from: saved.email.clone(),
            to: self.operator_address.clone(),
            subject: SUBJECT.to_string(),
            body: format!("From: {} <{}>\n\n{}", saved.name, saved.email, saved.message),
        };
        if let Err(e) = self.mailer.send(&mail).await {
            tracing::error!(error = %e, feedback_id = %saved.id, "Feedback mail failed");
            txn.rollback().await?;
            return Err(e);
        }

        txn.commit().await?;
        tracing::info!(feedback_id = %saved.id, "Feedback received");
        Ok(saved)
    }
}

/// Reply sent back to the contact form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FeedbackReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl FeedbackReply {
    /// Render the outcome of [`FeedbackService::submit`].
    #[must_use]
    pub fn from_result(result: &AppResult<feedback::Model>) -> Self {
        match result {
            Ok(_) => Self {
                success: true,
                errors: None,
            },
            Err(AppError::Invalid(errors)) => Self {
                success: false,
                errors: Some(errors.full_messages()),
            },
            Err(_) => Self {
                success: false,
                errors: Some(vec![
                    "Failed to send feedback. An error occurred while processing your request."
                        .to_string(),
                ]),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: &OutgoingMail) -> AppResult<()> {
            if self.fail {
                return Err(AppError::Mail("relay refused".to_string()));
            }
            self.sent.lock().unwrap().push(mail.clone());
            Ok(())
        }
    }

    fn input() -> FeedbackInput {
        FeedbackInput {
            name: "Viewer".to_string(),
            email: "viewer@example.com".to_string(),
            message: "Great site".to_string(),
        }
    }

    fn stored() -> feedback::Model {
        feedback::Model {
            id: "f1".to_string(),
            name: "Viewer".to_string(),
            email: "viewer@example.com".to_string(),
            message: "Great site".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service(mailer: Arc<RecordingMailer>) -> FeedbackService {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored()]])
                .into_connection(),
        );
        FeedbackService::new(
            db.clone(),
            FeedbackRepository::new(db),
            mailer,
            "ops@example.com".to_string(),
        )
    }

    #[tokio::test]
    async fn test_submit_mails_operator() {
        let mailer = Arc::new(RecordingMailer::default());
        let saved = service(mailer.clone()).submit(input()).await.unwrap();

        assert_eq!(saved.id, "f1");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "viewer@example.com");
        assert_eq!(sent[0].to, "ops@example.com");
        assert_eq!(sent[0].subject, "New Feedback Received");
    }

    #[tokio::test]
    async fn test_submit_fails_when_mail_fails() {
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let result = service(mailer).submit(input()).await;

        assert!(matches!(result, Err(AppError::Mail(_))));
        let reply = FeedbackReply::from_result(&result);
        assert!(!reply.success);
    }

    #[tokio::test]
    async fn test_submit_requires_fields() {
        let mailer = Arc::new(RecordingMailer::default());
        let result = service(mailer.clone())
            .submit(FeedbackInput {
                email: "nope".to_string(),
                ..Default::default()
            })
            .await;

        let Err(AppError::Invalid(errors)) = &result else {
            panic!("expected field errors");
        };
        assert!(errors.get("name").is_some());
        assert_eq!(errors.get("email").unwrap(), ["is invalid".to_string()]);
        assert!(errors.get("message").is_some());
        assert!(mailer.sent.lock().unwrap().is_empty());

        let reply = FeedbackReply::from_result(&result);
        assert_eq!(reply.errors.unwrap().len(), 3);
    }
}
