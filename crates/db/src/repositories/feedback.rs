//! Feedback repository.

use std::sync::Arc;

use crate::entities::feedback;
use cinelog_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection};

/// Feedback repository for database operations.
#[derive(Clone)]
pub struct FeedbackRepository {
    db: Arc<DatabaseConnection>,
}

impl FeedbackRepository {
    /// Create a new feedback repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a feedback submission.
    pub async fn create(&self, model: feedback::ActiveModel) -> AppResult<feedback::Model> {
        self.create_in(self.db.as_ref(), model).await
    }

    /// Store a feedback submission on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: feedback::ActiveModel,
    ) -> AppResult<feedback::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
