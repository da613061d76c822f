//! Release year repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Year, year};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

/// Year repository for database operations.
#[derive(Clone)]
pub struct YearRepository {
    db: Arc<DatabaseConnection>,
}

impl YearRepository {
    /// Create a new year repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a year by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<year::Model>> {
        Year::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a year by its value.
    pub async fn find_by_value(&self, value: &str) -> AppResult<Option<year::Model>> {
        self.find_by_value_in(self.db.as_ref(), value).await
    }

    /// Find a year by its value on the given connection.
    pub async fn find_by_value_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        value: &str,
    ) -> AppResult<Option<year::Model>> {
        Year::find()
            .filter(year::Column::Year.eq(value))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All years, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<year::Model>> {
        Year::find()
            .order_by_desc(year::Column::Year)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Paginated years, newest first.
    pub async fn list(&self, request: PageRequest) -> AppResult<Page<year::Model>> {
        let query = Year::find().order_by_desc(year::Column::Year);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Substring search on the year value.
    pub async fn search(&self, keyword: &str, request: PageRequest) -> AppResult<Page<year::Model>> {
        let query = Year::find()
            .filter(year::Column::Year.contains(keyword))
            .order_by_desc(year::Column::Year);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Create a year.
    pub async fn create(&self, model: year::ActiveModel) -> AppResult<year::Model> {
        self.create_in(self.db.as_ref(), model).await
    }

    /// Create a year on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: year::ActiveModel,
    ) -> AppResult<year::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a year.
    pub async fn update(&self, model: year::ActiveModel) -> AppResult<year::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a year.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Year::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_year(id: &str, value: &str) -> year::Model {
        year::Model {
            id: id.to_string(),
            year: value.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_all_newest_first() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_year("y2", "2024"), create_test_year("y1", "2023")]])
                .into_connection(),
        );

        let repo = YearRepository::new(db);
        let years = repo.find_all().await.unwrap();
        assert_eq!(years[0].year, "2024");
    }

    #[tokio::test]
    async fn test_find_by_value_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<year::Model>::new()])
                .into_connection(),
        );

        let repo = YearRepository::new(db);
        assert!(repo.find_by_value("1999").await.unwrap().is_none());
    }
}
