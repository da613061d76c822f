//! Genre repository.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Genre, Movie, genre};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
    sea_query::{Expr, Func},
};

/// Genre repository for database operations.
#[derive(Clone)]
pub struct GenreRepository {
    db: Arc<DatabaseConnection>,
}

impl GenreRepository {
    /// Create a new genre repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a genre by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<genre::Model>> {
        Genre::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a genre by exact name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<genre::Model>> {
        self.find_by_name_in(self.db.as_ref(), name).await
    }

    /// Find a genre by exact name on the given connection.
    pub async fn find_by_name_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> AppResult<Option<genre::Model>> {
        Genre::find()
            .filter(genre::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All genres by name.
    pub async fn find_all(&self) -> AppResult<Vec<genre::Model>> {
        Genre::find()
            .order_by_asc(genre::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Genres with the given IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<genre::Model>> {
        Genre::find()
            .filter(genre::Column::Id.is_in(ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Paginated genres by name.
    pub async fn list(&self, request: PageRequest) -> AppResult<Page<genre::Model>> {
        let query = Genre::find().order_by_asc(genre::Column::Name);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Case-insensitive substring search on name.
    pub async fn search(
        &self,
        keyword: &str,
        request: PageRequest,
    ) -> AppResult<Page<genre::Model>> {
        let pattern = format!("%{}%", keyword.to_lowercase());
        let query = Genre::find()
            .filter(Expr::expr(Func::lower(Expr::col(genre::Column::Name))).like(pattern))
            .order_by_asc(genre::Column::Name);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Number of movies tagged with a genre.
    pub async fn movie_count(&self, genre: &genre::Model) -> AppResult<u64> {
        genre
            .find_related(Movie)
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a genre.
    pub async fn create(&self, model: genre::ActiveModel) -> AppResult<genre::Model> {
        self.create_in(self.db.as_ref(), model).await
    }

    /// Create a genre on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: genre::ActiveModel,
    ) -> AppResult<genre::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a genre.
    pub async fn update(&self, model: genre::ActiveModel) -> AppResult<genre::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a genre. Its movie links cascade.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Genre::delete_by_id(id)
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

    fn create_test_genre(id: &str, name: &str) -> genre::Model {
        genre::Model {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let genre = create_test_genre("g1", "Drama");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[genre.clone()]])
                .into_connection(),
        );

        let repo = GenreRepository::new(db);
        let found = repo.find_by_name("Drama").await.unwrap().unwrap();
        assert_eq!(found.id, "g1");
    }

    #[tokio::test]
    async fn test_movie_count() {
        let genre = create_test_genre("g1", "Drama");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(4))
                }]])
                .into_connection(),
        );

        let repo = GenreRepository::new(db);
        assert_eq!(repo.movie_count(&genre).await.unwrap(), 4);
    }
}
