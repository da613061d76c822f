//! Live-database fixtures for the integration tests.
//!
//! [`TestDatabase::create`] makes a throwaway PostgreSQL database with the
//! full schema; [`Seed`] inserts catalog rows into it with fixed ids so the
//! tests can assert on exactly what survives a delete or matches a query.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, Set, Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{
    comment, genre, history, movie, movie_genre, notification, rating, saved_movie, user,
};
use crate::migrations::Migrator;

/// Where the test server lives, from `TEST_DB_*`.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        let var = |name: &str, fallback: &str| std::env::var(name).unwrap_or_else(|_| fallback.to_string());
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: var("TEST_DB_PORT", "5433").parse().unwrap_or(5433),
            username: var("TEST_DB_USER", "cinelog_test"),
            password: var("TEST_DB_PASSWORD", "cinelog_test"),
            database: var("TEST_DB_NAME", "cinelog_test"),
        }
    }
}

impl TestDbConfig {
    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }

    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// The maintenance database used to create and drop test databases.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        self.url_for("postgres")
    }
}

/// A migrated database that exists for one test.
pub struct TestDatabase {
    pub conn: Arc<DatabaseConnection>,
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Create a uniquely named database and run every migration on it.
    pub async fn create() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("cinelog_test_{}", &suffix[..12]);

        let admin = Database::connect(&config.postgres_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;
        info!(database = %config.database, "Created test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Shared connection, ready to hand to a repository.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    #[must_use]
    pub fn seed(&self) -> Seed<'_> {
        Seed { conn: &self.conn }
    }

    /// Close the pool and drop the database.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close_by_ref().await?;

        let admin = Database::connect(&self.config.postgres_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

/// Row factory for catalog fixtures.
pub struct Seed<'a> {
    conn: &'a DatabaseConnection,
}

impl Seed<'_> {
    pub async fn user(&self, id: &str, is_admin: bool) -> Result<user::Model, DbErr> {
        let now = Utc::now().fixed_offset();
        user::ActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("User {id}")),
            email: Set(format!("{id}@example.com")),
            password_hash: Set(String::new()),
            is_admin: Set(is_admin),
            image_key: Set(None),
            token: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn)
        .await
    }

    pub async fn genre(&self, id: &str, name: &str) -> Result<genre::Model, DbErr> {
        let now = Utc::now().fixed_offset();
        genre::ActiveModel {
            id: Set(id.to_string()),
            name: Set(name.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn)
        .await
    }

    /// A movie tagged with one genre.
    pub async fn movie(
        &self,
        id: &str,
        casts: &str,
        release_date: NaiveDate,
        creator: &user::Model,
        genre: &genre::Model,
    ) -> Result<movie::Model, DbErr> {
        let now = Utc::now().fixed_offset();
        let movie = movie::ActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("Movie {id}")),
            review: Set("Seeded review".to_string()),
            casts: Set(Some(casts.to_string())),
            release_date: Set(release_date),
            country: Set(None),
            production: Set(None),
            director: Set(None),
            duration: Set("2h".to_string()),
            trailer_url: Set(format!("https://example.com/{id}")),
            rating: Set(None),
            user_id: Set(Some(creator.id.clone())),
            image_key: Set(format!("movies/{id}.jpg")),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn)
        .await?;

        movie_genre::ActiveModel {
            movie_id: Set(movie.id.clone()),
            genre_id: Set(genre.id.clone()),
        }
        .insert(self.conn)
        .await?;
        Ok(movie)
    }

    /// A review, a rating, a bookmark and a visit by `user` on `movie`.
    pub async fn engagement(&self, user: &user::Model, movie: &movie::Model) -> Result<comment::Model, DbErr> {
        let now = Utc::now().fixed_offset();
        let key = format!("{}_{}", user.id, movie.id);

        let comment = comment::ActiveModel {
            id: Set(format!("c_{key}")),
            description: Set("a".repeat(120)),
            status: Set(false),
            user_id: Set(user.id.clone()),
            movie_id: Set(movie.id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn)
        .await?;

        rating::ActiveModel {
            id: Set(format!("r_{key}")),
            rating: Set(4),
            user_id: Set(user.id.clone()),
            movie_id: Set(movie.id.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.conn)
        .await?;

        saved_movie::ActiveModel {
            id: Set(format!("s_{key}")),
            user_id: Set(user.id.clone()),
            movie_id: Set(movie.id.clone()),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await?;

        history::ActiveModel {
            id: Set(format!("h_{key}")),
            user_id: Set(user.id.clone()),
            movie_id: Set(movie.id.clone()),
            created_at: Set(now),
        }
        .insert(self.conn)
        .await?;

        Ok(comment)
    }

    /// `created_review` from the comment's author to `recipient`.
    pub async fn review_notification(
        &self,
        recipient: &user::Model,
        comment: &comment::Model,
    ) -> Result<notification::Model, DbErr> {
        notification::ActiveModel {
            id: Set(format!("n_{}_{}", recipient.id, comment.id)),
            recipient_id: Set(recipient.id.clone()),
            actor_id: Set(comment.user_id.clone()),
            action: Set(notification::NotificationAction::CreatedReview),
            notifiable_type: Set(notification::NotifiableType::Comment),
            notifiable_id: Set(comment.id.clone()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(self.conn)
        .await
    }

    /// Number of rows in a table.
    pub async fn rows<E>(&self) -> Result<u64, DbErr>
    where
        E: EntityTrait,
        E::Model: Send + Sync + 'static,
    {
        E::find().count(self.conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_share_credentials() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5433,
            username: "user".to_string(),
            password: "pass".to_string(),
            database: "cinelog_test_x".to_string(),
        };
        assert_eq!(config.database_url(), "postgres://user:pass@db:5433/cinelog_test_x");
        assert_eq!(config.postgres_url(), "postgres://user:pass@db:5433/postgres");
    }
}
