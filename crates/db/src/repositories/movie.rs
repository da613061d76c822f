//! Movie repository, including the catalog queries.

use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Genre, Movie, MovieGenre, genre, movie, movie_genre, rating};
use chrono::{Datelike, NaiveDate};
use cinelog_common::{AppError, AppResult, YearMatch};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select,
    sea_query::{Alias, Expr, Func, SimpleExpr},
};

/// Movie selection predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieFilter {
    /// Case-insensitive substring over name, casts, director and country.
    Keyword(String),
    /// Movies tagged with a genre.
    Genre(String),
    /// Released in the given year.
    ReleasedIn { year: i32, mode: YearMatch },
    /// Release date strictly after the given day.
    ReleasedAfter(NaiveDate),
    /// Casts contain the text, excluding one movie.
    CastRelated { cast: String, exclude_id: String },
    /// Director contains the text, excluding one movie.
    DirectorRelated { director: String, exclude_id: String },
}

impl MovieFilter {
    fn apply(&self, query: Select<Movie>) -> Select<Movie> {
        match self {
            Self::Keyword(keyword) => {
                let pattern = format!("%{}%", keyword.to_lowercase());
                let lower = |col: movie::Column| {
                    Expr::expr(Func::lower(Expr::col((Movie, col)))).like(pattern.clone())
                };
                query.filter(
                    Condition::any()
                        .add(lower(movie::Column::Name))
                        .add(lower(movie::Column::Casts))
                        .add(lower(movie::Column::Director))
                        .add(lower(movie::Column::Country)),
                )
            }
            Self::Genre(genre_id) => query
                .join(JoinType::InnerJoin, movie_genre::Relation::Movie.def().rev())
                .filter(movie_genre::Column::GenreId.eq(genre_id.as_str())),
            Self::ReleasedIn { year, mode } => match mode {
                YearMatch::Substring => query.filter(
                    Expr::expr(Func::cast_as(
                        Expr::col((Movie, movie::Column::ReleaseDate)),
                        Alias::new("TEXT"),
                    ))
                    .like(format!("%{year}%")),
                ),
                YearMatch::Range => match year_bounds(*year) {
                    Some((start, end)) => query
                        .filter(movie::Column::ReleaseDate.gte(start))
                        .filter(movie::Column::ReleaseDate.lt(end)),
                    None => query.filter(SimpleExpr::Value(false.into())),
                },
            },
            Self::ReleasedAfter(day) => query.filter(movie::Column::ReleaseDate.gt(*day)),
            Self::CastRelated { cast, exclude_id } => query
                .filter(movie::Column::Casts.like(format!("%{cast}%")))
                .filter(movie::Column::Id.ne(exclude_id.as_str())),
            Self::DirectorRelated {
                director,
                exclude_id,
            } => query
                .filter(movie::Column::Director.like(format!("%{director}%")))
                .filter(movie::Column::Id.ne(exclude_id.as_str())),
        }
    }
}

/// Half-open `[Jan 1, Jan 1 of next year)` bounds.
fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?;
    Some((start, end))
}

/// Movie repository for database operations.
#[derive(Clone)]
pub struct MovieRepository {
    db: Arc<DatabaseConnection>,
}

impl MovieRepository {
    /// Create a new movie repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a movie by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<movie::Model>> {
        Movie::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a movie by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<movie::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Movie not found.".to_string()))
    }

    /// Find a movie by exact name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<movie::Model>> {
        Movie::find()
            .filter(movie::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Most recently updated first.
    pub async fn list(&self, request: PageRequest) -> AppResult<Page<movie::Model>> {
        let query = Movie::find().order_by_desc(movie::Column::UpdatedAt);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Movies matching a filter, most recently updated first.
    pub async fn filter(
        &self,
        filter: &MovieFilter,
        request: PageRequest,
    ) -> AppResult<Page<movie::Model>> {
        let query = filter
            .apply(Movie::find())
            .order_by_desc(movie::Column::UpdatedAt);
        fetch_page(self.db.as_ref(), query, request).await
    }

    /// Every movie matching a filter, earliest release first.
    pub async fn filter_all(&self, filter: &MovieFilter) -> AppResult<Vec<movie::Model>> {
        filter
            .apply(Movie::find())
            .order_by_asc(movie::Column::ReleaseDate)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count movies matching a filter.
    pub async fn count(&self, filter: &MovieFilter) -> AppResult<u64> {
        filter
            .apply(Movie::find())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Movies with at least one rating, highest average first.
    pub async fn best_rated(&self, limit: u64) -> AppResult<Vec<movie::Model>> {
        Movie::find()
            .join(JoinType::InnerJoin, movie::Relation::Ratings.def())
            .group_by(movie::Column::Id)
            .order_by_desc(SimpleExpr::from(Func::avg(Expr::col((
                rating::Entity,
                rating::Column::Rating,
            )))))
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Genres of a movie, by name.
    pub async fn genres_of(&self, movie: &movie::Model) -> AppResult<Vec<genre::Model>> {
        movie
            .find_related(Genre)
            .order_by_asc(genre::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a movie on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: movie::ActiveModel,
    ) -> AppResult<movie::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a movie on the given connection.
    pub async fn update_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: movie::ActiveModel,
    ) -> AppResult<movie::Model> {
        model
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Replace the genre set of a movie.
    pub async fn set_genres_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        movie_id: &str,
        genre_ids: &[String],
    ) -> AppResult<()> {
        MovieGenre::delete_many()
            .filter(movie_genre::Column::MovieId.eq(movie_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if genre_ids.is_empty() {
            return Ok(());
        }

        let rows = genre_ids.iter().map(|genre_id| movie_genre::ActiveModel {
            movie_id: sea_orm::Set(movie_id.to_string()),
            genre_id: sea_orm::Set(genre_id.clone()),
        });
        MovieGenre::insert_many(rows)
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a movie. Comments, ratings, saved rows and histories cascade.
    pub async fn delete_in<C: ConnectionTrait>(&self, conn: &C, id: &str) -> AppResult<u64> {
        Movie::delete_by_id(id)
            .exec(conn)
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
    use sea_orm::{DatabaseBackend, MockDatabase, QueryTrait};

    fn create_test_movie(id: &str, name: &str, casts: &str, released: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            name: name.to_string(),
            review: "review".to_string(),
            casts: Some(casts.to_string()),
            release_date: NaiveDate::parse_from_str(released, "%Y-%m-%d").unwrap(),
            country: Some("USA".to_string()),
            production: None,
            director: Some("Someone".to_string()),
            duration: "2h".to_string(),
            trailer_url: "https://example.com/t".to_string(),
            rating: None,
            user_id: Some("admin1".to_string()),
            image_key: "movies/x.png".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn sql(filter: &MovieFilter) -> String {
        filter
            .apply(Movie::find())
            .build(DatabaseBackend::Postgres)
            .to_string()
    }

    #[test]
    fn test_keyword_filter_covers_all_text_columns() {
        let sql = sql(&MovieFilter::Keyword("Leonardo".to_string()));
        assert!(sql.contains("LOWER(\"movie\".\"name\") LIKE '%leonardo%'"));
        assert!(sql.contains("LOWER(\"movie\".\"casts\") LIKE '%leonardo%'"));
        assert!(sql.contains("LOWER(\"movie\".\"director\")"));
        assert!(sql.contains("LOWER(\"movie\".\"country\")"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_year_substring_filter_casts_date() {
        let sql = sql(&MovieFilter::ReleasedIn {
            year: 2000,
            mode: YearMatch::Substring,
        });
        assert!(sql.contains("CAST(\"movie\".\"release_date\" AS TEXT) LIKE '%2000%'"));
    }

    #[test]
    fn test_year_range_filter_is_half_open() {
        let sql = sql(&MovieFilter::ReleasedIn {
            year: 2000,
            mode: YearMatch::Range,
        });
        assert!(sql.contains("\"release_date\" >= '2000-01-01'"));
        assert!(sql.contains("\"release_date\" < '2001-01-01'"));
    }

    #[test]
    fn test_related_filters_exclude_current_movie() {
        let sql = sql(&MovieFilter::CastRelated {
            cast: "Keanu".to_string(),
            exclude_id: "m1".to_string(),
        });
        assert!(sql.contains("\"casts\" LIKE '%Keanu%'"));
        assert!(sql.contains("\"id\" <> 'm1'"));
    }

    #[test]
    fn test_genre_filter_joins_through_link_table() {
        let sql = sql(&MovieFilter::Genre("g1".to_string()));
        assert!(sql.contains("INNER JOIN \"movie_genre\""));
        assert!(sql.contains("\"movie_genre\".\"genre_id\" = 'g1'"));
    }

    #[tokio::test]
    async fn test_filter_returns_page() {
        let m1 = create_test_movie("m1", "Inception", "Leonardo DiCaprio", "2010-07-16");
        let m2 = create_test_movie("m2", "Titanic", "Leonardo DiCaprio", "1997-12-19");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .append_query_results([[m1, m2]])
                .into_connection(),
        );

        let repo = MovieRepository::new(db);
        let page = repo
            .filter(
                &MovieFilter::Keyword("leonardo".to_string()),
                PageRequest::new(None, 24),
            )
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<movie::Model>::new()])
                .into_connection(),
        );

        let repo = MovieRepository::new(db);
        assert!(matches!(
            repo.get_by_id("nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
