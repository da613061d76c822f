//! Catalog browsing and search.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use cinelog_common::{AppError, AppResult, YearMatch};
use cinelog_db::{
    Page, PageRequest,
    entities::{genre, movie, user, year},
    repositories::{
        GenreRepository, HistoryRepository, MovieFilter, MovieRepository, RatingRepository,
        YearRepository,
    },
};
use serde::Serialize;

use super::activity::{ActivityKind, ActivityRecorder};

/// Movies per page on the landing listing.
pub const INDEX_PAGE_SIZE: u64 = 12;
/// Movies per page on filtered and search listings.
pub const FILTER_PAGE_SIZE: u64 = 24;
/// Length of the best-rated sidebar list.
pub const BEST_RATED_LIMIT: u64 = 10;
/// Length of the recently viewed sidebar list.
pub const HISTORY_LIMIT: u64 = 10;

/// Highest value a rating can take.
pub const MAX_RATING: i32 = 5;

/// Clamp an observed maximum rating into `0..=5`, `0` meaning unrated.
#[must_use]
pub fn clamp_max_rating(max: Option<i32>) -> i32 {
    max.map_or(0, |m| m.clamp(0, MAX_RATING))
}

/// Sidebar data shown next to every listing.
#[derive(Debug, Clone, Serialize)]
pub struct Sidebar {
    pub genres: Vec<genre::Model>,
    pub years: Vec<year::Model>,
    pub best_rated: Vec<movie::Model>,
    pub upcoming: Vec<movie::Model>,
    /// Recently viewed movies, for signed-in users only
    pub history: Vec<movie::Model>,
}

/// A listing together with its sidebar.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<T: Serialize> {
    #[serde(flatten)]
    pub subject: T,
    pub movies: Page<movie::Model>,
    pub sidebar: Sidebar,
}

/// Genre listing subject.
#[derive(Debug, Clone, Serialize)]
pub struct GenreSubject {
    pub genre: genre::Model,
}

/// Year listing subject.
#[derive(Debug, Clone, Serialize)]
pub struct YearSubject {
    pub year: year::Model,
}

/// Search listing subject.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSubject {
    pub keyword: String,
}

/// Catalog service for browsing queries.
#[derive(Clone)]
pub struct CatalogService {
    movie_repo: MovieRepository,
    genre_repo: GenreRepository,
    year_repo: YearRepository,
    rating_repo: RatingRepository,
    history_repo: HistoryRepository,
    activity: ActivityRecorder,
    year_match: YearMatch,
    timezone: Tz,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        movie_repo: MovieRepository,
        genre_repo: GenreRepository,
        year_repo: YearRepository,
        rating_repo: RatingRepository,
        history_repo: HistoryRepository,
        activity: ActivityRecorder,
        year_match: YearMatch,
        timezone: Tz,
    ) -> Self {
        Self {
            movie_repo,
            genre_repo,
            year_repo,
            rating_repo,
            history_repo,
            activity,
            year_match,
            timezone,
        }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Sidebar for a viewer.
    pub async fn sidebar(&self, viewer: Option<&user::Model>) -> AppResult<Sidebar> {
        let history = match viewer {
            Some(user) => {
                self.history_repo
                    .movies_of(&user.id, PageRequest::new(None, HISTORY_LIMIT))
                    .await?
                    .items
            }
            None => Vec::new(),
        };

        Ok(Sidebar {
            genres: self.genre_repo.find_all().await?,
            years: self.year_repo.find_all().await?,
            best_rated: self.movie_repo.best_rated(BEST_RATED_LIMIT).await?,
            upcoming: self
                .movie_repo
                .filter_all(&MovieFilter::ReleasedAfter(self.today()))
                .await?,
            history,
        })
    }

    /// Landing listing, most recently updated first.
    pub async fn index(
        &self,
        viewer: Option<&user::Model>,
        page: Option<u64>,
    ) -> AppResult<Listing<()>> {
        let movies = self
            .movie_repo
            .list(PageRequest::new(page, INDEX_PAGE_SIZE))
            .await?;
        Ok(Listing {
            subject: (),
            movies,
            sidebar: self.sidebar(viewer).await?,
        })
    }

    /// Keyword search over name, casts, director and country.
    pub async fn search(
        &self,
        viewer: Option<&user::Model>,
        keyword: Option<&str>,
        page: Option<u64>,
    ) -> AppResult<Listing<SearchSubject>> {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::BadRequest(
                    "Type movie name or casts, or director or country to search".to_string(),
                )
            })?
            .to_lowercase();

        let movies = self
            .movie_repo
            .filter(
                &MovieFilter::Keyword(keyword.clone()),
                PageRequest::new(page, FILTER_PAGE_SIZE),
            )
            .await?;
        if let Some(user) = viewer {
            self.activity
                .record(&user.id, &ActivityKind::Searched { keyword: keyword.clone() })
                .await;
        }

        Ok(Listing {
            subject: SearchSubject { keyword },
            movies,
            sidebar: self.sidebar(viewer).await?,
        })
    }

    /// Movies tagged with a genre.
    pub async fn by_genre(
        &self,
        viewer: Option<&user::Model>,
        genre_id: &str,
        page: Option<u64>,
    ) -> AppResult<Listing<GenreSubject>> {
        let genre = self
            .genre_repo
            .find_by_id(genre_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Genre not found.".to_string()))?;

        let movies = self
            .movie_repo
            .filter(
                &MovieFilter::Genre(genre.id.clone()),
                PageRequest::new(page, FILTER_PAGE_SIZE),
            )
            .await?;
        if let Some(user) = viewer {
            self.activity
                .record(&user.id, &ActivityKind::FilteredByGenre { genre: genre.name.clone() })
                .await;
        }

        Ok(Listing {
            subject: GenreSubject { genre },
            movies,
            sidebar: self.sidebar(viewer).await?,
        })
    }

    /// Movies released in a stored year.
    pub async fn by_year(
        &self,
        viewer: Option<&user::Model>,
        year_id: &str,
        page: Option<u64>,
    ) -> AppResult<Listing<YearSubject>> {
        let year = self
            .year_repo
            .find_by_id(year_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Year not found.".to_string()))?;

        let movies = self
            .released_in_year(&year.year, PageRequest::new(page, FILTER_PAGE_SIZE))
            .await?;
        if let Some(user) = viewer {
            self.activity
                .record(&user.id, &ActivityKind::FilteredByYear { year: year.year.clone() })
                .await;
        }

        Ok(Listing {
            subject: YearSubject { year },
            movies,
            sidebar: self.sidebar(viewer).await?,
        })
    }

    /// Movies released in `year`; anything but a four digit year matches nothing.
    pub async fn released_in_year(
        &self,
        year: &str,
        request: PageRequest,
    ) -> AppResult<Page<movie::Model>> {
        match parse_year(year) {
            Some(year) => {
                self.movie_repo
                    .filter(&MovieFilter::ReleasedIn { year, mode: self.year_match }, request)
                    .await
            }
            None => Ok(Page::empty(request)),
        }
    }

    /// Names of every movie released in `year`.
    pub async fn movie_names_in_year(&self, year: &str) -> AppResult<Vec<String>> {
        let Some(year) = parse_year(year) else {
            return Ok(Vec::new());
        };
        let movies = self
            .movie_repo
            .filter_all(&MovieFilter::ReleasedIn { year, mode: self.year_match })
            .await?;
        Ok(movies.into_iter().map(|m| m.name).collect())
    }

    /// Movies released after today, soonest first.
    pub async fn upcoming(&self, viewer: Option<&user::Model>) -> AppResult<Vec<movie::Model>> {
        if let Some(user) = viewer {
            self.activity.record(&user.id, &ActivityKind::BrowsedUpcoming).await;
        }
        self.movie_repo
            .filter_all(&MovieFilter::ReleasedAfter(self.today()))
            .await
    }

    /// Other movies sharing a cast member.
    pub async fn related_by_cast(
        &self,
        cast: &str,
        movie_id: &str,
        page: Option<u64>,
    ) -> AppResult<Page<movie::Model>> {
        let filter = MovieFilter::CastRelated {
            cast: cast.to_string(),
            exclude_id: movie_id.to_string(),
        };
        self.movie_repo
            .filter(&filter, PageRequest::new(page, FILTER_PAGE_SIZE))
            .await
    }

    /// Other movies by the same director.
    pub async fn related_by_director(
        &self,
        director: &str,
        movie_id: &str,
        page: Option<u64>,
    ) -> AppResult<Page<movie::Model>> {
        let filter = MovieFilter::DirectorRelated {
            director: director.to_string(),
            exclude_id: movie_id.to_string(),
        };
        self.movie_repo
            .filter(&filter, PageRequest::new(page, FILTER_PAGE_SIZE))
            .await
    }

    /// Highest rating `user_id` gave `movie_id`, `0` when unrated.
    pub async fn max_rating_for_user(&self, user_id: &str, movie_id: &str) -> AppResult<i32> {
        let max = self.rating_repo.max_for_user(user_id, movie_id).await?;
        Ok(clamp_max_rating(max))
    }
}

/// A four digit year, e.g. "2024".
#[must_use]
pub fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    if value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinelog_db::repositories::ActivityRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn create_test_movie(id: &str, name: &str, casts: &str) -> movie::Model {
        movie::Model {
            id: id.to_string(),
            name: name.to_string(),
            review: "review".to_string(),
            casts: Some(casts.to_string()),
            release_date: NaiveDate::from_ymd_opt(2010, 7, 16).unwrap(),
            country: None,
            production: None,
            director: None,
            duration: "2h".to_string(),
            trailer_url: "https://example.com/t".to_string(),
            rating: None,
            user_id: Some("admin".to_string()),
            image_key: "movies/x.jpg".to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> CatalogService {
        let db = Arc::new(db);
        CatalogService::new(
            MovieRepository::new(db.clone()),
            GenreRepository::new(db.clone()),
            YearRepository::new(db.clone()),
            RatingRepository::new(db.clone()),
            HistoryRepository::new(db.clone()),
            ActivityRecorder::new(ActivityRepository::new(db)),
            YearMatch::Substring,
            chrono_tz::Asia::Yangon,
        )
    }

    #[test]
    fn test_clamp_max_rating() {
        assert_eq!(clamp_max_rating(None), 0);
        assert_eq!(clamp_max_rating(Some(3)), 3);
        assert_eq!(clamp_max_rating(Some(5)), 5);
        assert_eq!(clamp_max_rating(Some(9)), 5);
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2000"), Some(2000));
        assert_eq!(parse_year(" 1999 "), Some(1999));
        assert_eq!(parse_year("99"), None);
        assert_eq!(parse_year("20x0"), None);
        assert_eq!(parse_year("-200"), None);
    }

    #[tokio::test]
    async fn test_search_rejects_blank_keyword() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        for keyword in [None, Some(""), Some("   ")] {
            let result = service.search(None, keyword, None).await;
            match result {
                Err(AppError::BadRequest(msg)) => {
                    assert_eq!(msg, "Type movie name or casts, or director or country to search");
                }
                other => panic!("Expected BadRequest error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_released_in_invalid_year_is_empty() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let page = service
            .released_in_year("abcd", PageRequest::new(None, FILTER_PAGE_SIZE))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_by_unknown_genre_is_not_found() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<genre::Model>::new()])
                .into_connection(),
        );

        let result = service.by_genre(None, "missing", None).await;
        match result {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Genre not found."),
            other => panic!("Expected NotFound error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_max_rating_for_user_without_ratings() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "max_rating" => sea_orm::Value::Int(None),
                }]])
                .into_connection(),
        );

        assert_eq!(service.max_rating_for_user("u1", "m1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_related_by_cast_returns_page() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1)),
                }]])
                .append_query_results([[create_test_movie("m2", "The Revenant", "Leonardo DiCaprio")]])
                .into_connection(),
        );

        let page = service.related_by_cast("Leonardo", "m1", None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "The Revenant");
    }
}
