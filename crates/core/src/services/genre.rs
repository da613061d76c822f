//! Genre management and spreadsheet import/export.

use std::sync::Arc;

use chrono::Utc;
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{
    Page, PageRequest,
    entities::genre,
    repositories::{GenreRepository, MovieFilter, MovieRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;

use super::spreadsheet::{Cell, Export, ImportSummary, Upload, cell, read_rows};

/// Genres per page in the admin listing.
pub const GENRES_PAGE_SIZE: u64 = 10;

const NAME_COLUMN: usize = 1;

/// Genre form.
#[derive(Debug, Clone, Deserialize)]
pub struct GenreInput {
    pub name: String,
}

/// Format rules for a genre name. Any digit is rejected.
fn name_errors(name: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if name.trim().is_empty() {
        errors.add("name", "can't be blank");
    } else if name.chars().any(|c| c.is_ascii_digit()) {
        errors.add("name", "can't contain digits");
    }
    errors
}

/// Genre service for business logic.
#[derive(Clone)]
pub struct GenreService {
    db: Arc<DatabaseConnection>,
    genre_repo: GenreRepository,
    movie_repo: MovieRepository,
    id_gen: IdGenerator,
}

impl GenreService {
    /// Create a new genre service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        genre_repo: GenreRepository,
        movie_repo: MovieRepository,
    ) -> Self {
        Self {
            db,
            genre_repo,
            movie_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Genres by name.
    pub async fn list(&self, page: Option<u64>) -> AppResult<Page<genre::Model>> {
        self.genre_repo
            .list(PageRequest::new(page, GENRES_PAGE_SIZE))
            .await
    }

    /// Every genre by name.
    pub async fn all(&self) -> AppResult<Vec<genre::Model>> {
        self.genre_repo.find_all().await
    }

    /// Find a genre by ID.
    pub async fn get(&self, id: &str) -> AppResult<genre::Model> {
        self.genre_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Genre not found.".to_string()))
    }

    /// Case-insensitive name search.
    pub async fn search(
        &self,
        keyword: Option<&str>,
        page: Option<u64>,
    ) -> AppResult<Page<genre::Model>> {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::BadRequest("Type Genre Name to search".to_string()))?;
        self.genre_repo
            .search(keyword, PageRequest::new(page, GENRES_PAGE_SIZE))
            .await
    }

    async fn validate(&self, name: &str, current_id: Option<&str>) -> AppResult<()> {
        let mut errors = name_errors(name);
        if errors.is_empty()
            && let Some(existing) = self.genre_repo.find_by_name(name).await?
            && Some(existing.id.as_str()) != current_id
        {
            errors.add("name", "has already been taken");
        }
        errors.into_result()
    }

    /// Create a genre.
    pub async fn create(&self, input: GenreInput) -> AppResult<genre::Model> {
        let name = input.name.trim().to_string();
        self.validate(&name, None).await?;

        let now = Utc::now();
        let genre = self
            .genre_repo
            .create(genre::ActiveModel {
                id: Set(self.id_gen.generate()),
                name: Set(name),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            })
            .await?;
        tracing::info!(genre_id = %genre.id, name = %genre.name, "Genre created");
        Ok(genre)
    }

    /// Rename a genre.
    pub async fn update(&self, id: &str, input: GenreInput) -> AppResult<genre::Model> {
        let current = self.get(id).await?;
        let name = input.name.trim().to_string();
        self.validate(&name, Some(&current.id)).await?;

        let mut model: genre::ActiveModel = current.into();
        model.name = Set(name);
        model.updated_at = Set(Utc::now().into());
        self.genre_repo.update(model).await
    }

    /// Delete a genre. Movie links cascade.
    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        if self.genre_repo.delete(id).await? == 0 {
            return Err(AppError::NotFound("Genre not found.".to_string()));
        }
        Ok(())
    }

    /// Import genre names from column B of the first sheet.
    ///
    /// Runs in one transaction; names already present are reported back.
    pub async fn import(&self, upload: Option<Upload>) -> AppResult<ImportSummary> {
        let upload = upload
            .ok_or_else(|| AppError::BadRequest("No file selected for import.".to_string()))?;
        let rows = read_rows(&upload)?;

        let mut summary = ImportSummary::default();
        let txn = self.db.begin().await?;
        for (index, row) in rows.iter().enumerate() {
            let name = match cell(row, NAME_COLUMN) {
                Cell::Number(n) => {
                    tracing::warn!(row = index + 1, value = n, "Numeric genre name, skipping row");
                    continue;
                }
                other => other.as_text().unwrap_or_default(),
            };

            let errors = name_errors(&name);
            if !errors.is_empty() {
                tracing::warn!(row = index + 1, errors = %errors, "Invalid genre row, skipping");
                continue;
            }
            if self.genre_repo.find_by_name_in(&txn, &name).await?.is_some() {
                summary.existing.push(name);
                continue;
            }

            let now = Utc::now();
            self.genre_repo
                .create_in(
                    &txn,
                    genre::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        name: Set(name),
                        created_at: Set(now.into()),
                        updated_at: Set(now.into()),
                    },
                )
                .await?;
            summary.imported += 1;
        }
        txn.commit().await?;

        tracing::info!(
            imported = summary.imported,
            existing = summary.existing.len(),
            "Genre import finished"
        );
        Ok(summary)
    }

    /// Every genre with the names of its movies.
    pub async fn export(&self) -> AppResult<Export> {
        let mut rows = Vec::new();
        for (index, genre) in self.genre_repo.find_all().await?.into_iter().enumerate() {
            let movies = self
                .movie_repo
                .filter_all(&MovieFilter::Genre(genre.id.clone()))
                .await?;
            let names: Vec<String> = movies.into_iter().map(|m| m.name).collect();
            rows.push(vec![(index + 1).to_string(), genre.name, names.join(", ")]);
        }
        Export::sheet("genres.xlsx", "Genres", &["No", "Genre", "Movies"], &rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_genre(id: &str, name: &str) -> genre::Model {
        genre::Model {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> GenreService {
        let db = Arc::new(db.into_connection());
        GenreService::new(
            db.clone(),
            GenreRepository::new(db.clone()),
            MovieRepository::new(db),
        )
    }

    fn genre_sheet() -> Upload {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "No").unwrap();
        sheet.write_string(0, 1, "Genre").unwrap();
        sheet.write_string(1, 1, "Drama").unwrap();
        sheet.write_number(2, 1, 42).unwrap();
        sheet.write_string(3, 1, "Action").unwrap();
        Upload {
            filename: "genres.xls".to_string(),
            bytes: workbook.save_to_buffer().unwrap(),
        }
    }

    #[test]
    fn test_name_errors() {
        assert!(name_errors("Drama").is_empty());
        assert!(!name_errors("").is_empty());
        assert_eq!(
            name_errors("12345").get("name").unwrap(),
            ["can't contain digits".to_string()]
        );
        assert_eq!(
            name_errors("action1").get("name").unwrap(),
            ["can't contain digits".to_string()]
        );
    }

    #[tokio::test]
    async fn test_search_blank_keyword() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let result = service.search(Some(" "), None).await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Type Genre Name to search"));
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_genre("g1", "Drama")]]),
        );

        let result = service
            .create(GenreInput {
                name: "Drama".to_string(),
            })
            .await;
        match result {
            Err(AppError::Invalid(errors)) => {
                assert_eq!(errors.get("name").unwrap(), ["has already been taken".to_string()]);
            }
            other => panic!("Expected Invalid error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_import_without_file() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let result = service.import(None).await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "No file selected for import."));
    }

    #[tokio::test]
    async fn test_import_skips_numeric_and_reports_existing() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                // "Drama" already exists
                .append_query_results([[create_test_genre("g1", "Drama")]])
                // "Action" is new
                .append_query_results([Vec::<genre::Model>::new()])
                .append_query_results([[create_test_genre("g2", "Action")]]),
        );

        let summary = service.import(Some(genre_sheet())).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.existing, vec!["Drama".to_string()]);
        assert_eq!(
            summary.message("genres").unwrap(),
            "Successfully imported 1 genres. The following genres already exist: Drama"
        );
    }

    #[tokio::test]
    async fn test_import_wrong_extension() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let upload = Upload {
            filename: "genres.txt".to_string(),
            bytes: b"Drama".to_vec(),
        };
        assert!(matches!(
            service.import(Some(upload)).await,
            Err(AppError::InvalidFileFormat)
        ));
    }
}
