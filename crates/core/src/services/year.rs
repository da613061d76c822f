//! Release year management and spreadsheet import/export.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use chrono_tz::Tz;
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator, YearMatch};
use cinelog_db::{
    Page, PageRequest,
    entities::year,
    repositories::{MovieFilter, MovieRepository, YearRepository},
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;

use super::catalog::parse_year;
use super::spreadsheet::{Cell, Export, ImportSummary, Upload, cell, read_rows};

/// Years per page in the admin listing.
pub const YEARS_PAGE_SIZE: u64 = 10;

const YEAR_COLUMN: usize = 1;

/// Year form.
#[derive(Debug, Clone, Deserialize)]
pub struct YearInput {
    pub year: String,
}

fn year_errors(value: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if value.trim().is_empty() {
        errors.add("year", "can't be blank");
    } else if parse_year(value).is_none() {
        errors.add("year", "must be a 4-digit year");
    }
    errors
}

/// Year service for business logic.
#[derive(Clone)]
pub struct YearService {
    db: Arc<DatabaseConnection>,
    year_repo: YearRepository,
    movie_repo: MovieRepository,
    year_match: YearMatch,
    id_gen: IdGenerator,
}

impl YearService {
    /// Create a new year service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        year_repo: YearRepository,
        movie_repo: MovieRepository,
        year_match: YearMatch,
    ) -> Self {
        Self {
            db,
            year_repo,
            movie_repo,
            year_match,
            id_gen: IdGenerator::new(),
        }
    }

    /// Years, newest first.
    pub async fn list(&self, page: Option<u64>) -> AppResult<Page<year::Model>> {
        self.year_repo
            .list(PageRequest::new(page, YEARS_PAGE_SIZE))
            .await
    }

    /// Find a year by ID.
    pub async fn get(&self, id: &str) -> AppResult<year::Model> {
        self.year_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Year not found.".to_string()))
    }

    /// Substring search over the stored value.
    pub async fn search(
        &self,
        keyword: Option<&str>,
        page: Option<u64>,
    ) -> AppResult<Page<year::Model>> {
        let keyword = keyword
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AppError::BadRequest("Type Year to search".to_string()))?;
        self.year_repo
            .search(keyword, PageRequest::new(page, YEARS_PAGE_SIZE))
            .await
    }

    async fn validate(&self, value: &str, current_id: Option<&str>) -> AppResult<()> {
        let mut errors = year_errors(value);
        if errors.is_empty()
            && let Some(existing) = self.year_repo.find_by_value(value).await?
            && Some(existing.id.as_str()) != current_id
        {
            errors.add("year", "has already been taken");
        }
        errors.into_result()
    }

    fn build(&self, value: String) -> year::ActiveModel {
        let now = Utc::now();
        year::ActiveModel {
            id: Set(self.id_gen.generate()),
            year: Set(value),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }

    /// Create a year.
    pub async fn create(&self, input: YearInput) -> AppResult<year::Model> {
        let value = input.year.trim().to_string();
        self.validate(&value, None).await?;
        let year = self.year_repo.create(self.build(value)).await?;
        tracing::info!(year = %year.year, "Year created");
        Ok(year)
    }

    /// Change a year.
    pub async fn update(&self, id: &str, input: YearInput) -> AppResult<year::Model> {
        let current = self.get(id).await?;
        let value = input.year.trim().to_string();
        self.validate(&value, Some(&current.id)).await?;

        let mut model: year::ActiveModel = current.into();
        model.year = Set(value);
        model.updated_at = Set(Utc::now().into());
        self.year_repo.update(model).await
    }

    /// Delete a year.
    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        if self.year_repo.delete(id).await? == 0 {
            return Err(AppError::NotFound("Year not found.".to_string()));
        }
        Ok(())
    }

    /// Insert the current year in `tz` unless it is already stored.
    ///
    /// Returns the new row, or `None` when the year existed.
    pub async fn ensure_current_year(&self, tz: Tz) -> AppResult<Option<year::Model>> {
        let value = Utc::now().with_timezone(&tz).year().to_string();
        self.insert_if_absent(self.db.as_ref(), value).await
    }

    async fn insert_if_absent<C: ConnectionTrait>(
        &self,
        conn: &C,
        value: String,
    ) -> AppResult<Option<year::Model>> {
        if self.year_repo.find_by_value_in(conn, &value).await?.is_some() {
            return Ok(None);
        }
        self.year_repo.create_in(conn, self.build(value)).await.map(Some)
    }

    /// Import years from column B of the first sheet.
    ///
    /// Values that are not four digit years are reported separately from
    /// years that already exist.
    pub async fn import(&self, upload: Option<Upload>) -> AppResult<ImportSummary> {
        let upload = upload
            .ok_or_else(|| AppError::BadRequest("No file selected for import.".to_string()))?;
        let rows = read_rows(&upload)?;

        let mut summary = ImportSummary::default();
        let txn = self.db.begin().await?;
        for row in &rows {
            let raw = cell(row, YEAR_COLUMN);
            let text = match &raw {
                Cell::Empty => String::new(),
                other => other.as_text().unwrap_or_default(),
            };
            if parse_year(&text).is_none() {
                summary.invalid.push(text);
                continue;
            }

            match self.insert_if_absent(&txn, text.clone()).await? {
                Some(_) => summary.imported += 1,
                None => summary.existing.push(text),
            }
        }
        txn.commit().await?;

        tracing::info!(
            imported = summary.imported,
            existing = summary.existing.len(),
            invalid = summary.invalid.len(),
            "Year import finished"
        );
        Ok(summary)
    }

    /// Every year with the names of the movies released in it.
    pub async fn export(&self) -> AppResult<Export> {
        let mut rows = Vec::new();
        for (index, year) in self.year_repo.find_all().await?.into_iter().enumerate() {
            let names: Vec<String> = match parse_year(&year.year) {
                Some(value) => self
                    .movie_repo
                    .filter_all(&MovieFilter::ReleasedIn {
                        year: value,
                        mode: self.year_match,
                    })
                    .await?
                    .into_iter()
                    .map(|m| m.name)
                    .collect(),
                None => Vec::new(),
            };
            rows.push(vec![(index + 1).to_string(), year.year, names.join(", ")]);
        }
        Export::sheet(
            "released_years.xlsx",
            "Released Years",
            &["No", "Year", "Movies"],
            &rows,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_year(id: &str, value: &str) -> year::Model {
        year::Model {
            id: id.to_string(),
            year: value.to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> YearService {
        let db = Arc::new(db.into_connection());
        YearService::new(
            db.clone(),
            YearRepository::new(db.clone()),
            MovieRepository::new(db),
            YearMatch::Substring,
        )
    }

    #[test]
    fn test_year_errors() {
        assert!(year_errors("2024").is_empty());
        assert_eq!(
            year_errors("24").get("year").unwrap(),
            ["must be a 4-digit year".to_string()]
        );
        assert_eq!(year_errors("").get("year").unwrap(), ["can't be blank".to_string()]);
    }

    #[tokio::test]
    async fn test_import_reports_invalid_and_existing_separately() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 1, "Year").unwrap();
        sheet.write_number(1, 1, 2024).unwrap();
        sheet.write_number(2, 1, 99).unwrap();
        sheet.write_string(3, 1, "1999").unwrap();
        let upload = Upload {
            filename: "years.xls".to_string(),
            bytes: workbook.save_to_buffer().unwrap(),
        };

        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                // 2024 exists
                .append_query_results([[create_test_year("y1", "2024")]])
                // 1999 is new
                .append_query_results([Vec::<year::Model>::new()])
                .append_query_results([[create_test_year("y2", "1999")]]),
        );

        let summary = service.import(Some(upload)).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.existing, vec!["2024".to_string()]);
        assert_eq!(summary.invalid, vec!["99".to_string()]);
    }

    #[tokio::test]
    async fn test_import_nothing_imported_is_alert() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 1, "Year").unwrap();
        sheet.write_string(1, 1, "soon").unwrap();
        let upload = Upload {
            filename: "years.xls".to_string(),
            bytes: workbook.save_to_buffer().unwrap(),
        };

        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let summary = service.import(Some(upload)).await.unwrap();
        assert_eq!(summary.message("years").unwrap_err(), "Failed to import any years");
    }

    #[tokio::test]
    async fn test_ensure_current_year_when_present() {
        let this_year = Utc::now().with_timezone(&chrono_tz::Asia::Yangon).year().to_string();
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_year("y1", &this_year)]]),
        );

        let created = service.ensure_current_year(chrono_tz::Asia::Yangon).await.unwrap();
        assert!(created.is_none());
    }

    #[tokio::test]
    async fn test_search_blank_keyword() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));
        let result = service.search(None, None).await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Type Year to search"));
    }
}
