//! Periodic maintenance: yearly Year rows, history expiry and temp-file sweeps.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use chrono_tz::Tz;
use cinelog_common::{AppError, AppResult};
use cinelog_db::{entities::year, repositories::HistoryRepository};

use super::year::YearService;

/// History entries older than this many days are purged.
pub const HISTORY_RETENTION_DAYS: i64 = 1;

/// Housekeeping service for scheduled and operator-run jobs.
#[derive(Clone)]
pub struct HousekeepingService {
    year_service: YearService,
    history_repo: HistoryRepository,
    tz: Tz,
    cleanup_paths: Vec<PathBuf>,
    cleanup_max_age: Duration,
}

impl HousekeepingService {
    /// Create a new housekeeping service.
    #[must_use]
    pub const fn new(
        year_service: YearService,
        history_repo: HistoryRepository,
        tz: Tz,
        cleanup_paths: Vec<PathBuf>,
        cleanup_max_age: Duration,
    ) -> Self {
        Self {
            year_service,
            history_repo,
            tz,
            cleanup_paths,
            cleanup_max_age,
        }
    }

    /// Timezone the schedules are expressed in.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.tz
    }

    /// Insert the current year unless it already exists.
    pub async fn create_year(&self) -> AppResult<Option<year::Model>> {
        let created = self.year_service.ensure_current_year(self.tz).await?;
        match &created {
            Some(year) => tracing::info!(year = %year.year, "Created current year"),
            None => tracing::debug!("Current year already present"),
        }
        Ok(created)
    }

    /// Delete history entries older than [`HISTORY_RETENTION_DAYS`].
    pub async fn purge_history(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(HISTORY_RETENTION_DAYS);
        let removed = self.history_repo.delete_older_than(cutoff).await?;
        tracing::info!(removed, %cutoff, "Purged history");
        Ok(removed)
    }

    /// Delete files under the cleanup paths older than the configured age.
    ///
    /// Missing directories are skipped. Directories themselves are kept.
    pub async fn cleanup_temp_files(&self) -> AppResult<u64> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut pending: Vec<PathBuf> = self.cleanup_paths.clone();

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&dir, &e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&dir, &e))? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(|e| io_error(&path, &e))?;
                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                let age = metadata
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age >= self.cleanup_max_age {
                    tokio::fs::remove_file(&path)
                        .await
                        .map_err(|e| io_error(&path, &e))?;
                    removed += 1;
                }
            }
        }

        tracing::info!(removed, "Cleaned up temp files");
        Ok(removed)
    }
}

fn io_error(path: &std::path::Path, e: &std::io::Error) -> AppError {
    AppError::Internal(format!("{}: {e}", path.display()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinelog_common::YearMatch;
    use cinelog_db::repositories::{MovieRepository, YearRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: MockDatabase, paths: Vec<PathBuf>, max_age: Duration) -> HousekeepingService {
        let db = Arc::new(db.into_connection());
        let years = YearService::new(
            db.clone(),
            YearRepository::new(db.clone()),
            MovieRepository::new(db.clone()),
            YearMatch::Substring,
        );
        HousekeepingService::new(
            years,
            HistoryRepository::new(db),
            chrono_tz::Asia::Yangon,
            paths,
            max_age,
        )
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("cinelog-housekeeping-tests")
            .join(format!("{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("a.log"), b"a").unwrap();
        std::fs::write(dir.join("nested").join("b.tmp"), b"b").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_purge_history_reports_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 4,
            },
        ]);
        let service = service(db, Vec::new(), Duration::ZERO);

        assert_eq!(service.purge_history().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_create_year_skips_existing() {
        let existing = year::Model {
            id: "y1".to_string(),
            year: Utc::now().with_timezone(&chrono_tz::Asia::Yangon).format("%Y").to_string(),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]);
        let service = service(db, Vec::new(), Duration::ZERO);

        assert!(service.create_year().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_removes_old_files_recursively() {
        let dir = scratch_dir("old");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            vec![dir.clone(), dir.join("missing")],
            Duration::ZERO,
        );

        assert_eq!(service.cleanup_temp_files().await.unwrap(), 2);
        assert!(dir.join("nested").exists());
        assert!(!dir.join("a.log").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_files() {
        let dir = scratch_dir("recent");
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            vec![dir.clone()],
            Duration::from_secs(24 * 3600),
        );

        assert_eq!(service.cleanup_temp_files().await.unwrap(), 0);
        assert!(dir.join("a.log").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
