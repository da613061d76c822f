//! Housekeeping scheduler for cinelog.
//!
//! Three jobs keep the database tidy:
//!
//! - **create-year**: at 00:00 on January 1st, insert the new release year
//! - **purge-history**: at 00:00 every day, drop viewing history older than a day
//! - **cleanup-temp-files**: every 24 hours, sweep stale files from scratch directories
//!
//! Timers only run in the process that calls [`run_scheduler`]; any job can
//! also be run once through [`run_job`].

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use cinelog_core::HousekeepingService;
use tokio::time::{interval, sleep};

pub type JobError = Box<dyn std::error::Error + Send + Sync>;

const DAY: Duration = Duration::from_secs(86_400);

/// A housekeeping job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HousekeepingJob {
    CreateYear,
    PurgeHistory,
    CleanupTempFiles,
}

impl HousekeepingJob {
    pub const ALL: [Self; 3] = [Self::CreateYear, Self::PurgeHistory, Self::CleanupTempFiles];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateYear => "create-year",
            Self::PurgeHistory => "purge-history",
            Self::CleanupTempFiles => "cleanup-temp-files",
        }
    }
}

impl fmt::Display for HousekeepingJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A job name that matches none of [`HousekeepingJob::ALL`].
#[derive(Debug, thiserror::Error)]
#[error("Unknown job '{0}', expected one of: create-year, purge-history, cleanup-temp-files")]
pub struct UnknownJob(pub String);

impl FromStr for HousekeepingJob {
    type Err = UnknownJob;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|job| job.name() == s)
            .ok_or_else(|| UnknownJob(s.to_string()))
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Zone the midnight schedules are expressed in.
    pub timezone: Tz,
    /// Interval for temp-file cleanup (default: 24 hours).
    pub cleanup_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            cleanup_interval: DAY,
        }
    }
}

/// Job executor trait for housekeeping jobs.
///
/// Every job returns how many rows or files it touched.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    async fn create_year(&self) -> Result<u64, JobError>;

    async fn purge_history(&self) -> Result<u64, JobError>;

    async fn cleanup_temp_files(&self) -> Result<u64, JobError>;
}

#[async_trait::async_trait]
impl JobExecutor for HousekeepingService {
    async fn create_year(&self) -> Result<u64, JobError> {
        let created = Self::create_year(self).await?;
        Ok(u64::from(created.is_some()))
    }

    async fn purge_history(&self) -> Result<u64, JobError> {
        Ok(Self::purge_history(self).await?)
    }

    async fn cleanup_temp_files(&self) -> Result<u64, JobError> {
        Ok(Self::cleanup_temp_files(self).await?)
    }
}

/// Run one job now.
pub async fn run_job<E: JobExecutor + ?Sized>(
    executor: &E,
    job: HousekeepingJob,
) -> Result<u64, JobError> {
    match job {
        HousekeepingJob::CreateYear => executor.create_year().await,
        HousekeepingJob::PurgeHistory => executor.purge_history().await,
        HousekeepingJob::CleanupTempFiles => executor.cleanup_temp_files().await,
    }
}

fn local_midnight(day: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&day.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The next local midnight strictly after `now`.
#[must_use]
pub fn next_daily_run(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    now.with_timezone(&tz)
        .date_naive()
        .succ_opt()
        .and_then(|day| local_midnight(day, tz))
        .unwrap_or(now + TimeDelta::days(1))
}

/// The next local January 1st, 00:00 strictly after `now`.
#[must_use]
pub fn next_yearly_run(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    let next_year = now.with_timezone(&tz).year() + 1;
    NaiveDate::from_ymd_opt(next_year, 1, 1)
        .and_then(|day| local_midnight(day, tz))
        .unwrap_or(now + TimeDelta::days(365))
}

async fn sleep_until(at: DateTime<Utc>) {
    let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    sleep(wait).await;
}

async fn run_logged<E: JobExecutor + ?Sized>(executor: &E, job: HousekeepingJob) {
    match run_job(executor, job).await {
        Ok(count) => tracing::info!(job = %job, count, "Housekeeping job finished"),
        Err(e) => tracing::error!(job = %job, error = %e, "Housekeeping job failed"),
    }
}

/// Run the scheduler with the given configuration and executor.
///
/// Spawns one task per job and returns immediately.
pub fn run_scheduler<E: JobExecutor + 'static>(config: SchedulerConfig, executor: Arc<E>) {
    let tz = config.timezone;
    let executor_year = executor.clone();
    let executor_history = executor.clone();
    let executor_cleanup = executor;

    tokio::spawn(async move {
        loop {
            let at = next_yearly_run(Utc::now(), tz);
            tracing::debug!(job = %HousekeepingJob::CreateYear, %at, "Next run scheduled");
            sleep_until(at).await;
            run_logged(executor_year.as_ref(), HousekeepingJob::CreateYear).await;
        }
    });

    tokio::spawn(async move {
        loop {
            let at = next_daily_run(Utc::now(), tz);
            tracing::debug!(job = %HousekeepingJob::PurgeHistory, %at, "Next run scheduled");
            sleep_until(at).await;
            run_logged(executor_history.as_ref(), HousekeepingJob::PurgeHistory).await;
        }
    });

    let cleanup_interval = config.cleanup_interval;
    tokio::spawn(async move {
        let mut interval = interval(cleanup_interval);
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            run_logged(executor_cleanup.as_ref(), HousekeepingJob::CleanupTempFiles).await;
        }
    });

    tracing::info!(timezone = %tz, "Housekeeping scheduler started");
}
