//! Activity recorder and dashboard.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use cinelog_common::{AppError, AppResult, IdGenerator};
use cinelog_db::{
    Page, PageRequest,
    entities::{activity, user},
    repositories::{ActivityRepository, ActivityRow, UserRepository},
};
use sea_orm::{ConnectionTrait, Set};
use serde::Serialize;

use super::spreadsheet::Export;

/// Page size of every activity dashboard view.
pub const DASHBOARD_PAGE_SIZE: u64 = 10;

const EXPORT_TIME_FORMAT: &str = "%I:%M:%S %p %A, %B %d, %Y";

/// A tracked user action, rendered as the audit line stored on the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    AddedReview { movie: String },
    DeletedReview { movie: String },
    ViewedMovie { movie: String },
    FilteredByGenre { genre: String },
    FilteredByYear { year: String },
    Searched { keyword: String },
    SavedMovie { movie: String },
    UnsavedMovie { movie: String },
    BrowsedUpcoming,
    BrowsedSavedMovies,
    BrowsedNotifications,
    DeletedNotification,
    DismissedNotifications,
    BrowsedDiscussions,
    ViewedDiscussion { content: String },
    CreatedDiscussion { content: String },
    DestroyedDiscussion,
    AddedReply { reply: String, discussion: String },
    DeletedReply { discussion: String },
    ProfileUpdated,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddedReview { movie } => write!(f, "Added review in '{movie}'"),
            Self::DeletedReview { movie } => write!(f, "Deleted review in '{movie}'"),
            Self::ViewedMovie { movie } => write!(f, "Viewed movie {movie}"),
            Self::FilteredByGenre { genre } => write!(f, "Filtered movies with genre '{genre}'"),
            Self::FilteredByYear { year } => write!(f, "Filtered movies with year '{year}'"),
            Self::Searched { keyword } => write!(f, "Search for movies with keyword {keyword}"),
            Self::SavedMovie { movie } => write!(f, "Save '{movie}' into Saved Movies List."),
            Self::UnsavedMovie { movie } => write!(f, "Unsave '{movie}' from Saved Movies List."),
            Self::BrowsedUpcoming => f.write_str("Browsed UpComing Movies page"),
            Self::BrowsedSavedMovies => f.write_str("Browsed Saved Movies Page"),
            Self::BrowsedNotifications => f.write_str("Browsed Notifications Page"),
            Self::DeletedNotification => f.write_str("Delete notification."),
            Self::DismissedNotifications => f.write_str("Dismiss all notifications"),
            Self::BrowsedDiscussions => f.write_str("Browsed Discussion Page"),
            Self::ViewedDiscussion { content } => write!(f, "Viewed Discussion '{content}'"),
            Self::CreatedDiscussion { content } => write!(f, "Created Discussion {content}"),
            Self::DestroyedDiscussion => f.write_str("Destroyed Discussion"),
            Self::AddedReply { reply, discussion } => {
                write!(f, "Added Reply '{reply}' under discussion '{discussion}'.")
            }
            Self::DeletedReply { discussion } => {
                write!(f, "Deleted Reply under discussion '{discussion}'.")
            }
            Self::ProfileUpdated => f.write_str("profile_updated"),
        }
    }
}

/// Append-only audit sink.
///
/// [`record`](Self::record) is best effort: a failed insert is logged and
/// never bubbles up into the action that triggered it.
#[derive(Clone)]
pub struct ActivityRecorder {
    activity_repo: ActivityRepository,
    id_gen: IdGenerator,
}

impl ActivityRecorder {
    /// Create a new activity recorder.
    #[must_use]
    pub const fn new(activity_repo: ActivityRepository) -> Self {
        Self {
            activity_repo,
            id_gen: IdGenerator::new(),
        }
    }

    fn build(&self, user_id: &str, kind: &ActivityKind) -> activity::ActiveModel {
        activity::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            action: Set(kind.to_string()),
            created_at: Set(Utc::now().into()),
        }
    }

    /// Record an activity, logging instead of failing.
    pub async fn record(&self, user_id: &str, kind: &ActivityKind) -> Option<activity::Model> {
        match self.activity_repo.create(self.build(user_id, kind)).await {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(error = %e, user_id = %user_id, action = %kind, "Failed to record activity");
                None
            }
        }
    }

    /// Record an activity as part of a larger transaction.
    pub async fn record_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: &str,
        kind: &ActivityKind,
    ) -> AppResult<activity::Model> {
        self.activity_repo
            .create_in(conn, self.build(user_id, kind))
            .await
    }
}

/// Time filter of the activity dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    Today,
    ThisWeek,
    ThisMonth,
    #[default]
    All,
}

impl FromStr for TimeWindow {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Today" => Ok(Self::Today),
            "This Week" => Ok(Self::ThisWeek),
            "This Month" => Ok(Self::ThisMonth),
            "All" => Ok(Self::All),
            other => Err(AppError::BadRequest(format!("Unknown time period: {other}"))),
        }
    }
}

impl TimeWindow {
    /// Heading shown above the filtered list.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::ThisWeek => "This Week",
            Self::ThisMonth => "This Month",
            Self::All => "All time",
        }
    }

    /// Inclusive lower bound of the window in UTC, `None` for [`TimeWindow::All`].
    ///
    /// Days start at local midnight in `tz`; weeks start on Monday.
    #[must_use]
    pub fn start(self, now: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let today = now.with_timezone(&tz).date_naive();
        let first_day = match self {
            Self::All => return None,
            Self::Today => today,
            Self::ThisWeek => today
                .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
                .unwrap_or(today),
            Self::ThisMonth => today.with_day(1).unwrap_or(today),
        };
        local_midnight(first_day, tz)
    }
}

fn local_midnight(day: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let midnight = day.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// A page of the activity dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityDashboard {
    /// Non-admin users, for the user filter
    pub users: Vec<user::Model>,
    pub period: Option<&'static str>,
    pub activities: Page<ActivityRow>,
}

/// Outcome of a bulk activity deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityDeletion {
    DeletedAll,
    DeletedForUser,
    DeletedOne,
    NothingToDelete,
    /// Nothing to delete for a user; the list goes back to the user filter
    NothingToDeleteForUser,
    UserNotFound,
}

impl ActivityDeletion {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DeletedAll => "All activities have been deleted.",
            Self::DeletedForUser => "All activities for the user have been deleted.",
            Self::DeletedOne => "Activity has been deleted.",
            Self::NothingToDelete | Self::NothingToDeleteForUser => "No activities to be deleted.",
            Self::UserNotFound => "User not found.",
        }
    }
}

/// Admin-facing queries over the audit log.
#[derive(Clone)]
pub struct ActivityService {
    activity_repo: ActivityRepository,
    user_repo: UserRepository,
    timezone: Tz,
}

impl ActivityService {
    /// Create a new activity service.
    #[must_use]
    pub const fn new(activity_repo: ActivityRepository, user_repo: UserRepository, timezone: Tz) -> Self {
        Self {
            activity_repo,
            user_repo,
            timezone,
        }
    }

    /// All non-admin activity, newest first.
    pub async fn dashboard(&self, page: Option<u64>) -> AppResult<ActivityDashboard> {
        let request = PageRequest::new(page, DASHBOARD_PAGE_SIZE);
        Ok(ActivityDashboard {
            users: self.user_repo.find_non_admins().await?,
            period: None,
            activities: self.activity_repo.find_for_dashboard(None, None, request).await?,
        })
    }

    /// Activity of one user, or the whole dashboard when no user is picked.
    pub async fn filter_by_user(
        &self,
        user_id: Option<&str>,
        page: Option<u64>,
    ) -> AppResult<ActivityDashboard> {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return self.dashboard(page).await;
        };

        let user = self.user_repo.get_by_id(user_id).await?;
        let request = PageRequest::new(page, DASHBOARD_PAGE_SIZE);
        Ok(ActivityDashboard {
            users: vec![user],
            period: None,
            activities: self
                .activity_repo
                .find_for_dashboard(Some(user_id), None, request)
                .await?,
        })
    }

    /// Non-admin activity inside a time window.
    pub async fn filter_by_time(
        &self,
        window: TimeWindow,
        page: Option<u64>,
    ) -> AppResult<ActivityDashboard> {
        let since = window.start(Utc::now(), self.timezone);
        let request = PageRequest::new(page, DASHBOARD_PAGE_SIZE);
        Ok(ActivityDashboard {
            users: self.user_repo.find_non_admins().await?,
            period: Some(window.label()),
            activities: self.activity_repo.find_for_dashboard(None, since, request).await?,
        })
    }

    /// Delete every activity.
    pub async fn delete_all(&self) -> AppResult<ActivityDeletion> {
        let removed = self.activity_repo.delete_all().await?;
        tracing::info!(removed, "Deleted all activities");
        Ok(if removed == 0 {
            ActivityDeletion::NothingToDelete
        } else {
            ActivityDeletion::DeletedAll
        })
    }

    /// Delete every activity of one user.
    pub async fn delete_user_activities(&self, user_id: &str) -> AppResult<ActivityDeletion> {
        if self.user_repo.find_by_id(user_id).await?.is_none() {
            return Ok(ActivityDeletion::UserNotFound);
        }

        let removed = self.activity_repo.delete_by_user(user_id).await?;
        Ok(if removed == 0 {
            ActivityDeletion::NothingToDeleteForUser
        } else {
            ActivityDeletion::DeletedForUser
        })
    }

    /// Delete one activity.
    pub async fn delete_single(&self, id: &str) -> AppResult<ActivityDeletion> {
        let removed = self.activity_repo.delete(id).await?;
        Ok(if removed == 0 {
            ActivityDeletion::NothingToDelete
        } else {
            ActivityDeletion::DeletedOne
        })
    }

    /// Spreadsheet of every activity with its author.
    pub async fn export(&self) -> AppResult<Export> {
        let rows: Vec<Vec<String>> = self
            .activity_repo
            .find_all_rows()
            .await?
            .into_iter()
            .map(|row| {
                let time = row
                    .activity
                    .created_at
                    .with_timezone(&self.timezone)
                    .format(EXPORT_TIME_FORMAT)
                    .to_string();
                vec![row.user_name, row.user_email, capitalize(&row.activity.action), time]
            })
            .collect();

        Export::sheet(
            "user_activities.xlsx",
            "User Activities",
            &["Name", "Email", "Activity", "Time"],
            &rows,
        )
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: format!("User {id}"),
            email: format!("{id}@example.com"),
            password_hash: String::new(),
            is_admin,
            image_key: None,
            token: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_activity_kind_texts() {
        assert_eq!(
            ActivityKind::AddedReview { movie: "Heat".to_string() }.to_string(),
            "Added review in 'Heat'"
        );
        assert_eq!(
            ActivityKind::Searched { keyword: "Leonardo".to_string() }.to_string(),
            "Search for movies with keyword Leonardo"
        );
        assert_eq!(
            ActivityKind::AddedReply {
                reply: "Agreed".to_string(),
                discussion: "Best of 2024".to_string()
            }
            .to_string(),
            "Added Reply 'Agreed' under discussion 'Best of 2024'."
        );
        assert_eq!(ActivityKind::ProfileUpdated.to_string(), "profile_updated");
    }

    #[test]
    fn test_time_window_parse() {
        assert_eq!("This Week".parse::<TimeWindow>().unwrap(), TimeWindow::ThisWeek);
        assert_eq!("All".parse::<TimeWindow>().unwrap(), TimeWindow::All);
        assert!("Yesterday".parse::<TimeWindow>().is_err());
    }

    #[test]
    fn test_time_window_start_uses_local_midnight() {
        let tz: Tz = "Asia/Yangon".parse().unwrap();
        // 2024-05-15 (Wednesday) 20:00 UTC is already Thursday 02:30 in Yangon.
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 20, 0, 0).unwrap();

        // Yangon is UTC+06:30.
        assert_eq!(
            TimeWindow::Today.start(now, tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 15, 17, 30, 0).unwrap()
        );
        assert_eq!(
            TimeWindow::ThisWeek.start(now, tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 12, 17, 30, 0).unwrap()
        );
        assert_eq!(
            TimeWindow::ThisMonth.start(now, tz).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 30, 17, 30, 0).unwrap()
        );
        assert!(TimeWindow::All.start(now, tz).is_none());
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("viewed movie Heat"), "Viewed movie heat");
        assert_eq!(capitalize(""), "");
    }

    #[tokio::test]
    async fn test_record_swallows_failures() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_errors([sea_orm::DbErr::Custom("boom".to_string())])
                .into_connection(),
        );
        let recorder = ActivityRecorder::new(ActivityRepository::new(db));

        let recorded = recorder.record("u1", &ActivityKind::BrowsedUpcoming).await;
        assert!(recorded.is_none());
    }

    #[tokio::test]
    async fn test_record_returns_inserted_row() {
        let row = activity::Model {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            action: "Browsed Discussion Page".to_string(),
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );
        let recorder = ActivityRecorder::new(ActivityRepository::new(db));

        let recorded = recorder.record("u1", &ActivityKind::BrowsedDiscussions).await;
        assert_eq!(recorded, Some(row));
    }

    #[tokio::test]
    async fn test_delete_user_activities_unknown_user() {
        let activity_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = ActivityService::new(
            ActivityRepository::new(activity_db),
            UserRepository::new(user_db),
            chrono_tz::Asia::Yangon,
        );

        let outcome = service.delete_user_activities("ghost").await.unwrap();
        assert_eq!(outcome, ActivityDeletion::UserNotFound);
        assert_eq!(outcome.message(), "User not found.");
    }

    #[tokio::test]
    async fn test_delete_user_activities_nothing_to_delete() {
        let activity_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", false)]])
                .into_connection(),
        );
        let service = ActivityService::new(
            ActivityRepository::new(activity_db),
            UserRepository::new(user_db),
            chrono_tz::Asia::Yangon,
        );

        let outcome = service.delete_user_activities("u1").await.unwrap();
        assert_eq!(outcome, ActivityDeletion::NothingToDeleteForUser);
        assert_eq!(outcome.message(), "No activities to be deleted.");
    }

    #[tokio::test]
    async fn test_delete_all_reports_removed_rows() {
        let activity_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 7,
                }])
                .into_connection(),
        );
        let user_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = ActivityService::new(
            ActivityRepository::new(activity_db),
            UserRepository::new(user_db),
            chrono_tz::Asia::Yangon,
        );

        assert_eq!(service.delete_all().await.unwrap(), ActivityDeletion::DeletedAll);
    }
}
