//! Activity repository.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Page, PageRequest, fetch_page};
use crate::entities::{Activity, User, activity, user};
use chrono::{DateTime, Utc};
use cinelog_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};
use serde::Serialize;

/// An activity together with its author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRow {
    #[serde(flatten)]
    pub activity: activity::Model,
    pub user_name: String,
    pub user_email: String,
}

/// Activity repository for database operations.
#[derive(Clone)]
pub struct ActivityRepository {
    db: Arc<DatabaseConnection>,
}

/// Activities of non-admin users, optionally narrowed, newest first.
fn dashboard_query(user_id: Option<&str>, since: Option<DateTime<Utc>>) -> Select<Activity> {
    let mut query = Activity::find()
        .join(JoinType::InnerJoin, activity::Relation::User.def())
        .filter(user::Column::IsAdmin.eq(false))
        .order_by_desc(activity::Column::CreatedAt)
        .order_by_desc(activity::Column::Id);

    if let Some(user_id) = user_id {
        query = query.filter(activity::Column::UserId.eq(user_id));
    }
    if let Some(since) = since {
        query = query.filter(activity::Column::CreatedAt.gte(since));
    }
    query
}

impl ActivityRepository {
    /// Create a new activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an activity on the given connection.
    pub async fn create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        model: activity::ActiveModel,
    ) -> AppResult<activity::Model> {
        model
            .insert(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Append an activity.
    pub async fn create(&self, model: activity::ActiveModel) -> AppResult<activity::Model> {
        self.create_in(self.db.as_ref(), model).await
    }

    /// Activities of non-admin users, newest first.
    pub async fn find_for_dashboard(
        &self,
        user_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        request: PageRequest,
    ) -> AppResult<Page<ActivityRow>> {
        let page = fetch_page(self.db.as_ref(), dashboard_query(user_id, since), request).await?;
        let users = self.authors(&page.items).await?;

        Ok(page.map(|activity| attach_author(activity, &users)))
    }

    /// Every activity with its author, newest first.
    pub async fn find_all_rows(&self) -> AppResult<Vec<ActivityRow>> {
        let activities = Activity::find()
            .order_by_desc(activity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let users = self.authors(&activities).await?;

        Ok(activities
            .into_iter()
            .map(|activity| attach_author(activity, &users))
            .collect())
    }

    async fn authors(
        &self,
        activities: &[activity::Model],
    ) -> AppResult<HashMap<String, user::Model>> {
        if activities.is_empty() {
            return Ok(HashMap::new());
        }

        let mut ids: Vec<&str> = activities.iter().map(|a| a.user_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();

        let users = User::find()
            .filter(user::Column::Id.is_in(ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().map(|u| (u.id.clone(), u)).collect())
    }

    /// Delete every activity.
    pub async fn delete_all(&self) -> AppResult<u64> {
        Activity::delete_many()
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete every activity of one user.
    pub async fn delete_by_user(&self, user_id: &str) -> AppResult<u64> {
        Activity::delete_many()
            .filter(activity::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete one activity.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        Activity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|r| r.rows_affected)
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn attach_author(activity: activity::Model, users: &HashMap<String, user::Model>) -> ActivityRow {
    let (user_name, user_email) = users
        .get(&activity.user_id)
        .map(|u| (u.name.clone(), u.email.clone()))
        .unwrap_or_default();
    ActivityRow {
        activity,
        user_name,
        user_email,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};

    fn create_test_activity(id: &str, user_id: &str, action: &str) -> activity::Model {
        activity::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_user(id: &str, name: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{name}@example.com"),
            password_hash: "hash".to_string(),
            is_admin: false,
            image_key: None,
            token: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_dashboard_query_excludes_admins() {
        let sql = dashboard_query(Some("u1"), None)
            .build(DatabaseBackend::Postgres)
            .to_string();
        assert!(sql.contains("INNER JOIN \"user\""));
        assert!(sql.contains("\"user\".\"is_admin\" = FALSE"));
        assert!(sql.contains("\"activity\".\"user_id\" = 'u1'"));
    }

    #[tokio::test]
    async fn test_find_for_dashboard_attaches_authors() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(2))
                }]])
                .append_query_results([[
                    create_test_activity("a2", "u1", "Viewed movie Heat"),
                    create_test_activity("a1", "u1", "Browsed Discussion Page"),
                ]])
                .append_query_results([[create_test_user("u1", "alice")]])
                .into_connection(),
        );

        let repo = ActivityRepository::new(db);
        let page = repo
            .find_for_dashboard(None, None, PageRequest::new(None, 10))
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].user_name, "alice");
        assert_eq!(page.items[1].user_email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_delete_all_reports_zero_when_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = ActivityRepository::new(db);
        assert_eq!(repo.delete_all().await.unwrap(), 0);
    }
}
