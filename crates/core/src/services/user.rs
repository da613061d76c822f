//! Accounts, sessions and user administration.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, FixedOffset, Utc};
use cinelog_common::{AppError, AppResult, FieldErrors, IdGenerator};
use cinelog_db::{
    Page, PageRequest,
    entities::user,
    repositories::UserRepository,
};
use rand::{Rng, distributions::Alphanumeric};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::ValidateEmail;

use super::activity::{ActivityKind, ActivityRecorder};
use super::attachment::{Attachments, ImageUpload};
use super::spreadsheet::{Export, ImportSummary, Upload, cell, read_rows};

/// Users per page in the admin listing.
pub const USERS_PAGE_SIZE: u64 = 10;

const IMAGE_SCOPE: &str = "users";
const ADMIN_DOMAIN: &str = "@admin.com";
const MIN_PASSWORD: usize = 6;
const MAX_PASSWORD: usize = 128;
const GENERATED_PASSWORD_LEN: usize = 16;
const NAME_COLUMN: usize = 0;
const EMAIL_COLUMN: usize = 1;

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Admin registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Account edit form. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Blank keeps the current password
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

/// A signed-in user and the bearer token of the session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: user::Model,
    pub token: String,
}

fn name_errors(errors: &mut FieldErrors, name: &str) {
    if name.trim().is_empty() {
        errors.add("name", "can't be blank");
    }
}

fn email_errors(errors: &mut FieldErrors, email: &str) {
    let email = email.trim();
    if email.is_empty() {
        errors.add("email", "can't be blank");
    } else if !email.validate_email() {
        errors.add("email", "is invalid");
    }
}

fn password_errors(errors: &mut FieldErrors, password: &str) {
    let len = password.chars().count();
    if len < MIN_PASSWORD {
        errors.add(
            "password",
            format!("is too short (minimum is {MIN_PASSWORD} characters)"),
        );
    } else if len > MAX_PASSWORD {
        errors.add(
            "password",
            format!("is too long (maximum is {MAX_PASSWORD} characters)"),
        );
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash a password with a fresh salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn format_time(time: &DateTime<FixedOffset>) -> String {
    time.with_timezone(&Utc)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

fn ensure_self_or_admin(actor: &user::Model, user_id: &str) -> AppResult<()> {
    if actor.id == user_id || actor.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "You are not authorized to perform this action.".to_string(),
        ))
    }
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    activity: ActivityRecorder,
    attachments: Attachments,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        user_repo: UserRepository,
        activity: ActivityRecorder,
        attachments: Attachments,
    ) -> Self {
        Self {
            db,
            user_repo,
            activity,
            attachments,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Resolve a bearer token.
    pub async fn authenticate(&self, token: &str) -> AppResult<Option<user::Model>> {
        if token.is_empty() {
            return Ok(None);
        }
        self.user_repo.find_by_token(token).await
    }

    async fn ensure_email_free(&self, email: &str, except: Option<&str>) -> AppResult<()> {
        if let Some(existing) = self.user_repo.find_by_email(email).await?
            && Some(existing.id.as_str()) != except
        {
            return Err(AppError::Invalid(FieldErrors::single(
                "email",
                "has already been taken",
            )));
        }
        Ok(())
    }

    fn new_user(
        &self,
        name: &str,
        email: &str,
        password_hash: String,
        is_admin: bool,
        token: Option<String>,
    ) -> user::ActiveModel {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.trim().to_string()),
            email: Set(normalize_email(email)),
            password_hash: Set(password_hash),
            is_admin: Set(is_admin),
            image_key: Set(None),
            token: Set(token),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }

    /// Sign up and sign in.
    ///
    /// The first `@admin.com` account becomes an administrator.
    pub async fn register(&self, input: RegisterInput) -> AppResult<Session> {
        let mut errors = FieldErrors::new();
        name_errors(&mut errors, &input.name);
        email_errors(&mut errors, &input.email);
        password_errors(&mut errors, &input.password);
        errors.into_result()?;

        let email = normalize_email(&input.email);
        self.ensure_email_free(&email, None).await?;

        let is_admin = email.ends_with(ADMIN_DOMAIN) && !self.user_repo.admin_exists().await?;
        let token = self.id_gen.generate_token();
        let user = self
            .user_repo
            .create(self.new_user(
                &input.name,
                &email,
                hash_password(&input.password)?,
                is_admin,
                Some(token.clone()),
            ))
            .await?;

        tracing::info!(user_id = %user.id, is_admin, "User registered");
        Ok(Session { user, token })
    }

    /// Check credentials and open a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<Session> {
        let invalid = || AppError::Unauthorized("Invalid email or password.".to_string());

        let user = self.user_repo.find_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token.clone()));
        let user = self.user_repo.update(active).await?;

        tracing::debug!(user_id = %user.id, "Signed in");
        Ok(Session { user, token })
    }

    /// Close the current session.
    pub async fn sign_out(&self, user: &user::Model) -> AppResult<()> {
        let mut active: user::ActiveModel = user.clone().into();
        active.token = Set(None);
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Rename and/or change the profile image of the current user.
    pub async fn update_profile(
        &self,
        user: &user::Model,
        name: Option<String>,
        image: Option<ImageUpload>,
    ) -> AppResult<user::Model> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &name {
            name_errors(&mut errors, name);
        }
        if let Some(upload) = &image
            && !upload.is_image()
        {
            errors.add("image", "must be an image");
        }
        errors.into_result()?;

        let new_key = match &image {
            Some(upload) => Some(self.attachments.store(IMAGE_SCOPE, upload).await?),
            None => None,
        };

        let mut active: user::ActiveModel = user.clone().into();
        if let Some(name) = name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(key) = &new_key {
            active.image_key = Set(Some(key.clone()));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = match self.user_repo.update(active).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(key) = &new_key {
                    self.attachments.remove(key).await;
                }
                return Err(e);
            }
        };
        if new_key.is_some()
            && let Some(old) = &user.image_key
        {
            self.attachments.remove(old).await;
        }

        self.activity.record(&updated.id, &ActivityKind::ProfileUpdated).await;
        Ok(updated)
    }

    /// Delete the current account after re-checking the password.
    pub async fn delete_account(&self, user: &user::Model, current_password: &str) -> AppResult<()> {
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::BadRequest(
                "Incorrect password. Account deletion failed.".to_string(),
            ));
        }
        self.remove(user).await
    }

    async fn remove(&self, user: &user::Model) -> AppResult<()> {
        if self.user_repo.delete(&user.id).await? == 0 {
            return Err(AppError::NotFound("User not found.".to_string()));
        }
        if let Some(key) = &user.image_key {
            self.attachments.remove(key).await;
        }
        tracing::info!(user_id = %user.id, "User deleted");
        Ok(())
    }

    /// Users ordered by name.
    pub async fn list(&self, page: Option<u64>) -> AppResult<Page<user::Model>> {
        self.user_repo
            .list(PageRequest::new(page, USERS_PAGE_SIZE))
            .await
    }

    /// Case-insensitive name search.
    pub async fn search(&self, keyword: &str, page: Option<u64>) -> AppResult<Page<user::Model>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(AppError::BadRequest("Type User Name to search".to_string()));
        }
        self.user_repo
            .search_by_name(keyword, PageRequest::new(page, USERS_PAGE_SIZE))
            .await
    }

    /// Register a user on someone's behalf.
    pub async fn create_registration(&self, form: UserForm) -> AppResult<user::Model> {
        let mut errors = FieldErrors::new();
        name_errors(&mut errors, &form.name);
        email_errors(&mut errors, &form.email);
        password_errors(&mut errors, &form.password);
        errors.into_result()?;

        self.ensure_email_free(&form.email, None).await?;
        let user = self
            .user_repo
            .create(self.new_user(
                &form.name,
                &form.email,
                hash_password(&form.password)?,
                form.is_admin,
                None,
            ))
            .await?;
        tracing::info!(user_id = %user.id, is_admin = user.is_admin, "User created");
        Ok(user)
    }

    /// Edit an account. Only administrators may change the admin flag.
    pub async fn update(
        &self,
        actor: &user::Model,
        id: &str,
        form: UserUpdate,
        image: Option<ImageUpload>,
    ) -> AppResult<user::Model> {
        ensure_self_or_admin(actor, id)?;
        let user = self.user_repo.get_by_id(id).await?;

        let password = form.password.filter(|p| !p.is_empty());
        let mut errors = FieldErrors::new();
        if let Some(name) = &form.name {
            name_errors(&mut errors, name);
        }
        if let Some(email) = &form.email {
            email_errors(&mut errors, email);
        }
        if let Some(password) = &password {
            password_errors(&mut errors, password);
        }
        if let Some(upload) = &image
            && !upload.is_image()
        {
            errors.add("image", "must be an image");
        }
        errors.into_result()?;

        if let Some(email) = &form.email {
            self.ensure_email_free(email, Some(&user.id)).await?;
        }

        let new_key = match &image {
            Some(upload) => Some(self.attachments.store(IMAGE_SCOPE, upload).await?),
            None => None,
        };

        let old_key = user.image_key.clone();
        let mut active: user::ActiveModel = user.into();
        if let Some(name) = form.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(email) = form.email {
            active.email = Set(normalize_email(&email));
        }
        if let Some(password) = password {
            active.password_hash = Set(hash_password(&password)?);
        }
        if actor.is_admin
            && let Some(is_admin) = form.is_admin
        {
            active.is_admin = Set(is_admin);
        }
        if let Some(key) = &new_key {
            active.image_key = Set(Some(key.clone()));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = match self.user_repo.update(active).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(key) = &new_key {
                    self.attachments.remove(key).await;
                }
                return Err(e);
            }
        };
        if new_key.is_some()
            && let Some(old) = &old_key
        {
            self.attachments.remove(old).await;
        }
        Ok(updated)
    }

    /// Delete a user with everything they own.
    pub async fn destroy(&self, id: &str) -> AppResult<()> {
        let user = self.user_repo.get_by_id(id).await?;
        self.remove(&user).await
    }

    /// Drop the profile image of a user.
    pub async fn delete_image(&self, actor: &user::Model, id: &str) -> AppResult<user::Model> {
        ensure_self_or_admin(actor, id)?;
        let user = self.user_repo.get_by_id(id).await?;
        let Some(key) = user.image_key.clone() else {
            return Ok(user);
        };

        let mut active: user::ActiveModel = user.into();
        active.image_key = Set(None);
        active.updated_at = Set(Utc::now().into());
        let updated = self.user_repo.update(active).await?;
        self.attachments.remove(&key).await;
        Ok(updated)
    }

    /// Import users from a spreadsheet; each gets a random password.
    pub async fn import(&self, upload: Option<Upload>) -> AppResult<ImportSummary> {
        let upload = upload
            .ok_or_else(|| AppError::BadRequest("No file selected for import.".to_string()))?;
        let rows = read_rows(&upload)?;

        let mut summary = ImportSummary::default();
        let txn = self.db.begin().await?;
        for (index, row) in rows.iter().enumerate() {
            let name = cell(row, NAME_COLUMN).as_text().unwrap_or_default();
            let email = cell(row, EMAIL_COLUMN).as_text().unwrap_or_default();

            let mut errors = FieldErrors::new();
            name_errors(&mut errors, &name);
            email_errors(&mut errors, &email);
            if !errors.is_empty() {
                tracing::warn!(row = index + 1, errors = %errors, "Invalid user row, skipping");
                summary.invalid.push(email);
                continue;
            }

            let email = normalize_email(&email);
            if self.user_repo.find_by_email_in(&txn, &email).await?.is_some() {
                summary.existing.push(email);
                continue;
            }

            let model = self.new_user(&name, &email, hash_password(&random_password())?, false, None);
            self.user_repo.create_in(&txn, model).await?;
            summary.imported += 1;
        }
        txn.commit().await?;

        tracing::info!(
            imported = summary.imported,
            existing = summary.existing.len(),
            invalid = summary.invalid.len(),
            "User import finished"
        );
        Ok(summary)
    }

    /// Export every user.
    pub async fn export(&self) -> AppResult<Export> {
        let rows: Vec<Vec<String>> = self
            .user_repo
            .find_all()
            .await?
            .into_iter()
            .map(|u| {
                vec![
                    u.name,
                    u.email,
                    format_time(&u.created_at),
                    format_time(&u.updated_at),
                    u.is_admin.to_string(),
                ]
            })
            .collect();
        Export::sheet(
            "users.xlsx",
            "Users",
            &["Name", "Email", "Created_at", "Updated_at", "Admin"],
            &rows,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cinelog_common::{LocalStorage, StorageBackend};
    use cinelog_db::repositories::ActivityRepository;
    use crate::services::spreadsheet::XLSX_MIME;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, email: &str, password: &str, is_admin: bool) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Member".to_string(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            is_admin,
            image_key: None,
            token: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> UserService {
        let storage = LocalStorage::new(
            std::env::temp_dir().join("cinelog-user-tests"),
            "/files".to_string(),
        );
        service_with(Arc::new(db.into_connection()), Arc::new(storage))
    }

    fn service_with(db: Arc<DatabaseConnection>, storage: Arc<LocalStorage>) -> UserService {
        UserService::new(
            db.clone(),
            UserRepository::new(db.clone()),
            ActivityRecorder::new(ActivityRepository::new(db)),
            Attachments::new(storage),
        )
    }

    fn count(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        maplit::btreemap! { "num_items" => sea_orm::Value::BigInt(Some(n)) }
    }

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("secret2", &hash).unwrap());
    }

    #[test]
    fn test_random_password_length() {
        let password = random_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_register_validates_fields() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .register(RegisterInput {
                name: " ".to_string(),
                email: "not-an-email".to_string(),
                password: "12345".to_string(),
            })
            .await;

        let Err(AppError::Invalid(errors)) = result else {
            panic!("expected field errors");
        };
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[tokio::test]
    async fn test_register_first_admin_domain_user_is_admin() {
        let created = create_test_user("u1", "boss@admin.com", "secret1", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[count(0)]])
            .append_query_results([[created]]);

        let session = service(db)
            .register(RegisterInput {
                name: "Boss".to_string(),
                email: "Boss@Admin.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();

        assert!(session.user.is_admin);
        assert_eq!(session.token.len(), 32);
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let existing = create_test_user("u1", "taken@example.com", "secret1", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]);

        let result = service(db)
            .register(RegisterInput {
                name: "Copy".to_string(),
                email: "taken@example.com".to_string(),
                password: "secret1".to_string(),
            })
            .await;

        let Err(AppError::Invalid(errors)) = result else {
            panic!("expected field errors");
        };
        assert_eq!(
            errors.get("email").unwrap(),
            ["has already been taken".to_string()]
        );
    }

    #[tokio::test]
    async fn test_sign_in_with_wrong_password() {
        let user = create_test_user("u1", "member@example.com", "secret1", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]);

        let result = service(db).sign_in("member@example.com", "wrong!!").await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_sign_in_issues_token() {
        let user = create_test_user("u1", "member@example.com", "secret1", false);
        let signed_in = user::Model {
            token: Some("stored".to_string()),
            ..user.clone()
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user]])
            .append_query_results([[signed_in]]);

        let session = service(db)
            .sign_in("member@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(session.user.id, "u1");
        assert!(!session.token.is_empty());
    }

    #[tokio::test]
    async fn test_delete_account_with_wrong_password() {
        let user = create_test_user("u1", "member@example.com", "secret1", false);
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .delete_account(&user, "nope")
            .await;

        match result {
            Err(AppError::BadRequest(message)) => {
                assert_eq!(message, "Incorrect password. Account deletion failed.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_account_removes_user_and_avatar() {
        let root = std::env::temp_dir().join(format!("cinelog-user-delete-{}", std::process::id()));
        let storage = Arc::new(LocalStorage::new(root.clone(), "/files".to_string()));
        storage
            .upload("users/u1/avatar.png", &[0x89, 0x50], "image/png")
            .await
            .unwrap();

        let user = user::Model {
            image_key: Some("users/u1/avatar.png".to_string()),
            ..create_test_user("u1", "member@example.com", "secret1", false)
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = service_with(db.clone(), storage.clone());

        service.delete_account(&user, "secret1").await.unwrap();
        assert!(!storage.exists("users/u1/avatar.png").await.unwrap());

        // One statement: owned rows go with the user row through the foreign keys
        drop(service);
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = &log[0].statements()[0].sql;
        assert!(sql.starts_with(r#"DELETE FROM "user""#));

        tokio::fs::remove_dir_all(&root).await.ok();
    }

    #[tokio::test]
    async fn test_destroy_unknown_user_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);

        let result = service(db).destroy("u404").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_by_other_member_is_forbidden() {
        let actor = create_test_user("u1", "a@example.com", "secret1", false);
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .update(&actor, "u2", UserUpdate::default(), None)
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_member_cannot_grant_admin() {
        let actor = create_test_user("u1", "a@example.com", "secret1", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[actor.clone()]])
            .append_query_results([[actor.clone()]]);
        let service = service(db);

        let updated = service
            .update(
                &actor,
                "u1",
                UserUpdate {
                    is_admin: Some(true),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(!updated.is_admin);
    }

    #[tokio::test]
    async fn test_search_requires_keyword() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .search("  ", None)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(m)) if m == "Type User Name to search"));
    }

    #[tokio::test]
    async fn test_import_requires_file() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .import(None)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_import_sorts_rows() {
        let header: &[&str] = &["Name", "Email"];
        let rows = vec![
            vec!["New".to_string(), "new@example.com".to_string()],
            vec!["Old".to_string(), "old@example.com".to_string()],
            vec!["Broken".to_string(), "broken".to_string()],
        ];
        let export = Export::sheet("users.xlsx", "Users", header, &rows).unwrap();
        let upload = Upload {
            filename: "users.xls".to_string(),
            bytes: export.bytes,
        };

        let existing = create_test_user("u9", "old@example.com", "secret1", false);
        let created = create_test_user("u10", "new@example.com", "secret1", false);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .append_query_results([[created]])
            .append_query_results([[existing]]);

        let summary = service(db).import(Some(upload)).await.unwrap();
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.existing, vec!["old@example.com".to_string()]);
        assert_eq!(summary.invalid, vec!["broken".to_string()]);
    }

    #[tokio::test]
    async fn test_export_users() {
        let admin = create_test_user("u1", "boss@admin.com", "secret1", true);
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[admin]]);

        let export = service(db).export().await.unwrap();
        assert_eq!(export.filename, "users.xlsx");
        assert_eq!(export.content_type, XLSX_MIME);
        assert!(!export.bytes.is_empty());
    }
}
