//! Application configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Attachment storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Outbound mail.
    pub mail: MailConfig,
    /// Application behavior.
    #[serde(default)]
    pub app: AppConfig,
    /// Housekeeping scheduler.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Local attachment storage.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    #[serde(default = "default_storage_url")]
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
        }
    }
}

/// Outbound mail configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Recipient of feedback notifications.
    pub operator_address: String,
    /// SMTP relay. Mail is only logged when absent.
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

/// SMTP relay settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub use_tls: bool,
}

/// How a year filter matches release dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearMatch {
    /// Text containment on the stored date.
    #[default]
    Substring,
    /// Half-open range `[Jan 1, Jan 1 of next year)`.
    Range,
}

/// Application behavior settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// IANA timezone used for time windows, exports and schedules.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub year_match: YearMatch,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            year_match: YearMatch::default(),
        }
    }
}

impl AppConfig {
    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<chrono_tz::Tz, crate::AppError> {
        self.timezone
            .parse()
            .map_err(|_| crate::AppError::Config(format!("Unknown timezone: {}", self.timezone)))
    }
}

/// Housekeeping scheduler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Only the designated leader process runs timers.
    #[serde(default)]
    pub enabled: bool,
    /// Directories swept by the temp-file cleanup job.
    #[serde(default = "default_cleanup_paths")]
    pub cleanup_paths: Vec<PathBuf>,
    #[serde(default = "default_cleanup_max_age_hours")]
    pub cleanup_max_age_hours: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            cleanup_paths: default_cleanup_paths(),
            cleanup_max_age_hours: default_cleanup_max_age_hours(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("storage")
}

fn default_storage_url() -> String {
    "/files".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

const fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "Asia/Yangon".to_string()
}

fn default_cleanup_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("tmp"), PathBuf::from("log")]
}

const fn default_cleanup_max_age_hours() -> u64 {
    24
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `CINELOG_ENV`)
    /// 4. Environment variables with `CINELOG_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("CINELOG_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("CINELOG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("CINELOG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "http://localhost:3000"

                [database]
                url = "postgres://localhost/cinelog"

                [mail]
                operator_address = "ops@example.com"

                [app]
                year_match = "range"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.app.timezone, "Asia/Yangon");
        assert_eq!(config.app.year_match, YearMatch::Range);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.cleanup_max_age_hours, 24);
        assert!(config.mail.smtp.is_none());
        assert!(config.app.tz().is_ok());
    }
}
