use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub booking: BookingSettings,
    pub database: DatabaseSettings,
    pub mail: MailSettings,
    #[serde(default)]
    pub credentials: CredentialSettings,
    #[serde(default)]
    pub notification: NotificationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingSettings {
    pub login_url: String,
    pub availability_url: String,
    #[serde(default = "default_exam_type")]
    pub exam_type: String,
    pub last_name: String,
    pub license_number: String,
    pub keyword: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub sender_email: String,
    pub from_name: Option<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Falls back to the credential store when unset
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialSettings {
    #[serde(default)]
    pub backend: CredentialBackend,
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    pub bucket: Option<String>,
    #[serde(default = "default_credentials_key")]
    pub credentials_key: String,
    #[serde(default = "default_token_key")]
    pub token_key: String,
    pub endpoint: Option<String>,
    pub region: Option<String>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            credentials_path: default_credentials_path(),
            token_path: default_token_path(),
            bucket: None,
            credentials_key: default_credentials_key(),
            token_key: default_token_key(),
            endpoint: None,
            region: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    /// Days ahead of today to notify about; 0 removes the upper bound
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_suppress_repeats")]
    pub suppress_repeats: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            suppress_repeats: default_suppress_repeats(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_exam_type() -> String { "5-R-1".to_string() }
fn default_timeout_secs() -> u64 { 10 }
fn default_smtp_port() -> u16 { 587 }
fn default_subject() -> String { "New road test availability".to_string() }
fn default_credentials_path() -> PathBuf { PathBuf::from("credentials.json") }
fn default_token_path() -> PathBuf { PathBuf::from("token.json") }
fn default_credentials_key() -> String { "credentials.json".to_string() }
fn default_token_key() -> String { "token.json".to_string() }
fn default_window_days() -> u32 { 15 }
fn default_suppress_repeats() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml, optional and untracked)
    /// 4. Environment variables (prefixed with SLOTWATCH__)
    /// 5. `DATABASE_URL`, which replaces `database.url` when set
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., SLOTWATCH__MAIL__SMTP_HOST -> mail.smtp_host
            .add_source(environment())
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("SLOTWATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Apply well-known environment variables that live outside the prefix
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }

    builder.build()
}
