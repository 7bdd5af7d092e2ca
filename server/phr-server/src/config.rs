//! Server configuration
//!
//! Values are layered: built-in defaults, then an optional configuration file,
//! then process environment (a `.env` file is loaded into the environment by
//! `main` before this runs). Environment keys are the upper-case field names,
//! e.g. `DATABASE_URL`, `SECRET_KEY`, `ACCESS_TOKEN_EXPIRE_MINUTES`.

use config::{Config, Environment, File};
use serde::Deserialize;

/// Signing secret used when none is configured; startup logs a warning
pub const DEV_SECRET_KEY: &str = "dev-secret-key-change-me-in-production";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `development` or `production`; selects log format
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Postgres connection string; absent means in-memory stores
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    /// JWT signing secret
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// HS256, HS384 or HS512
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_access_token_expire_minutes")]
    pub access_token_expire_minutes: i64,

    #[serde(default = "default_refresh_token_expire_days")]
    pub refresh_token_expire_days: i64,

    /// Base64 32-byte key for report field encryption
    #[serde(default)]
    pub encryption_key: Option<String>,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible chat completions base URL
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,

    #[serde(default = "default_insight_model")]
    pub insight_model: String,

    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Bytes
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Comma separated, without dots
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: String,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Comma separated origins for CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,

    #[serde(default = "default_admin_full_name")]
    pub admin_full_name: String,
}

fn default_app_name() -> String {
    "Personal Health Record System".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_max_connections() -> u32 {
    20
}

fn default_secret_key() -> String {
    DEV_SECRET_KEY.to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_access_token_expire_minutes() -> i64 {
    30
}

fn default_refresh_token_expire_days() -> i64 {
    7
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_insight_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_max_file_size() -> usize {
    10 * 1024 * 1024
}

fn default_allowed_extensions() -> String {
    "pdf,jpg,jpeg,png,docx".to_string()
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_allowed_origins() -> String {
    "http://localhost:3000,http://localhost:5173,http://localhost:5174".to_string()
}

fn default_admin_email() -> String {
    "admin@phr.local".to_string()
}

fn default_admin_password() -> String {
    "ChangeMe!Admin123".to_string()
}

fn default_admin_full_name() -> String {
    "System Administrator".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            database_url: None,
            database_max_connections: default_max_connections(),
            secret_key: default_secret_key(),
            algorithm: default_algorithm(),
            access_token_expire_minutes: default_access_token_expire_minutes(),
            refresh_token_expire_days: default_refresh_token_expire_days(),
            encryption_key: None,
            openai_api_key: None,
            llm_base_url: default_llm_base_url(),
            insight_model: default_insight_model(),
            chat_model: default_chat_model(),
            max_file_size: default_max_file_size(),
            allowed_extensions: default_allowed_extensions(),
            upload_dir: default_upload_dir(),
            allowed_origins: default_allowed_origins(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
            admin_full_name: default_admin_full_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        builder
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Lower-cased extension allowlist
    pub fn allowed_extensions(&self) -> Vec<String> {
        split_list(&self.allowed_extensions)
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect()
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        split_list(&self.allowed_origins).map(str::to_string).collect()
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.secret_key == DEV_SECRET_KEY
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}
