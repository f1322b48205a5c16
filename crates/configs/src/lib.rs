//! # Configuration
//!
//! Layering, lowest precedence first:
//! 1. built-in defaults
//! 2. an optional TOML file (`FOLIO_CONFIG`, default `config/folio.toml`)
//! 3. `FOLIO__SECTION__KEY` environment variables
//! 4. the conventional deployment variables (`PORT`, `DATABASE_URL`,
//!    `JWT_SECRET`, ...)
//!
//! A `.env` file is read into the process environment first.

use std::collections::HashMap;
use std::path::PathBuf;

use config::{Config, Environment, File, FileFormat};
use domains::{DEFAULT_MAX_UPLOAD_BYTES, MIN_MAX_UPLOAD_BYTES};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub const MIN_JWT_SECRET_BYTES: usize = 32;

const DEFAULT_CONFIG_FILE: &str = "config/folio.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    pub env: AppEnv,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Prefix for generated image URLs; empty means root-relative.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    #[serde(default, deserialize_with = "optional_secret")]
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(deserialize_with = "secret")]
    pub jwt_secret: SecretString,
    #[serde(default, deserialize_with = "optional_secret")]
    pub recaptcha_secret: Option<SecretString>,
    pub captcha_dev_hostname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitSettings {
    pub window_secs: u64,
}

/// Bootstrap account read by the `seed` binary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSettings {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub uploads: UploadSettings,
    pub visits: VisitSettings,
    #[serde(default)]
    pub admin: AdminSettings,
}

fn secret<'de, D: Deserializer<'de>>(d: D) -> Result<SecretString, D::Error> {
    String::deserialize(d).map(SecretString::from)
}

fn optional_secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(d)?
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from))
}

impl Settings {
    /// Reads `.env`, then the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_vars(std::env::vars().collect())
    }

    /// Builds settings from an explicit variable map instead of the process
    /// environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, SettingsError> {
        let conventional = |key: &str| vars.get(key).filter(|v| !v.trim().is_empty()).cloned();
        let config_file =
            conventional("FOLIO_CONFIG").unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());
        let cors = conventional("CORS_ORIGINS").map(|raw| split_list(&raw));
        let env = conventional("APP_ENV").map(|e| e.to_lowercase());

        let settings: Settings = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.log_format", "pretty")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 4000)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("server.public_base_url", "")?
            .set_default("database.backend", "postgres")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.captcha_dev_hostname", "localhost")?
            .set_default("uploads.dir", "uploads/photos")?
            .set_default("uploads.max_bytes", DEFAULT_MAX_UPLOAD_BYTES as u64)?
            .set_default("visits.window_secs", 3600)?
            .add_source(File::new(&config_file, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix("FOLIO")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("app.env", env)?
            .set_override_option("server.port", conventional("PORT"))?
            .set_override_option("server.cors_origins", cors)?
            .set_override_option("server.public_base_url", conventional("PUBLIC_BASE_URL"))?
            .set_override_option("database.url", conventional("DATABASE_URL"))?
            .set_override_option("auth.jwt_secret", conventional("JWT_SECRET"))?
            .set_override_option("auth.recaptcha_secret", conventional("RECAPTCHA_SECRET_KEY"))?
            .set_override_option("uploads.dir", conventional("UPLOAD_DIR"))?
            .set_override_option("admin.username", conventional("ADMIN_USERNAME"))?
            .set_override_option("admin.email", conventional("ADMIN_EMAIL"))?
            .set_override_option("admin.password", conventional("ADMIN_PASSWORD"))?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_BYTES {
            return Err(SettingsError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes"
            )));
        }
        let (low, high) = (MIN_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_BYTES);
        if !(low..=high).contains(&self.uploads.max_bytes) {
            return Err(SettingsError::Invalid(format!(
                "uploads.max_bytes must be between {low} and {high}"
            )));
        }
        if self.server.port == 0 {
            return Err(SettingsError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_none() {
            return Err(SettingsError::Invalid(
                "database.url (DATABASE_URL) is required for the postgres backend".into(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.app.env == AppEnv::Production
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
