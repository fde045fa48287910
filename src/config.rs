//! Configuration module for drive.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key used to verify bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds (used when issuing tokens).
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Whether to serve stored objects under `/media`.
    #[serde(default)]
    pub serve_media: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8071
}

fn default_jwt_access_expiry() -> u64 {
    3600 // 1 hour
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            serve_media: false,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/drive.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the local object storage directory.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Public base URL that download redirects point at.
    #[serde(default = "default_media_base_url")]
    pub media_base_url: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "data/media".to_string()
}

fn default_media_base_url() -> String {
    "http://localhost:8071/media".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            media_base_url: default_media_base_url(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty disables file logging.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/drive.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Product analytics configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// PostHog project key. Events are only captured when set.
    #[serde(default)]
    pub posthog_key: String,
    /// PostHog API host.
    #[serde(default = "default_posthog_host")]
    pub posthog_host: String,
}

fn default_posthog_host() -> String {
    "https://eu.i.posthog.com".to_string()
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            posthog_key: String::new(),
            posthog_host: default_posthog_host(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Analytics configuration.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DRIVE_JWT_SECRET`: Override the JWT secret key
    /// - `DRIVE_POSTHOG_KEY`: Override the analytics capture key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("DRIVE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.server.jwt_secret = jwt_secret;
            }
        }
        if let Ok(key) = std::env::var("DRIVE_POSTHOG_KEY") {
            if !key.is_empty() {
                self.analytics.posthog_key = key;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the JWT secret is missing or the media base URL
    /// is not an absolute URL.
    pub fn validate(&self) -> Result<()> {
        if self.server.jwt_secret.is_empty() {
            return Err(DriveError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via DRIVE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        url::Url::parse(&self.storage.media_base_url).map_err(|e| {
            DriveError::Config(format!(
                "invalid media_base_url '{}': {e}",
                self.storage.media_base_url
            ))
        })?;
        Ok(())
    }
}
