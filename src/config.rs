//! Gateway configuration
//!
//! Loaded once at startup from a JSON file. Any missing required key or
//! invalid value aborts startup; the gateway never serves with a partial
//! configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_server::HttpServerConfig;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "./aphreton.json";

/// Upper bound for token lifetimes, in seconds (100 years)
pub const MAX_VALID_DURATION: i64 = 3_155_760_000;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid(message.into())
    }
}

/// One configured database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub dsn: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Token signing secret (required)
    pub jwt_key: String,

    /// Server-side password pepper (required)
    pub password_pepper: String,

    /// Databases by name (required)
    pub databases: BTreeMap<String, DatabaseConfig>,

    /// Access token validity in seconds (default 900)
    #[serde(default = "default_jwt_valid_duration")]
    pub jwt_valid_duration: i64,

    /// Refresh token validity in seconds (default 30 days)
    #[serde(default = "default_refresh_valid_duration")]
    pub refresh_valid_duration: i64,

    /// Database holding principals and library data (default "main")
    #[serde(default = "default_main_database")]
    pub main_database: String,

    /// Persist classified failures (default false)
    #[serde(default)]
    pub log_enable: bool,

    /// Database for persisted failures, required with `log_enable`
    #[serde(default)]
    pub log_database: Option<String>,

    /// "UTC" or a fixed "+HH:MM" / "-HH:MM" offset (default "UTC")
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Seed the default principal at startup (default false)
    #[serde(default)]
    pub initialize_database: bool,

    /// Resolve callers on public endpoints when a token is sent (default true)
    #[serde(default = "default_true")]
    pub authenticate_public_endpoints: bool,

    /// HTTP status for malformed requests, 400 or 500 (default 500)
    #[serde(default = "default_bad_request_status")]
    pub bad_request_status: u16,

    #[serde(default)]
    pub server: HttpServerConfig,
}

fn default_jwt_valid_duration() -> i64 {
    900
}
fn default_refresh_valid_duration() -> i64 {
    2_592_000
}
fn default_main_database() -> String {
    "main".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_true() -> bool {
    true
}
fn default_bad_request_status() -> u16 {
    500
}

impl GatewayConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_key.is_empty() {
            return Err(ConfigError::invalid("jwt_key must not be empty"));
        }
        if self.password_pepper.is_empty() {
            return Err(ConfigError::invalid("password_pepper must not be empty"));
        }
        for (key, value) in [
            ("jwt_valid_duration", self.jwt_valid_duration),
            ("refresh_valid_duration", self.refresh_valid_duration),
        ] {
            if value <= 0 || value > MAX_VALID_DURATION {
                return Err(ConfigError::invalid(format!(
                    "{} must be between 1 and {} seconds",
                    key, MAX_VALID_DURATION
                )));
            }
        }

        for (name, database) in &self.databases {
            if database.dsn.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "database {} has an empty dsn",
                    name
                )));
            }
        }

        if !self.databases.contains_key(&self.main_database) {
            return Err(ConfigError::invalid(format!(
                "main_database {} is not configured",
                self.main_database
            )));
        }

        if self.log_enable {
            let log_database = self.log_database.as_deref().ok_or_else(|| {
                ConfigError::invalid("log_database is required when log_enable is set")
            })?;
            if !self.databases.contains_key(log_database) {
                return Err(ConfigError::invalid(format!(
                    "log_database {} is not configured",
                    log_database
                )));
            }
        }

        if !matches!(self.bad_request_status, 400 | 500) {
            return Err(ConfigError::invalid(format!(
                "bad_request_status must be 400 or 500, got {}",
                self.bad_request_status
            )));
        }

        self.timezone()?;
        Ok(())
    }

    /// Configured timezone as a fixed offset
    pub fn timezone(&self) -> Result<FixedOffset, ConfigError> {
        parse_timezone(&self.timezone)
    }
}

/// Parses "UTC", "Z" or "±HH:MM"
pub fn parse_timezone(value: &str) -> Result<FixedOffset, ConfigError> {
    let invalid = || ConfigError::invalid(format!("invalid timezone '{}'", value));

    if value.eq_ignore_ascii_case("UTC") || value == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
