//! CLI-specific error types
//!
//! All CLI errors are fatal: the process exits non-zero.

use std::fmt;
use std::io;

use crate::bootstrap::BootstrapError;
use crate::config::ConfigError;
use crate::observability::TelemetryError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error
    IoError,
    /// Startup failed
    BootFailed,
    /// Server stopped with an error
    ServeFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "APHRETON_CLI_CONFIG_ERROR",
            Self::IoError => "APHRETON_CLI_IO_ERROR",
            Self::BootFailed => "APHRETON_CLI_BOOT_FAILED",
            Self::ServeFailed => "APHRETON_CLI_SERVE_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn serve_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ServeFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<BootstrapError> for CliError {
    fn from(e: BootstrapError) -> Self {
        match e {
            BootstrapError::Config(inner) => inner.into(),
            other => Self::boot_failed(other.to_string()),
        }
    }
}

impl From<TelemetryError> for CliError {
    fn from(e: TelemetryError) -> Self {
        Self::boot_failed(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::config_error("jwt_key must not be empty");
        assert_eq!(
            err.to_string(),
            "APHRETON_CLI_CONFIG_ERROR: jwt_key must not be empty"
        );
    }

    #[test]
    fn test_bootstrap_config_error_keeps_config_code() {
        let err: CliError =
            BootstrapError::Config(ConfigError::Invalid("bad".to_string())).into();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);

        let err: CliError = BootstrapError::LogDatabaseUnavailable("logs".to_string()).into();
        assert_eq!(err.code(), &CliErrorCode::BootFailed);
    }
}
