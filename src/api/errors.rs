//! API error taxonomy
//!
//! Every classified failure carries two messages: a detailed one for
//! operators and a generic one for the caller. Only the user message ever
//! reaches the wire.

use std::fmt;

use thiserror::Error;

use crate::observability::LogLevel;

/// Result type for dispatch operations
pub type ApiResult<T> = Result<T, ApiError>;

/// User message for failures that must not leak internals
pub const DEFAULT_USER_MESSAGE: &str = "API Error";

/// Failure class, the only input to HTTP status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed envelope or params
    BadRequest,
    /// Missing, invalid or expired token, IP mismatch, insufficient level
    Auth,
    /// Unknown route or endpoint
    NotFound,
    /// Everything else
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Auth => "AUTH_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified API failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{user_message}")]
pub struct ApiError {
    kind: ErrorKind,
    log_message: String,
    user_message: String,
    log_level: LogLevel,
}

impl ApiError {
    pub fn new(
        kind: ErrorKind,
        log_message: impl Into<String>,
        user_message: impl Into<String>,
        log_level: LogLevel,
    ) -> Self {
        Self {
            kind,
            log_message: log_message.into(),
            user_message: user_message.into(),
            log_level,
        }
    }

    /// Bad request whose log and user messages differ
    pub fn bad_request(log_message: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, log_message, user_message, LogLevel::Warning)
    }

    /// Bad request shown to the caller verbatim
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorKind::BadRequest, message.clone(), message, LogLevel::Info)
    }

    /// Authentication or authorization failure
    pub fn auth(log_message: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, log_message, user_message, LogLevel::Error)
    }

    /// Unknown route or endpoint, shown to the caller verbatim
    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorKind::NotFound, message.clone(), message, LogLevel::Warning)
    }

    /// Internal failure with the generic user message
    pub fn internal(log_message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Internal,
            log_message,
            DEFAULT_USER_MESSAGE,
            LogLevel::Error,
        )
    }

    /// Overrides the log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn log_message(&self) -> &str {
        &self.log_message
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}
