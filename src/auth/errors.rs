//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // ==================
    // Token Errors
    // ==================

    /// Token `exp` is not in the future
    #[error("Token expired")]
    TokenExpired,

    /// Malformed token, bad signature, wrong algorithm or unexpected claims
    #[error("{0}")]
    TokenInvalid(String),

    // ==================
    // Internal Errors
    // ==================

    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed: {0}")]
    TokenGenerationFailed(String),

    /// Principal store operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Whether the failure was caused by the presented token
    pub fn is_token_error(&self) -> bool {
        matches!(self, AuthError::TokenExpired | AuthError::TokenInvalid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_errors_are_distinct() {
        assert!(AuthError::TokenExpired.is_token_error());
        assert!(AuthError::TokenInvalid("InvalidSignature".into()).is_token_error());
        assert!(!AuthError::HashingFailed.is_token_error());
    }

    #[test]
    fn test_invalid_token_carries_detail() {
        let err = AuthError::TokenInvalid("InvalidSignature".to_string());
        assert_eq!(err.to_string(), "InvalidSignature");
    }
}
