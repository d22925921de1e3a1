//! # JWT Token Management
//!
//! HS256 token generation and validation for access and refresh tokens.
//!
//! Both kinds share one secret. Access tokens are bound to the issuing
//! client IP; refresh tokens are not, since they are redeemed from
//! whatever network the client is on at the time.
//!
//! `exp` is a float unix timestamp and is checked here rather than by
//! `jsonwebtoken`, which only understands integer expiry.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};

/// Claims carried by access tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub login: String,

    /// Client IP the token was issued to
    pub ip: String,

    /// Expiration, unix seconds with sub-second precision
    pub exp: f64,
}

/// Claims carried by refresh tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub login: String,

    pub exp: f64,

    /// Distinguishes tokens issued to the same login within one tick
    pub jti: String,
}

/// Current time as a float unix timestamp
pub fn now_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Signs any serializable payload with HS256
pub fn encode_token<T: Serialize>(payload: &T, secret: &str) -> AuthResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        payload,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::TokenGenerationFailed(e.to_string()))
}

/// Verifies an HS256 token and decodes its payload.
///
/// Fails with [`AuthError::TokenExpired`] when `exp <= now`, and with
/// [`AuthError::TokenInvalid`] for anything else: bad structure, bad
/// signature, another algorithm, missing or non-numeric `exp`, or claims
/// that do not fit `T`.
pub fn decode_token<T: DeserializeOwned>(token: &str, secret: &str) -> AuthResult<T> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<Value>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| AuthError::TokenInvalid(format!("{:?}", e.kind())))?;

    let exp = data
        .claims
        .get("exp")
        .and_then(Value::as_f64)
        .ok_or_else(|| AuthError::TokenInvalid("Missing or non-numeric exp claim".to_string()))?;
    if exp <= now_timestamp() {
        return Err(AuthError::TokenExpired);
    }

    serde_json::from_value(data.claims)
        .map_err(|e| AuthError::TokenInvalid(format!("Unexpected token payload: {}", e)))
}

/// Token service configuration
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC signing secret
    pub secret: String,

    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Lifetimes beyond what `Duration` can hold saturate to `Duration::MAX`
    pub fn new(secret: impl Into<String>, access_secs: i64, refresh_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: ttl_from_secs(access_secs),
            refresh_ttl: ttl_from_secs(refresh_secs),
        }
    }
}

fn ttl_from_secs(secs: i64) -> Duration {
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}

/// A freshly signed token and its expiry
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires: f64,
}

/// Issues and verifies access and refresh tokens
#[derive(Debug, Clone)]
pub struct TokenService {
    config: TokenConfig,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Issue an access token bound to `ip`
    pub fn issue_access(&self, login: &str, ip: &str) -> AuthResult<IssuedToken> {
        let claims = AccessClaims {
            login: login.to_string(),
            ip: ip.to_string(),
            exp: expiry(self.config.access_ttl),
        };
        Ok(IssuedToken {
            token: encode_token(&claims, &self.config.secret)?,
            expires: claims.exp,
        })
    }

    /// Issue a refresh token, not bound to any IP
    pub fn issue_refresh(&self, login: &str) -> AuthResult<IssuedToken> {
        let claims = RefreshClaims {
            login: login.to_string(),
            exp: expiry(self.config.refresh_ttl),
            jti: Uuid::new_v4().simple().to_string(),
        };
        Ok(IssuedToken {
            token: encode_token(&claims, &self.config.secret)?,
            expires: claims.exp,
        })
    }

    /// Verify an access token. The caller re-checks `ip` against the client.
    pub fn verify_access(&self, token: &str) -> AuthResult<AccessClaims> {
        decode_token(token, &self.config.secret)
    }

    /// Verify a refresh token
    pub fn verify_refresh(&self, token: &str) -> AuthResult<RefreshClaims> {
        decode_token(token, &self.config.secret)
    }

    pub fn access_ttl(&self) -> Duration {
        self.config.access_ttl
    }
}

fn expiry(ttl: Duration) -> f64 {
    now_timestamp() + ttl.num_milliseconds() as f64 / 1000.0
}
