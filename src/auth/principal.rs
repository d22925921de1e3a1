//! # Principals
//!
//! Authenticated accounts. The dispatcher only reads `login`,
//! `access_level` and `refresh_token`; the auth route maintains the rest.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::storage::{
    field_filter, int_field, optional_string_field, record_id, string_field, Model, Record,
    RecordId, Repository, StorageResult,
};

/// An account that can authenticate against the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: Option<RecordId>,

    pub login: String,

    /// Peppered Argon2id PHC string
    pub password_hash: String,

    pub access_level: i64,

    /// SHA-256 digest of the single active refresh token
    pub refresh_token: Option<String>,

    /// Last successful login, RFC 3339
    pub last_login: Option<String>,
}

impl Principal {
    pub fn new(login: impl Into<String>, password_hash: impl Into<String>, level: i64) -> Self {
        Self {
            id: None,
            login: login.into(),
            password_hash: password_hash.into(),
            access_level: level,
            refresh_token: None,
            last_login: None,
        }
    }

    /// Stamp a successful login
    pub fn touch_login(&mut self, at: DateTime<Utc>) {
        self.last_login = Some(at.to_rfc3339());
    }

    /// Public view, without secrets
    pub fn to_public(&self) -> Value {
        json!({
            "login": self.login,
            "level": self.access_level,
            "last_login": self.last_login,
        })
    }
}

impl Model for Principal {
    const SOURCE: &'static str = "USER";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: Some(record_id(Self::SOURCE, record)?),
            login: string_field(Self::SOURCE, record, "login")?,
            password_hash: string_field(Self::SOURCE, record, "password")?,
            access_level: int_field(Self::SOURCE, record, "level")?,
            refresh_token: optional_string_field(Self::SOURCE, record, "refresh_token")?,
            last_login: optional_string_field(Self::SOURCE, record, "last_login")?,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("login".to_string(), json!(self.login));
        record.insert("password".to_string(), json!(self.password_hash));
        record.insert("level".to_string(), json!(self.access_level));
        // null clears a previously stored token on update
        record.insert("refresh_token".to_string(), json!(self.refresh_token));
        if let Some(last_login) = &self.last_login {
            record.insert("last_login".to_string(), json!(last_login));
        }
        record
    }
}

/// Principal persistence consumed by the dispatcher and the auth route
pub trait PrincipalStore: Send + Sync {
    /// Principal with this exact login, if any. Duplicate logins are an error.
    fn find_by_login(&self, login: &str) -> StorageResult<Option<Principal>>;

    /// Insert or update
    fn save(&self, principal: &mut Principal) -> StorageResult<()>;

    /// Stores `principal` only if its stored refresh token digest is still
    /// `current`. `false` means another rotation won.
    fn replace_refresh_token(&self, principal: &Principal, current: &str) -> StorageResult<bool>;
}

/// [`PrincipalStore`] over a storage backend
pub struct StoragePrincipalStore {
    repository: Repository<Principal>,
}

impl StoragePrincipalStore {
    pub fn new(repository: Repository<Principal>) -> Self {
        Self { repository }
    }
}

impl PrincipalStore for StoragePrincipalStore {
    fn find_by_login(&self, login: &str) -> StorageResult<Option<Principal>> {
        self.repository.find_one_strict(&field_filter("login", login))
    }

    fn save(&self, principal: &mut Principal) -> StorageResult<()> {
        self.repository.save(principal)
    }

    fn replace_refresh_token(&self, principal: &Principal, current: &str) -> StorageResult<bool> {
        self.repository.save_if(principal, &field_filter("refresh_token", current))
    }
}
