//! Audit logging of classified failures
//!
//! Every classified failure is reported through `tracing`. When log
//! persistence is enabled, the same operator-facing message is also
//! appended to the configured log database as a `LogEntry`.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{FixedOffset, Utc};

use crate::models::LogEntry;
use crate::storage::{Repository, StorageResult};

/// Severity of an audit record. Codes are what gets persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Persisted numeric code
    pub fn code(self) -> i64 {
        match self {
            LogLevel::Info => 0,
            LogLevel::Warning => 1,
            LogLevel::Error => 2,
        }
    }

    /// Unknown codes read back as `Info`
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => LogLevel::Warning,
            2 => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sink for audit records.
///
/// Called from the dispatcher on every classified failure; implementations
/// must be safe to share across request threads.
pub trait AuditLog: Send + Sync {
    /// Append one record
    fn record(&self, level: LogLevel, message: &str) -> StorageResult<()>;
}

/// Audit log persisted as `LogEntry` records
pub struct StorageAuditLog {
    entries: Repository<LogEntry>,
    offset: FixedOffset,
}

impl StorageAuditLog {
    /// Timestamps are rendered in `offset`
    pub fn new(entries: Repository<LogEntry>, offset: FixedOffset) -> Self {
        Self { entries, offset }
    }
}

impl AuditLog for StorageAuditLog {
    fn record(&self, level: LogLevel, message: &str) -> StorageResult<()> {
        let mut entry = LogEntry::new(level, message, Utc::now(), &self.offset);
        self.entries.save(&mut entry)
    }
}

/// A record captured by [`MemoryAuditLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub level: LogLevel,
    pub message: String,
}

/// In-memory audit log, for tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditLog {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded entries
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether any record message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.records().iter().any(|r| r.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, level: LogLevel, message: &str) -> StorageResult<()> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(AuditRecord {
                level,
                message: message.to_string(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{field_filter, MemoryStorage};

    #[test]
    fn test_level_codes() {
        for level in [LogLevel::Info, LogLevel::Warning, LogLevel::Error] {
            assert_eq!(LogLevel::from_code(level.code()), level);
        }
        assert_eq!(LogLevel::from_code(42), LogLevel::Info);
    }

    #[test]
    fn test_memory_audit_log() {
        let log = MemoryAuditLog::new();
        assert!(log.is_empty());

        log.record(LogLevel::Error, "Authorization error").unwrap();
        assert_eq!(log.len(), 1);
        assert!(log.contains("Authorization"));
        assert_eq!(log.records()[0].level, LogLevel::Error);
    }

    #[test]
    fn test_storage_audit_log_persists_entries() {
        let repository = Repository::<LogEntry>::new(Arc::new(MemoryStorage::document()));
        let log = StorageAuditLog::new(repository.clone(), FixedOffset::east_opt(0).unwrap());

        log.record(LogLevel::Warning, "Wrong request method").unwrap();

        let found = repository
            .find(&field_filter("message", "Wrong request method"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].level, LogLevel::Warning);
        assert_eq!(found[0].timestamp.len(), "YYYY-MM-DD HH:MM:SS".len());
    }
}
