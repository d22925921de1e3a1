use chrono::{DateTime, FixedOffset, Utc};
use serde_json::json;

use crate::observability::LogLevel;
use crate::storage::{int_field, record_id, string_field, Model, Record, RecordId, StorageResult};

/// Timestamp layout of persisted log entries
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted audit record
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: Option<RecordId>,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: String,
}

impl LogEntry {
    /// Entry stamped with `at` rendered in `offset`
    pub fn new(
        level: LogLevel,
        message: impl Into<String>,
        at: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> Self {
        Self {
            id: None,
            level,
            message: message.into(),
            timestamp: at.with_timezone(offset).format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl Model for LogEntry {
    const SOURCE: &'static str = "aphreton.logs";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: Some(record_id(Self::SOURCE, record)?),
            level: LogLevel::from_code(int_field(Self::SOURCE, record, "level")?),
            message: string_field(Self::SOURCE, record, "message")?,
            timestamp: string_field(Self::SOURCE, record, "timestamp")?,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("level".to_string(), json!(self.level.code()));
        record.insert("message".to_string(), json!(self.message));
        record.insert("timestamp".to_string(), json!(self.timestamp));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_uses_offset() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();

        let entry = LogEntry::new(LogLevel::Error, "boom", at, &offset);
        assert_eq!(entry.timestamp, "2024-03-02 01:30:00");
    }

    #[test]
    fn test_level_is_stored_as_code() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let offset = FixedOffset::east_opt(0).unwrap();
        let entry = LogEntry::new(LogLevel::Warning, "w", at, &offset);
        assert_eq!(entry.to_record()["level"], json!(1));
    }
}
