use serde_json::json;

use crate::storage::{record_id, string_field, Model, Record, RecordId, StorageResult};

/// A book author
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub id: Option<RecordId>,
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Model for Author {
    const SOURCE: &'static str = "AUTHOR";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: Some(record_id(Self::SOURCE, record)?),
            name: string_field(Self::SOURCE, record, "name")?,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("name".to_string(), json!(self.name));
        record
    }
}
