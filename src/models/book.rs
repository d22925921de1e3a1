use serde_json::json;

use crate::storage::{
    int_field, record_id, string_field, Model, Record, RecordId, StorageError, StorageResult,
};

/// A book, linked to its author by identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    pub id: Option<RecordId>,
    pub name: String,
    pub author_id: RecordId,
    pub price: i64,
}

impl Book {
    pub fn new(name: impl Into<String>, author_id: RecordId, price: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            author_id,
            price,
        }
    }
}

impl Model for Book {
    const SOURCE: &'static str = "BOOK";

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        let author_id = record
            .get("author_id")
            .and_then(RecordId::from_value)
            .ok_or_else(|| StorageError::malformed(Self::SOURCE, "missing author_id"))?;

        Ok(Self {
            id: Some(record_id(Self::SOURCE, record)?),
            name: string_field(Self::SOURCE, record, "name")?,
            author_id,
            price: int_field(Self::SOURCE, record, "price")?,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.insert("name".to_string(), json!(self.name));
        record.insert("author_id".to_string(), self.author_id.to_value());
        record.insert("price".to_string(), json!(self.price));
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_mapping() {
        let mut book = Book::new("Mort", RecordId::Int(2), 15);
        book.set_id(RecordId::Int(7));

        let mut record = book.to_record();
        assert!(record.get("_id").is_none());
        record.insert("_id".to_string(), json!(7));

        assert_eq!(Book::from_record(&record).unwrap(), book);
        assert_eq!(
            book.to_output(),
            json!({"_id": 7, "name": "Mort", "author_id": 2, "price": 15})
        );
    }

    #[test]
    fn test_document_author_id() {
        let book = Book::new("Mort", RecordId::Object("65a1f0c2".to_string()), 15);
        assert_eq!(book.to_record()["author_id"], json!("65a1f0c2"));
    }
}
