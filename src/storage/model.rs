//! Explicit model layer over the storage contract
//!
//! Each entity maps itself onto a [`Record`] by hand. Identifiers are kept
//! out of `to_record`; the repository adds and strips `_id`.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use super::backend::{Filter, FindOptions, Record, RecordId, Storage, ID_FIELD};
use super::errors::{StorageError, StorageResult};

/// A persisted entity with a hand-written field mapping
pub trait Model: Sized {
    /// Table or collection holding the entity
    const SOURCE: &'static str;

    /// Identifier, `None` until first saved
    fn id(&self) -> Option<&RecordId>;

    fn set_id(&mut self, id: RecordId);

    /// Builds the entity from a stored record, `_id` included
    fn from_record(record: &Record) -> StorageResult<Self>;

    /// Field values to persist, without `_id`. `None` fields are left out.
    fn to_record(&self) -> Record;

    /// Wire representation: the record plus `_id`
    fn to_output(&self) -> Value {
        let mut record = self.to_record();
        let id = self.id().map(RecordId::to_value).unwrap_or(Value::Null);
        record.insert(ID_FIELD.to_string(), id);
        Value::Object(record)
    }
}

/// Typed access to one model's source on one backend
pub struct Repository<M> {
    storage: Arc<dyn Storage>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            _model: PhantomData,
        }
    }
}

impl<M: Model> Repository<M> {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            _model: PhantomData,
        }
    }

    /// Models matching `filter`. An empty filter is rejected.
    pub fn find(&self, filter: &Filter) -> StorageResult<Vec<M>> {
        self.find_with(filter, &FindOptions::default())
    }

    /// Like [`Repository::find`] with ordering and paging
    pub fn find_with(&self, filter: &Filter, options: &FindOptions) -> StorageResult<Vec<M>> {
        if filter.is_empty() {
            return Err(StorageError::EmptyFilter);
        }
        self.storage
            .find(M::SOURCE, filter, options)?
            .iter()
            .map(M::from_record)
            .collect()
    }

    /// First match, or `None`
    pub fn find_one(&self, filter: &Filter) -> StorageResult<Option<M>> {
        let options = FindOptions::default().limit(1);
        Ok(self.find_with(filter, &options)?.into_iter().next())
    }

    /// Single match; more than one is an error
    pub fn find_one_strict(&self, filter: &Filter) -> StorageResult<Option<M>> {
        let mut found = self.find(filter)?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            _ => Err(StorageError::Ambiguous(M::SOURCE.to_string())),
        }
    }

    /// Updates the stored record when the model has an id, inserts otherwise
    pub fn save(&self, model: &mut M) -> StorageResult<()> {
        let record = model.to_record();
        match model.id() {
            Some(id) => {
                self.storage.update(M::SOURCE, &id_filter(id), &record)?;
            }
            None => {
                let id = self.storage.insert(M::SOURCE, record)?;
                model.set_id(id);
            }
        }
        Ok(())
    }

    /// Updates the stored record only while it still matches `guard`.
    ///
    /// Match and update happen under one backend write, so of two callers
    /// holding the same guard at most one succeeds. Unsaved models are never
    /// written.
    pub fn save_if(&self, model: &M, guard: &Filter) -> StorageResult<bool> {
        let Some(id) = model.id() else {
            return Ok(false);
        };
        let mut filter = guard.clone();
        filter.insert(ID_FIELD.to_string(), id.to_value());
        Ok(self.storage.update(M::SOURCE, &filter, &model.to_record())? > 0)
    }

    /// Removes the stored record. Unsaved models are a no-op.
    pub fn delete(&self, model: &M) -> StorageResult<bool> {
        match model.id() {
            Some(id) => self.storage.delete(M::SOURCE, &id_filter(id)),
            None => Ok(false),
        }
    }
}

/// Filter selecting one record by identifier
pub fn id_filter(id: &RecordId) -> Filter {
    let mut filter = Filter::new();
    filter.insert(ID_FIELD.to_string(), id.to_value());
    filter
}

/// Single-field equality filter
pub fn field_filter(field: &str, value: impl Into<Value>) -> Filter {
    let mut filter = Filter::new();
    filter.insert(field.to_string(), value.into());
    filter
}

/// Reads `_id` from a record
pub fn record_id(source: &str, record: &Record) -> StorageResult<RecordId> {
    record
        .get(ID_FIELD)
        .and_then(RecordId::from_value)
        .ok_or_else(|| StorageError::malformed(source, "missing _id"))
}

/// Reads a required string field
pub fn string_field(source: &str, record: &Record, field: &str) -> StorageResult<String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StorageError::malformed(source, format!("field '{}' is not a string", field)))
}

/// Reads an optional string field; `null` counts as absent
pub fn optional_string_field(
    source: &str,
    record: &Record,
    field: &str,
) -> StorageResult<Option<String>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(StorageError::malformed(
            source,
            format!("field '{}' is not a string", field),
        )),
    }
}

/// Reads a required integer field
pub fn int_field(source: &str, record: &Record, field: &str) -> StorageResult<i64> {
    record
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| StorageError::malformed(source, format!("field '{}' is not an integer", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: Option<RecordId>,
        name: String,
    }

    impl Model for Widget {
        const SOURCE: &'static str = "WIDGET";

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

    fn repository() -> Repository<Widget> {
        Repository::new(Arc::new(MemoryStorage::relational()))
    }

    fn widget(name: &str) -> Widget {
        Widget {
            id: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_save_inserts_then_updates() {
        let repo = repository();
        let mut w = widget("gear");
        repo.save(&mut w).unwrap();
        assert_eq!(w.id, Some(RecordId::Int(1)));

        w.name = "cog".to_string();
        repo.save(&mut w).unwrap();

        let found = repo.find(&field_filter("name", "cog")).unwrap();
        assert_eq!(found, vec![w]);
        assert!(repo.find(&field_filter("name", "gear")).unwrap().is_empty());
    }

    #[test]
    fn test_empty_filter_is_rejected() {
        let repo = repository();
        assert!(matches!(
            repo.find(&Filter::new()),
            Err(StorageError::EmptyFilter)
        ));
    }

    #[test]
    fn test_find_one_strict_rejects_duplicates() {
        let repo = repository();
        repo.save(&mut widget("gear")).unwrap();
        repo.save(&mut widget("gear")).unwrap();

        assert!(repo.find_one(&field_filter("name", "gear")).unwrap().is_some());
        assert!(matches!(
            repo.find_one_strict(&field_filter("name", "gear")),
            Err(StorageError::Ambiguous(_))
        ));
    }

    #[test]
    fn test_delete_by_id() {
        let repo = repository();
        let mut w = widget("gear");
        repo.save(&mut w).unwrap();

        assert!(repo.delete(&w).unwrap());
        assert!(repo.find_one(&id_filter(&RecordId::Int(1))).unwrap().is_none());
        assert!(!repo.delete(&widget("unsaved")).unwrap());
    }

    #[test]
    fn test_save_if_requires_guard_match() {
        let repo = repository();
        let mut w = widget("gear");
        repo.save(&mut w).unwrap();

        let mut renamed = w.clone();
        renamed.name = "cog".to_string();
        assert!(!repo.save_if(&renamed, &field_filter("name", "sprocket")).unwrap());
        assert!(repo.save_if(&renamed, &field_filter("name", "gear")).unwrap());
        assert!(!repo.save_if(&renamed, &field_filter("name", "gear")).unwrap());

        assert!(!repo.save_if(&widget("unsaved"), &field_filter("name", "unsaved")).unwrap());
        let stored = repo.find_one(&id_filter(w.id.as_ref().unwrap())).unwrap().unwrap();
        assert_eq!(stored.name, "cog");
    }

    #[test]
    fn test_to_output_includes_id() {
        let repo = repository();
        let mut w = widget("gear");
        repo.save(&mut w).unwrap();
        assert_eq!(w.to_output(), json!({"_id": 1, "name": "gear"}));
    }

    #[test]
    fn test_malformed_record_is_reported() {
        let mut record = Record::new();
        record.insert("_id".to_string(), json!(1));
        record.insert("name".to_string(), json!(42));
        assert!(matches!(
            Widget::from_record(&record),
            Err(StorageError::MalformedRecord { .. })
        ));
    }
}
