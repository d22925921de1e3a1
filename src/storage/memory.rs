//! In-memory storage backend
//!
//! Serves both families: relational-style tables hand out increasing
//! integer ids, document-style collections hand out hex object ids.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use uuid::Uuid;

use super::backend::{
    compare_values, matches_filter, Filter, FindOptions, Record, RecordId, SortOrder, Storage,
    StorageFamily, ID_FIELD,
};
use super::errors::{StorageError, StorageResult};

/// Process-local backend keeping every source in a map of record vectors
#[derive(Debug)]
pub struct MemoryStorage {
    family: StorageFamily,
    sources: RwLock<HashMap<String, Vec<Record>>>,
    next_id: AtomicI64,
}

impl MemoryStorage {
    /// Creates an empty backend of the given family
    pub fn new(family: StorageFamily) -> Self {
        Self {
            family,
            sources: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Relational-style backend with integer ids
    pub fn relational() -> Self {
        Self::new(StorageFamily::Relational)
    }

    /// Document-style backend with object ids
    pub fn document() -> Self {
        Self::new(StorageFamily::Document)
    }

    fn allocate_id(&self) -> RecordId {
        match self.family {
            StorageFamily::Relational => {
                RecordId::Int(self.next_id.fetch_add(1, Ordering::SeqCst))
            }
            StorageFamily::Document => RecordId::Object(Uuid::new_v4().simple().to_string()),
        }
    }
}

impl Storage for MemoryStorage {
    fn family(&self) -> StorageFamily {
        self.family
    }

    fn find(
        &self,
        source: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StorageResult<Vec<Record>> {
        let sources = self.sources.read().map_err(|_| StorageError::LockPoisoned)?;
        let Some(records) = sources.get(source) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<Record> = records
            .iter()
            .filter(|r| matches_filter(r, filter))
            .cloned()
            .collect();

        if !options.order.is_empty() {
            found.sort_by(|a, b| {
                for (field, order) in &options.order {
                    let left = a.get(field).unwrap_or(&serde_json::Value::Null);
                    let right = b.get(field).unwrap_or(&serde_json::Value::Null);
                    let ord = match order {
                        SortOrder::Ascending => compare_values(left, right),
                        SortOrder::Descending => compare_values(right, left),
                    };
                    if ord != std::cmp::Ordering::Equal {
                        return ord;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        let offset = options.offset.unwrap_or(0);
        let limit = options.limit.unwrap_or(usize::MAX);
        Ok(found.into_iter().skip(offset).take(limit).collect())
    }

    fn insert(&self, source: &str, mut record: Record) -> StorageResult<RecordId> {
        let id = self.allocate_id();
        record.insert(ID_FIELD.to_string(), id.to_value());

        let mut sources = self.sources.write().map_err(|_| StorageError::LockPoisoned)?;
        sources.entry(source.to_string()).or_default().push(record);
        Ok(id)
    }

    fn update(&self, source: &str, filter: &Filter, patch: &Record) -> StorageResult<usize> {
        let mut sources = self.sources.write().map_err(|_| StorageError::LockPoisoned)?;
        let Some(records) = sources.get_mut(source) else {
            return Ok(0);
        };

        let mut affected = 0;
        for record in records.iter_mut().filter(|r| matches_filter(r, filter)) {
            for (field, value) in patch {
                // identifiers are assigned by the backend and never patched
                if field != ID_FIELD {
                    record.insert(field.clone(), value.clone());
                }
            }
            affected += 1;
        }
        Ok(affected)
    }

    fn delete(&self, source: &str, filter: &Filter) -> StorageResult<bool> {
        let mut sources = self.sources.write().map_err(|_| StorageError::LockPoisoned)?;
        let Some(records) = sources.get_mut(source) else {
            return Ok(false);
        };

        let before = records.len();
        records.retain(|r| !matches_filter(r, filter));
        Ok(records.len() != before)
    }

    fn health_check(&self) -> bool {
        self.sources.read().is_ok()
    }
}
