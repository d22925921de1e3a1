//! Storage collaborator contract
//!
//! Records are flat JSON objects keyed by field name. Every record carries
//! its identifier under [`ID_FIELD`]. Filters are records too: a scalar
//! filter value means equality, an array filter value means membership.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::StorageResult;

/// Field holding the record identifier
pub const ID_FIELD: &str = "_id";

/// A stored record
pub type Record = Map<String, Value>;

/// Equality / membership filter
pub type Filter = Map<String, Value>;

/// Record identifier: integer for relational backends, hex object id for
/// document backends
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Object(String),
}

impl RecordId {
    /// Reads an identifier out of a JSON value
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) => Some(RecordId::Object(s.clone())),
            _ => None,
        }
    }

    /// JSON representation stored under `_id`
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(id) => Value::from(*id),
            RecordId::Object(id) => Value::String(id.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Object(id) => write!(f, "{}", id),
        }
    }
}

/// Backend family, selected by DSN prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFamily {
    Relational,
    Document,
}

impl fmt::Display for StorageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageFamily::Relational => write!(f, "relational"),
            StorageFamily::Document => write!(f, "document"),
        }
    }
}

/// Sort direction for [`FindOptions::order`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Ordering and paging for `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub order: Vec<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FindOptions {
    /// Orders by one field
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((field.into(), order));
        self
    }

    /// Caps the number of returned records
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips leading records
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Storage backend contract consumed by models and routes.
///
/// Implementations must be safe for concurrent use once registered; the
/// registry hands out shared references only.
pub trait Storage: Send + Sync {
    /// Backend family
    fn family(&self) -> StorageFamily;

    /// Returns records in `source` matching `filter`
    fn find(&self, source: &str, filter: &Filter, options: &FindOptions)
        -> StorageResult<Vec<Record>>;

    /// Stores a new record and returns its assigned identifier
    fn insert(&self, source: &str, record: Record) -> StorageResult<RecordId>;

    /// Merges `patch` into every matching record, returns the affected count
    fn update(&self, source: &str, filter: &Filter, patch: &Record) -> StorageResult<usize>;

    /// Removes every matching record, returns whether anything was removed
    fn delete(&self, source: &str, filter: &Filter) -> StorageResult<bool>;

    /// Whether the backend is reachable
    fn health_check(&self) -> bool;
}

/// Whether `record` satisfies every condition in `filter`
pub fn matches_filter(record: &Record, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| {
        let actual = record.get(field).unwrap_or(&Value::Null);
        match expected {
            Value::Array(candidates) => candidates.iter().any(|c| values_equal(actual, c)),
            other => values_equal(actual, other),
        }
    })
}

/// JSON equality that treats `1` and `1.0` as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Total order over JSON values used for sorting.
///
/// Values of different kinds order as null < bool < number < string < other.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
