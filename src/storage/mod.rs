//! Storage subsystem for aphreton
//!
//! The gateway core depends only on the [`Storage`] contract. Backends are
//! opened from DSNs at startup and collected into a [`StorageRegistry`]
//! that is immutable once the server starts serving.
//!
//! # Families
//!
//! - Relational: integer identifiers assigned in insertion order
//! - Document: 32-character hex object identifiers

mod backend;
mod errors;
mod memory;
mod model;
mod registry;

pub use backend::{
    compare_values, matches_filter, Filter, FindOptions, Record, RecordId, SortOrder, Storage,
    StorageFamily, ID_FIELD,
};
pub use errors::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use model::{
    field_filter, id_filter, int_field, optional_string_field, record_id, string_field, Model,
    Repository,
};
pub use registry::{open_backend, StorageRegistry};
