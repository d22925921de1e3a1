//! Storage registry
//!
//! Built once at startup from the configured databases, then shared
//! read-only with every route. There is no process-wide instance; the
//! bootstrap code owns the registry and hands out `Arc` clones.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::backend::{Storage, StorageFamily};
use super::errors::{StorageError, StorageResult};
use super::memory::MemoryStorage;

/// Named storage backends
#[derive(Default, Clone)]
pub struct StorageRegistry {
    backends: HashMap<String, Arc<dyn Storage>>,
}

impl std::fmt::Debug for StorageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("databases", &self.names())
            .finish()
    }
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already constructed backend under `name`
    pub fn register(&mut self, name: impl Into<String>, backend: Arc<dyn Storage>) {
        self.backends.insert(name.into(), backend);
    }

    /// Opens the backend named by `dsn` and registers it under `name`
    pub fn connect(&mut self, name: &str, dsn: &str) -> StorageResult<()> {
        let backend = open_backend(dsn)?;
        info!(database = name, family = %backend.family(), "Storage backend registered");
        self.backends.insert(name.to_string(), backend);
        Ok(())
    }

    /// Backend registered under `name`
    pub fn get(&self, name: &str) -> StorageResult<Arc<dyn Storage>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDatabase(name.to_string()))
    }

    /// Health of the backend registered under `name`
    pub fn health_check(&self, name: &str) -> StorageResult<bool> {
        let healthy = self.get(name)?.health_check();
        debug!(database = name, healthy, "Storage health check");
        Ok(healthy)
    }

    /// Registered database names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Opens a backend from its DSN.
///
/// The scheme before the first `:` selects the family. `memory:` and
/// `memory:relational` give a relational in-memory backend, `memory:document`
/// a document one. Networked engines are recognised but not built in.
pub fn open_backend(dsn: &str) -> StorageResult<Arc<dyn Storage>> {
    let (scheme, rest) = dsn
        .split_once(':')
        .ok_or_else(|| StorageError::InvalidDsn(dsn.to_string()))?;

    match scheme.to_ascii_lowercase().as_str() {
        "memory" => match rest.trim_start_matches('/') {
            "" | "relational" => Ok(Arc::new(MemoryStorage::relational())),
            "document" => Ok(Arc::new(MemoryStorage::document())),
            _ => Err(StorageError::InvalidDsn(dsn.to_string())),
        },
        "sqlite" | "mysql" | "pgsql" => Err(StorageError::UnsupportedEngine {
            scheme: scheme.to_string(),
            family: StorageFamily::Relational,
        }),
        "mongodb" | "mongodb+srv" => Err(StorageError::UnsupportedEngine {
            scheme: scheme.to_string(),
            family: StorageFamily::Document,
        }),
        _ => Err(StorageError::InvalidDsn(dsn.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_dsn_families() {
        assert_eq!(
            open_backend("memory:").unwrap().family(),
            StorageFamily::Relational
        );
        assert_eq!(
            open_backend("memory:relational").unwrap().family(),
            StorageFamily::Relational
        );
        assert_eq!(
            open_backend("memory:document").unwrap().family(),
            StorageFamily::Document
        );
    }

    #[test]
    fn test_networked_engines_are_unavailable() {
        assert!(matches!(
            open_backend("mysql:host=localhost;dbname=aphreton"),
            Err(StorageError::UnsupportedEngine {
                family: StorageFamily::Relational,
                ..
            })
        ));
        assert!(matches!(
            open_backend("mongodb://localhost:27017"),
            Err(StorageError::UnsupportedEngine {
                family: StorageFamily::Document,
                ..
            })
        ));
    }

    #[test]
    fn test_dsn_without_scheme_is_invalid() {
        assert!(matches!(
            open_backend("localhost"),
            Err(StorageError::InvalidDsn(_))
        ));
        assert!(matches!(
            open_backend("memory:cluster"),
            Err(StorageError::InvalidDsn(_))
        ));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = StorageRegistry::new();
        registry.connect("main", "memory:").unwrap();

        assert!(registry.get("main").is_ok());
        assert!(registry.health_check("main").unwrap());
        assert!(matches!(
            registry.get("logs"),
            Err(StorageError::UnknownDatabase(name)) if name == "logs"
        ));
        assert_eq!(registry.names(), vec!["main".to_string()]);
    }
}
