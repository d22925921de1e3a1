//! Startup wiring
//!
//! Builds every long-lived component from configuration in one pass:
//! storage registry, token service, password hasher, principal store,
//! route table and audit sink. The resulting [`ApiHandler`] is immutable.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiHandler, DispatchPolicy, StatusMapping};
use crate::auth::{
    AuthError, PepperedHasher, Principal, PrincipalStore, StoragePrincipalStore, TokenConfig,
    TokenService,
};
use crate::config::{ConfigError, GatewayConfig};
use crate::models::LogEntry;
use crate::observability::{AuditLog, StorageAuditLog};
use crate::routes::{default_routes, RouteServices};
use crate::storage::{Repository, StorageError, StorageRegistry};

/// Login of the principal seeded by `initialize_database`
pub const DEFAULT_LOGIN: &str = "test";
/// Password of the seeded principal
pub const DEFAULT_PASSWORD: &str = "qwerty";
/// Access level of the seeded principal
pub const DEFAULT_LEVEL: i64 = 1;

/// Fatal startup errors
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Log database error: {0} is not available")]
    LogDatabaseUnavailable(String),

    #[error("Database initialization failed: {0}")]
    Seed(#[from] AuthError),
}

/// Opens every configured database
pub fn build_registry(config: &GatewayConfig) -> Result<StorageRegistry, BootstrapError> {
    let mut registry = StorageRegistry::new();
    for (name, database) in &config.databases {
        registry.connect(name, &database.dsn)?;
    }
    Ok(registry)
}

/// Builds the dispatcher from configuration
pub fn build_gateway(config: &GatewayConfig) -> Result<ApiHandler, BootstrapError> {
    let registry = build_registry(config)?;
    build_gateway_with_registry(config, &registry)
}

/// Builds the dispatcher over an already populated registry
pub fn build_gateway_with_registry(
    config: &GatewayConfig,
    registry: &StorageRegistry,
) -> Result<ApiHandler, BootstrapError> {
    config.validate()?;

    let audit = if config.log_enable {
        Some(build_audit_log(config, registry)?)
    } else {
        None
    };

    let main = registry.get(&config.main_database)?;
    let tokens = Arc::new(TokenService::new(TokenConfig::new(
        config.jwt_key.clone(),
        config.jwt_valid_duration,
        config.refresh_valid_duration,
    )));
    let hasher = Arc::new(PepperedHasher::new(config.password_pepper.as_bytes()));
    let principals: Arc<dyn PrincipalStore> =
        Arc::new(StoragePrincipalStore::new(Repository::new(main.clone())));

    if config.initialize_database {
        seed_default_principal(principals.as_ref(), &hasher)?;
    }

    let services = RouteServices {
        tokens: Arc::clone(&tokens),
        hasher,
        principals: Arc::clone(&principals),
        main,
    };
    let routes = default_routes(&services);
    info!(routes = ?routes.names(), "Routes registered");

    let mut handler = ApiHandler::new(routes, tokens, principals)
        .with_policy(DispatchPolicy {
            authenticate_public_endpoints: config.authenticate_public_endpoints,
        })
        .with_status_mapping(StatusMapping {
            bad_request: config.bad_request_status,
        });
    if let Some(audit) = audit {
        handler = handler.with_audit(audit);
    }
    Ok(handler)
}

/// Audit sink on the configured log database; the database must be healthy
fn build_audit_log(
    config: &GatewayConfig,
    registry: &StorageRegistry,
) -> Result<Arc<dyn AuditLog>, BootstrapError> {
    let name = config.log_database.as_deref().ok_or_else(|| {
        ConfigError::Invalid("log_database is required when log_enable is set".to_string())
    })?;

    if !registry.health_check(name)? {
        return Err(BootstrapError::LogDatabaseUnavailable(name.to_string()));
    }

    let entries = Repository::<LogEntry>::new(registry.get(name)?);
    Ok(Arc::new(StorageAuditLog::new(entries, config.timezone()?)))
}

/// Creates the default principal unless one with that login exists
pub fn seed_default_principal(
    principals: &dyn PrincipalStore,
    hasher: &PepperedHasher,
) -> Result<(), BootstrapError> {
    if principals.find_by_login(DEFAULT_LOGIN)?.is_some() {
        warn!(login = DEFAULT_LOGIN, "Default principal already exists, not seeding");
        return Ok(());
    }

    let mut principal = Principal::new(
        DEFAULT_LOGIN,
        hasher.hash(DEFAULT_PASSWORD)?,
        DEFAULT_LEVEL,
    );
    principals.save(&mut principal)?;
    info!(login = DEFAULT_LOGIN, level = DEFAULT_LEVEL, "Default principal seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage, StorageFamily};

    fn config(extra: &str) -> GatewayConfig {
        GatewayConfig::from_json(&format!(
            r#"{{
                "jwt_key": "secret",
                "password_pepper": "pepper",
                "databases": {{
                    "main": {{"dsn": "memory:"}},
                    "logs": {{"dsn": "memory:document"}}
                }}
                {}
            }}"#,
            extra
        ))
        .unwrap()
    }

    #[test]
    fn test_registry_from_config() {
        let registry = build_registry(&config("")).unwrap();
        assert_eq!(registry.names(), vec!["logs".to_string(), "main".to_string()]);
        assert_eq!(
            registry.get("logs").unwrap().family(),
            StorageFamily::Document
        );
    }

    #[test]
    fn test_gateway_has_builtin_routes() {
        let handler = build_gateway(&config("")).unwrap();
        assert_eq!(handler.routes().names(), vec!["auth", "library", "test"]);
    }

    #[test]
    fn test_unavailable_engine_is_fatal() {
        let mut config = config("");
        config.databases.get_mut("main").unwrap().dsn = "mysql:host=localhost".to_string();
        assert!(matches!(
            build_gateway(&config),
            Err(BootstrapError::Storage(StorageError::UnsupportedEngine { .. }))
        ));
    }

    #[test]
    fn test_unhealthy_log_database_is_fatal() {
        struct Down;
        impl Storage for Down {
            fn family(&self) -> StorageFamily {
                StorageFamily::Document
            }
            fn find(
                &self,
                _: &str,
                _: &crate::storage::Filter,
                _: &crate::storage::FindOptions,
            ) -> crate::storage::StorageResult<Vec<crate::storage::Record>> {
                Ok(Vec::new())
            }
            fn insert(
                &self,
                _: &str,
                _: crate::storage::Record,
            ) -> crate::storage::StorageResult<crate::storage::RecordId> {
                Err(StorageError::LockPoisoned)
            }
            fn update(
                &self,
                _: &str,
                _: &crate::storage::Filter,
                _: &crate::storage::Record,
            ) -> crate::storage::StorageResult<usize> {
                Ok(0)
            }
            fn delete(
                &self,
                _: &str,
                _: &crate::storage::Filter,
            ) -> crate::storage::StorageResult<bool> {
                Ok(false)
            }
            fn health_check(&self) -> bool {
                false
            }
        }

        let config = config(r#", "log_enable": true, "log_database": "logs""#);
        let mut registry = StorageRegistry::new();
        registry.register("main", Arc::new(MemoryStorage::relational()));
        registry.register("logs", Arc::new(Down));

        assert!(matches!(
            build_gateway_with_registry(&config, &registry),
            Err(BootstrapError::LogDatabaseUnavailable(name)) if name == "logs"
        ));
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let store = StoragePrincipalStore::new(Repository::new(Arc::new(
            MemoryStorage::relational(),
        )));
        let hasher = PepperedHasher::new("pepper");

        seed_default_principal(&store, &hasher).unwrap();
        seed_default_principal(&store, &hasher).unwrap();

        let principal = store.find_by_login(DEFAULT_LOGIN).unwrap().unwrap();
        assert_eq!(principal.access_level, DEFAULT_LEVEL);
        assert!(hasher.verify(DEFAULT_PASSWORD, &principal.password_hash).unwrap());
    }
}
