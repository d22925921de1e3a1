//! Built-in routes
//!
//! Each route module exposes a `route` constructor that registers its
//! endpoints together with their params schemas and minimum levels.

pub mod auth;
pub mod library;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{EndpointError, RouteTable};
use crate::auth::{PepperedHasher, PrincipalStore, TokenService};
use crate::storage::Storage;

/// Shared services the built-in routes are constructed with
#[derive(Clone)]
pub struct RouteServices {
    pub tokens: Arc<TokenService>,
    pub hasher: Arc<PepperedHasher>,
    pub principals: Arc<dyn PrincipalStore>,
    /// Backend holding the library tables
    pub main: Arc<dyn Storage>,
}

/// Route table with every built-in route
pub fn default_routes(services: &RouteServices) -> RouteTable {
    let mut routes = RouteTable::new();
    routes.register(auth::route(services));
    routes.register(library::route(services));
    routes.register(test::route());
    routes
}

/// Decodes schema-checked params into a typed struct
pub(crate) fn params<T: DeserializeOwned>(value: Value) -> Result<T, EndpointError> {
    serde_json::from_value(value).map_err(|e| EndpointError::Other(format!("params: {}", e)))
}
