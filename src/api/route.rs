//! Route registration table
//!
//! Routes are plain values: a name, a set of endpoint closures and the
//! access policy for those endpoints. They are assembled at startup and
//! moved into a [`RouteTable`], which the dispatcher owns read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::auth::{AuthError, Principal};
use crate::storage::StorageError;

use super::errors::ApiError;
use super::policy::AccessPolicy;

/// Per-call context handed to endpoint handlers
#[derive(Debug, Clone, Copy)]
pub struct EndpointContext<'a> {
    pub route: &'a str,
    pub endpoint: &'a str,
    /// Authenticated caller, if any
    pub principal: Option<&'a Principal>,
    pub client_ip: &'a str,
}

/// Errors returned by endpoint handlers.
///
/// `Api` errors are already classified and reach the caller as they are.
/// Everything else is reported as a generic internal error.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Other(String),
}

/// Result of one endpoint call
pub type EndpointResult = Result<Value, EndpointError>;

/// A registered endpoint handler
pub type EndpointFn = Arc<dyn Fn(&EndpointContext<'_>, Value) -> EndpointResult + Send + Sync>;

/// One named endpoint
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    handler: EndpointFn,
}

impl Endpoint {
    /// Name as registered
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, ctx: &EndpointContext<'_>, params: Value) -> EndpointResult {
        (self.handler)(ctx, params)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("name", &self.name).finish()
    }
}

/// A named group of endpoints with their access policy
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    endpoints: HashMap<String, Endpoint>,
    policy: AccessPolicy,
}

impl Route {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoints: HashMap::new(),
            policy: AccessPolicy::new(),
        }
    }

    /// Registers `handler` under `name`. Chain `schema` and `min_level`
    /// on the returned registration to fill in the access policy.
    pub fn endpoint<F>(&mut self, name: &str, handler: F) -> EndpointRegistration<'_>
    where
        F: Fn(&EndpointContext<'_>, Value) -> EndpointResult + Send + Sync + 'static,
    {
        self.endpoints.insert(
            name.to_ascii_lowercase(),
            Endpoint {
                name: name.to_string(),
                handler: Arc::new(handler),
            },
        );
        EndpointRegistration {
            route: self,
            endpoint: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Endpoint by name, ignoring ASCII case
    pub fn resolve(&self, endpoint: &str) -> Option<&Endpoint> {
        self.endpoints.get(&endpoint.to_ascii_lowercase())
    }

    /// Registered endpoint names, sorted
    pub fn endpoint_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.values().map(Endpoint::name).collect();
        names.sort_unstable();
        names
    }
}

/// Access policy setters for a freshly registered endpoint
pub struct EndpointRegistration<'r> {
    route: &'r mut Route,
    endpoint: String,
}

impl EndpointRegistration<'_> {
    /// Params schema checked before the handler runs
    pub fn schema(self, schema: Value) -> Self {
        self.route.policy.register(&self.endpoint, schema);
        self
    }

    /// Minimum access level; 0 (public) when never called
    pub fn min_level(self, level: i64) -> Self {
        self.route.policy.set_min_level(&self.endpoint, level);
        self
    }
}

/// All routes known to the dispatcher
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `route`, replacing any route with the same name
    pub fn register(&mut self, route: Route) {
        self.routes.insert(route.name.to_ascii_lowercase(), route);
    }

    /// Route by name, ignoring ASCII case
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.get(&name.to_ascii_lowercase())
    }

    /// Registered route names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.values().map(Route::name).collect();
        names.sort_unstable();
        names
    }
}
