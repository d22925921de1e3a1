//! API Layer for aphreton
//!
//! A single entry point: every call is a JSON envelope naming a route and
//! an endpoint. The handler authenticates the caller, enforces the
//! endpoint's access policy, validates params and wraps the outcome in a
//! uniform response envelope.
//!
//! # Request handling flow
//!
//! - Envelope parse and schema check
//! - Route and endpoint resolution
//! - Bearer token authentication and access level check
//! - Params schema check
//! - Endpoint invocation
//! - Status mapping and serialization

mod errors;
mod handler;
mod policy;
mod request;
mod response;
mod route;

pub use errors::{ApiError, ApiResult, ErrorKind, DEFAULT_USER_MESSAGE};
pub use handler::{extract_bearer, ApiHandler, DispatchPolicy};
pub use policy::AccessPolicy;
pub use request::{envelope_schema, RawRequest, RequestEnvelope};
pub use response::{GatewayResponse, ResponseBody, ResponseEnvelope, StatusMapping};
pub use route::{
    Endpoint, EndpointContext, EndpointError, EndpointFn, EndpointRegistration, EndpointResult,
    Route, RouteTable,
};
