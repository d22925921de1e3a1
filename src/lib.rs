//! aphreton - a single-endpoint JSON API gateway
//!
//! Requests name a `(route, endpoint)` pair and carry JSON params. The
//! dispatcher authenticates the caller with a bearer token, checks the
//! endpoint's access level, validates params against its JSON Schema and
//! wraps the outcome in a uniform response envelope.

pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod http_server;
pub mod models;
pub mod observability;
pub mod routes;
pub mod schema;
pub mod storage;
