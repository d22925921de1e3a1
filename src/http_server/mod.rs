//! # Aphreton HTTP Server Module
//!
//! Exposes the dispatcher over HTTP with axum. There is one route, `/`,
//! accepting any method; the dispatcher decides what is acceptable.

pub mod config;
pub mod gateway_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use gateway_routes::{gateway_routes, raw_request};
pub use server::HttpServer;
