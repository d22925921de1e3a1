//! Gateway HTTP Route
//!
//! The single API entry point. Requests to `/` with any method are handed to
//! the dispatcher, which rejects non-POST methods inside the JSON envelope.
//! Other paths are not routed.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use tracing::{debug, error};

use crate::api::{
    ApiError, ApiHandler, GatewayResponse, RawRequest, ResponseEnvelope, StatusMapping,
};

/// Create the gateway route
pub fn gateway_routes(handler: Arc<ApiHandler>) -> Router {
    Router::new()
        .route("/", any(gateway_handler))
        .with_state(handler)
}

async fn gateway_handler(
    State(handler): State<Arc<ApiHandler>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let raw = raw_request(&method, &headers, peer, body);
    debug!(method = %raw.method, client_ip = %raw.client_ip, "Gateway request");

    // Storage backends are synchronous
    let response = match tokio::task::spawn_blocking(move || handler.handle(&raw)).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Dispatcher task failed");
            dispatcher_failure()
        }
    };

    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body))
}

/// Transport view of an axum request
pub fn raw_request(
    method: &Method,
    headers: &HeaderMap,
    peer: SocketAddr,
    body: Bytes,
) -> RawRequest {
    let header_text = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    RawRequest {
        method: method.as_str().to_string(),
        content_type: header_text(header::CONTENT_TYPE),
        authorization: header_text(header::AUTHORIZATION),
        client_ip: peer.ip().to_string(),
        body: body.to_vec(),
    }
}

fn dispatcher_failure() -> GatewayResponse {
    let mut envelope = ResponseEnvelope::new();
    envelope.set_error(ApiError::internal("Dispatcher task failed"));
    envelope.finish(&StatusMapping::default())
}
