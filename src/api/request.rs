//! Request envelope parsing
//!
//! Turns one raw HTTP request into a validated `{route, endpoint, params}`
//! envelope. Transport checks come first (method, content type, body),
//! then JSON decoding, then the fixed envelope schema.

use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::schema::{join_violations, validate};

use super::errors::{ApiError, ApiResult};

/// Transport-level view of an inbound request
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    pub method: String,
    pub content_type: Option<String>,
    pub authorization: Option<String>,
    /// Observed client address, as text
    pub client_ip: String,
    pub body: Vec<u8>,
}

impl RawRequest {
    /// A JSON POST carrying `body`, the shape every valid API call has
    pub fn post_json(body: impl Into<Vec<u8>>, client_ip: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            content_type: Some("application/json".to_string()),
            authorization: None,
            client_ip: client_ip.into(),
            body: body.into(),
        }
    }

    /// Adds `Authorization: Bearer <token>`
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.authorization = Some(format!("Bearer {}", token));
        self
    }
}

/// A validated request envelope
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub route: String,
    pub endpoint: String,
    /// `None` when absent from the body
    pub params: Option<Value>,
}

/// Schema every request body must satisfy
pub fn envelope_schema() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        json!({
            "type": "object",
            "properties": {
                "route": {"type": "string", "minLength": 1},
                "endpoint": {"type": "string", "minLength": 1},
                "params": {"type": "object"}
            },
            "required": ["route", "endpoint"]
        })
    })
}

impl RequestEnvelope {
    /// Parses and validates `raw`
    pub fn parse(raw: &RawRequest) -> ApiResult<Self> {
        if !raw.method.eq_ignore_ascii_case("POST") {
            return Err(ApiError::bad_request(
                "Wrong request method",
                "API requests are required to use POST method",
            ));
        }

        if !is_json_media_type(raw.content_type.as_deref()) {
            return Err(ApiError::bad_request(
                "Wrong request content type",
                "API requests are required to use Content-Type: application/json header",
            ));
        }

        if raw.body.iter().all(u8::is_ascii_whitespace) {
            return Err(ApiError::bad_request("Empty request body", "Request is empty"));
        }

        let data: Value = serde_json::from_slice(&raw.body).map_err(|_| {
            ApiError::bad_request("Malformed request JSON", "Request is not a valid JSON")
        })?;

        Self::from_value(data)
    }

    /// Validates an already decoded body against the envelope schema
    pub fn from_value(mut data: Value) -> ApiResult<Self> {
        let violations = validate(&data, envelope_schema());
        if !violations.is_empty() {
            let message = format!("Request validation error. {}", join_violations(&violations));
            return Err(ApiError::bad_request(message.clone(), message));
        }

        // the schema guarantees an object with string route and endpoint
        let text = |v: &Value| v.as_str().unwrap_or_default().to_string();
        Ok(Self {
            route: text(&data["route"]),
            endpoint: text(&data["endpoint"]),
            params: data.as_object_mut().and_then(|o| o.remove("params")),
        })
    }
}

/// Whether the Content-Type header names `application/json`, ignoring
/// parameters such as `charset`
fn is_json_media_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}
