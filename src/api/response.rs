//! Response envelope builder
//!
//! One builder per request, created before anything else so that
//! `execution_time` covers the whole dispatch. `finish` consumes the
//! builder: an envelope is serialized exactly once.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ApiError, ErrorKind};

/// Maps error kinds to HTTP status codes.
///
/// This is the only place where a failure class becomes a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMapping {
    /// Status for [`ErrorKind::BadRequest`]
    pub bad_request: u16,
}

impl Default for StatusMapping {
    fn default() -> Self {
        Self { bad_request: 500 }
    }
}

impl StatusMapping {
    pub fn status_for(&self, kind: ErrorKind) -> u16 {
        match kind {
            ErrorKind::Auth => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest => self.bad_request,
            ErrorKind::Internal => 500,
        }
    }
}

/// Wire body. All fields always serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// 1 on success, 0 on failure
    pub status: u8,
    pub route: String,
    pub endpoint: String,
    pub data: Value,
    pub error: String,
    /// Seconds from builder construction to `finish`
    pub execution_time: f64,
}

/// A finished response: HTTP status plus body
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        self.body.status == 1
    }

    /// Body as JSON text
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_else(|_| {
            String::from(r#"{"status":0,"route":"","endpoint":"","data":[],"error":"API Error","execution_time":0}"#)
        })
    }
}

/// Accumulates one response
#[derive(Debug)]
pub struct ResponseEnvelope {
    started: Instant,
    route: String,
    endpoint: String,
    data: Value,
    error: Option<ApiError>,
}

impl Default for ResponseEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEnvelope {
    /// Starts the clock
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            route: String::new(),
            endpoint: String::new(),
            data: empty_data(),
            error: None,
        }
    }

    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = route.into();
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = endpoint.into();
    }

    /// Stores handler output; `null` becomes an empty array
    pub fn set_data(&mut self, data: Value) {
        self.data = if data.is_null() { empty_data() } else { data };
    }

    /// Records the failure and discards any data
    pub fn set_error(&mut self, error: ApiError) {
        self.data = empty_data();
        self.error = Some(error);
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Stops the clock and maps the outcome to a status
    pub fn finish(self, mapping: &StatusMapping) -> GatewayResponse {
        let execution_time = self.started.elapsed().as_secs_f64();
        let (status, body_status, error) = match &self.error {
            None => (200, 1, String::new()),
            Some(err) => (
                mapping.status_for(err.kind()),
                0,
                err.user_message().to_string(),
            ),
        };

        GatewayResponse {
            status,
            body: ResponseBody {
                status: body_status,
                route: self.route,
                endpoint: self.endpoint,
                data: self.data,
                error,
                execution_time,
            },
        }
    }
}

fn empty_data() -> Value {
    Value::Array(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_body() {
        let mut envelope = ResponseEnvelope::new();
        envelope.set_route("test");
        envelope.set_endpoint("default");
        envelope.set_data(json!(["Hello"]));

        let response = envelope.finish(&StatusMapping::default());
        assert_eq!(response.status, 200);
        assert!(response.is_success());
        assert_eq!(response.body.error, "");
        assert_eq!(response.body.data, json!(["Hello"]));
        assert!(response.body.execution_time >= 0.0);
    }

    #[test]
    fn test_null_data_becomes_empty_array() {
        let mut envelope = ResponseEnvelope::new();
        envelope.set_data(Value::Null);
        let response = envelope.finish(&StatusMapping::default());
        assert_eq!(response.body.data, json!([]));
    }

    #[test]
    fn test_error_body_always_has_every_field() {
        let mut envelope = ResponseEnvelope::new();
        envelope.set_error(ApiError::not_found("API route gggggg does not exist"));
        assert!(envelope.has_error());

        let response = envelope.finish(&StatusMapping::default());
        assert_eq!(response.status, 404);

        let wire: Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(wire["status"], 0);
        assert_eq!(wire["route"], "");
        assert_eq!(wire["endpoint"], "");
        assert_eq!(wire["data"], json!([]));
        assert_eq!(wire["error"], "API route gggggg does not exist");
        assert!(wire["execution_time"].is_number());
    }

    #[test]
    fn test_status_mapping() {
        let default = StatusMapping::default();
        assert_eq!(default.status_for(ErrorKind::Auth), 401);
        assert_eq!(default.status_for(ErrorKind::NotFound), 404);
        assert_eq!(default.status_for(ErrorKind::BadRequest), 500);
        assert_eq!(default.status_for(ErrorKind::Internal), 500);

        let strict = StatusMapping { bad_request: 400 };
        assert_eq!(strict.status_for(ErrorKind::BadRequest), 400);
    }
}
