//! API Handler for aphreton
//!
//! Runs the dispatch pipeline for one request and turns its outcome into
//! a response envelope. The handler is built once at startup and shared
//! read-only between request threads.
//!
//! Pipeline, terminal on the first failure:
//! 1. Resolve route
//! 2. Resolve endpoint
//! 3. Authenticate
//! 4. Authorize
//! 5. Validate params
//! 6. Invoke the endpoint
//! 7. Store its result as response data

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthError, Principal, PrincipalStore, TokenService};
use crate::observability::{AuditLog, LogLevel};
use crate::schema::{join_violations, validate};

use super::errors::{ApiError, ApiResult};
use super::request::{RawRequest, RequestEnvelope};
use super::response::{GatewayResponse, ResponseEnvelope, StatusMapping};
use super::route::{EndpointContext, EndpointError, RouteTable};

/// Dispatcher behaviour switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPolicy {
    /// Resolve the caller on public endpoints when a token is supplied.
    /// Failures there are logged and the call proceeds anonymously.
    pub authenticate_public_endpoints: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            authenticate_public_endpoints: true,
        }
    }
}

/// The gateway dispatcher
pub struct ApiHandler {
    routes: RouteTable,
    tokens: Arc<TokenService>,
    principals: Arc<dyn PrincipalStore>,
    audit: Option<Arc<dyn AuditLog>>,
    policy: DispatchPolicy,
    status_mapping: StatusMapping,
}

impl ApiHandler {
    /// Create a handler over a finished route table
    pub fn new(
        routes: RouteTable,
        tokens: Arc<TokenService>,
        principals: Arc<dyn PrincipalStore>,
    ) -> Self {
        Self {
            routes,
            tokens,
            principals,
            audit: None,
            policy: DispatchPolicy::default(),
            status_mapping: StatusMapping::default(),
        }
    }

    /// Also persist classified failures to `audit`
    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn with_policy(mut self, policy: DispatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_status_mapping(mut self, status_mapping: StatusMapping) -> Self {
        self.status_mapping = status_mapping;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Handle one raw request. Always yields exactly one response.
    pub fn handle(&self, raw: &RawRequest) -> GatewayResponse {
        let mut response = ResponseEnvelope::new();

        match RequestEnvelope::parse(raw) {
            Ok(envelope) => {
                response.set_route(envelope.route.as_str());
                response.set_endpoint(envelope.endpoint.as_str());

                match self.dispatch(&envelope, raw.authorization.as_deref(), &raw.client_ip) {
                    Ok(data) => response.set_data(data),
                    Err(err) => {
                        self.report(&err, &envelope.route, &envelope.endpoint);
                        response.set_error(err);
                    }
                }
            }
            Err(err) => {
                self.report(&err, "", "");
                response.set_error(err);
            }
        }

        response.finish(&self.status_mapping)
    }

    /// Run the pipeline for a parsed envelope
    pub fn dispatch(
        &self,
        envelope: &RequestEnvelope,
        authorization: Option<&str>,
        client_ip: &str,
    ) -> ApiResult<Value> {
        let route_name = envelope.route.as_str();
        let endpoint_name = envelope.endpoint.as_str();

        // 1. Route
        let route = self.routes.get(route_name).ok_or_else(|| {
            ApiError::not_found(format!("API route {} does not exist", route_name))
        })?;

        // 2. Endpoint
        let endpoint = route.resolve(endpoint_name).ok_or_else(|| {
            ApiError::not_found(format!(
                "API route {} endpoint {} does not exist",
                route_name, endpoint_name
            ))
        })?;

        let policy = route.policy();
        let min_level = policy.min_level(endpoint_name);

        // 3. Authenticate
        let token = authorization.and_then(extract_bearer);
        let principal = self.authenticate(token, client_ip, min_level)?;

        // 4. Authorize
        if min_level > 0 {
            let level = principal.as_ref().map_or(0, |p| p.access_level);
            if level < min_level {
                return Err(ApiError::auth(
                    format!(
                        "User authorization error for endpoint {}.{} (level required: {}, user level: {})",
                        route_name, endpoint_name, min_level, level
                    ),
                    "Authorization error",
                )
                .with_level(LogLevel::Warning));
            }
        }

        // 5. Params
        let params = envelope.params.clone().unwrap_or(Value::Null);
        if let Some(schema) = policy.schema(endpoint_name) {
            let violations = validate(&params, schema);
            if !violations.is_empty() {
                let message = format!(
                    "Endpoint data validation error. {}",
                    join_violations(&violations)
                );
                return Err(ApiError::bad_request(message.clone(), message));
            }
        }

        // 6. Invoke
        let ctx = EndpointContext {
            route: route.name(),
            endpoint: endpoint.name(),
            principal: principal.as_ref(),
            client_ip,
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| endpoint.call(&ctx, params)));

        let unclassified = |detail: String| {
            ApiError::internal(format!(
                "API route {} endpoint {} error: {}",
                route_name, endpoint_name, detail
            ))
        };

        // 7. Result
        match outcome {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(EndpointError::Api(err))) => Err(err),
            Ok(Err(other)) => Err(unclassified(other.to_string())),
            Err(payload) => Err(unclassified(panic_message(payload.as_ref()))),
        }
    }

    /// Resolve the caller.
    ///
    /// A token is mandatory when `min_level > 0`. Public endpoints resolve
    /// the caller only when the policy asks for it, and never fail on it.
    fn authenticate(
        &self,
        token: Option<&str>,
        client_ip: &str,
        min_level: i64,
    ) -> ApiResult<Option<Principal>> {
        if min_level > 0 {
            let token = token.ok_or_else(|| {
                ApiError::auth(
                    "Endpoint access attempt without authentication token",
                    "No authentication token provided",
                )
                .with_level(LogLevel::Warning)
            })?;
            return self.load_principal(token, client_ip).map(Some);
        }

        let Some(token) = token else {
            return Ok(None);
        };
        if !self.policy.authenticate_public_endpoints {
            return Ok(None);
        }

        match self.load_principal(token, client_ip) {
            Ok(principal) => Ok(Some(principal)),
            Err(err) => {
                info!(
                    kind = %err.kind(),
                    "Continuing anonymously on public endpoint: {}",
                    err.log_message()
                );
                Ok(None)
            }
        }
    }

    /// Verify an access token, re-check its IP and load the principal
    fn load_principal(&self, token: &str, client_ip: &str) -> ApiResult<Principal> {
        let claims = self.tokens.verify_access(token).map_err(token_error)?;

        if !claims.ip.eq_ignore_ascii_case(client_ip) {
            return Err(ApiError::auth(
                format!(
                    "Client IP address mismatch. IP address from token: {}",
                    claims.ip
                ),
                "Authentication token error",
            ));
        }

        match self.principals.find_by_login(&claims.login) {
            Ok(Some(principal)) => {
                debug!(login = %principal.login, "Caller authenticated");
                Ok(principal)
            }
            Ok(None) => Err(ApiError::auth(
                format!(
                    "Authentication token error: principal {} does not exist",
                    claims.login
                ),
                "Authentication token error",
            )),
            Err(err) => Err(ApiError::internal(format!(
                "Principal lookup failed: {}",
                err
            ))),
        }
    }

    /// Log a classified failure at its level and append it to the audit log
    fn report(&self, err: &ApiError, route: &str, endpoint: &str) {
        let kind = err.kind();
        let message = err.log_message();
        match err.log_level() {
            LogLevel::Info => info!(%kind, route, endpoint, "{}", message),
            LogLevel::Warning => warn!(%kind, route, endpoint, "{}", message),
            LogLevel::Error => error!(%kind, route, endpoint, "{}", message),
        }

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record(err.log_level(), message) {
                error!(error = %e, "Failed to write audit log entry");
            }
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: &str) -> Option<&str> {
    static BEARER: OnceLock<Option<Regex>> = OnceLock::new();
    BEARER
        .get_or_init(|| Regex::new(r"Bearer\s(\S+)").ok())
        .as_ref()?
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn token_error(err: AuthError) -> ApiError {
    match err {
        AuthError::TokenExpired => ApiError::auth(
            "Attempt to authenticate with expired token",
            "Authentication token expired",
        ),
        AuthError::TokenInvalid(detail) => ApiError::auth(
            format!("Authentication token error: {}", detail),
            "Authentication token error",
        ),
        other => ApiError::internal(format!("Token verification failed: {}", other)),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "endpoint panicked".to_string()
    }
}
