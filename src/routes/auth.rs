//! `auth` route: login, token refresh, logout and caller status
//!
//! A principal holds at most one active refresh token. Login and refresh
//! both replace it; logout clears it.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::{ApiError, EndpointContext, EndpointResult, Route};
use crate::auth::{
    constant_time_str_eq, hash_token, AuthError, PepperedHasher, Principal, PrincipalStore,
    TokenService,
};
use crate::observability::LogLevel;

use super::{params, RouteServices};

#[derive(Debug, Deserialize)]
struct LoginParams {
    login: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RefreshParams {
    refresh_token: String,
}

pub fn route(services: &RouteServices) -> Route {
    let mut route = Route::new("auth");

    let (tokens, hasher, principals) = (
        Arc::clone(&services.tokens),
        Arc::clone(&services.hasher),
        Arc::clone(&services.principals),
    );
    route
        .endpoint("login", move |ctx, p| {
            login(ctx, params(p)?, &tokens, &hasher, principals.as_ref())
        })
        .schema(json!({
            "type": "object",
            "properties": {
                "login": {"type": "string"},
                "password": {"type": "string"}
            },
            "required": ["login", "password"]
        }));

    let (tokens, principals) = (
        Arc::clone(&services.tokens),
        Arc::clone(&services.principals),
    );
    route
        .endpoint("refresh", move |ctx, p| {
            refresh(ctx, params(p)?, &tokens, principals.as_ref())
        })
        .schema(json!({
            "type": "object",
            "properties": {
                "refresh_token": {"type": "string", "minLength": 1}
            },
            "required": ["refresh_token"]
        }));

    let principals = Arc::clone(&services.principals);
    route
        .endpoint("logout", move |ctx, _| logout(ctx, principals.as_ref()))
        .min_level(1);

    route.endpoint("status", |ctx, _| Ok(status(ctx)));

    route
}

fn login(
    ctx: &EndpointContext<'_>,
    p: LoginParams,
    tokens: &TokenService,
    hasher: &PepperedHasher,
    principals: &dyn PrincipalStore,
) -> EndpointResult {
    let rejected = || {
        ApiError::auth(
            format!("Failed login attempt for {} from {}", p.login, ctx.client_ip),
            "Incorrect login or password",
        )
        .with_level(LogLevel::Warning)
    };

    let mut principal = principals.find_by_login(&p.login)?.ok_or_else(rejected)?;
    if !hasher.verify(&p.password, &principal.password_hash)? {
        return Err(rejected().into());
    }

    let issued = issue_pair(&mut principal, ctx.client_ip, tokens)?;
    principal.touch_login(Utc::now());
    principals.save(&mut principal)?;

    info!(login = %principal.login, ip = ctx.client_ip, "Login");
    Ok(issued)
}

fn refresh(
    ctx: &EndpointContext<'_>,
    p: RefreshParams,
    tokens: &TokenService,
    principals: &dyn PrincipalStore,
) -> EndpointResult {
    let claims = tokens.verify_refresh(&p.refresh_token).map_err(|e| match e {
        AuthError::TokenExpired => ApiError::auth(
            "Attempt to refresh with expired token",
            "Refresh token expired",
        ),
        other => ApiError::auth(
            format!("Refresh token error: {}", other),
            "Refresh token error",
        ),
    })?;

    let inactive = || {
        ApiError::auth(
            format!("Refresh token for {} is not active", claims.login),
            "Refresh token error",
        )
    };

    let mut principal = principals.find_by_login(&claims.login)?.ok_or_else(inactive)?;
    let presented = hash_token(&p.refresh_token);
    let active = principal
        .refresh_token
        .as_deref()
        .is_some_and(|stored| constant_time_str_eq(stored, &presented));
    if !active {
        return Err(inactive().into());
    }

    let issued = issue_pair(&mut principal, ctx.client_ip, tokens)?;
    if !principals.replace_refresh_token(&principal, &presented)? {
        return Err(inactive().into());
    }
    Ok(issued)
}

fn logout(ctx: &EndpointContext<'_>, principals: &dyn PrincipalStore) -> EndpointResult {
    let Some(caller) = ctx.principal else {
        return Err(
            ApiError::auth("Logout without authenticated caller", "Authorization error").into(),
        );
    };

    let mut principal = caller.clone();
    principal.refresh_token = None;
    principals.save(&mut principal)?;

    info!(login = %principal.login, "Logout");
    Ok(Value::Null)
}

fn status(ctx: &EndpointContext<'_>) -> Value {
    match ctx.principal {
        Some(principal) => {
            let mut view = principal.to_public();
            view["authenticated"] = Value::Bool(true);
            view
        }
        None => json!({
            "authenticated": false,
            "login": null,
            "level": 0,
            "last_login": null,
        }),
    }
}

/// Issue a new access/refresh pair and make the refresh token the only
/// active one for `principal`
fn issue_pair(
    principal: &mut Principal,
    client_ip: &str,
    tokens: &TokenService,
) -> Result<Value, AuthError> {
    let access = tokens.issue_access(&principal.login, client_ip)?;
    let refresh = tokens.issue_refresh(&principal.login)?;
    principal.refresh_token = Some(hash_token(&refresh.token));

    Ok(json!({
        "token": access.token,
        "refresh_token": refresh.token,
        "expires": access.expires,
    }))
}
