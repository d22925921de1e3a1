//! HTTP Gateway Tests
//!
//! Exercises the axum router end to end: headers in, envelope out.

use std::net::SocketAddr;
use std::sync::Arc;

use aphreton::api::ResponseBody;
use aphreton::bootstrap::build_gateway;
use aphreton::config::GatewayConfig;
use aphreton::http_server::gateway_routes;
use axum::body::{to_bytes, Body};
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    let config = GatewayConfig::from_json(
        r#"{
            "jwt_key": "http-secret",
            "password_pepper": "http-pepper",
            "initialize_database": true,
            "databases": {"main": {"dsn": "memory:"}}
        }"#,
    )
    .unwrap();
    let handler = Arc::new(build_gateway(&config).unwrap());
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    gateway_routes(handler).layer(MockConnectInfo(peer))
}

fn post(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, ResponseBody) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_login_over_http() {
    let (status, body) = send(
        router(),
        post(json!({"route": "auth", "endpoint": "login",
                    "params": {"login": "test", "password": "qwerty"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.status, 1);
    assert_eq!(body.error, "");
    assert!(body.data["token"].is_string());
    assert!(body.execution_time >= 0.0);
}

#[tokio::test]
async fn test_bearer_header_and_peer_address() {
    let app = router();
    let (_, login) = send(
        app.clone(),
        post(json!({"route": "auth", "endpoint": "login",
                    "params": {"login": "test", "password": "qwerty"}})),
    )
    .await;
    let token = login.data["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(
            json!({"route": "auth", "endpoint": "status"}).to_string(),
        ))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data["login"], "test");
}

#[tokio::test]
async fn test_get_receives_envelope() {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body.status, 0);
    assert_eq!(body.error, "API requests are required to use POST method");
    assert_eq!(body.data, json!([]));
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = send(
        router(),
        post(json!({"route": "library", "endpoint": "get_author", "params": {"name": "x"}})),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.error, "No authentication token provided");
    assert_eq!(body.route, "library");
    assert_eq!(body.endpoint, "get_author");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, body) = send(router(), post(json!({"route": "gggggg", "endpoint": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body.error, "API route gggggg does not exist");
}

#[tokio::test]
async fn test_only_root_path_is_routed() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"route": "auth", "endpoint": "status"}).to_string()))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
