// Integration tests for the routes every app serves

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;

use storefront_api::config::Config;

use crate::common::*;

fn query(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_lists_schema_fields() {
    let router = test_router().await;
    let response = send(&router, get_request("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["uptime_secs"].as_i64().unwrap() >= 0);
    assert_eq!(body["fields"], json!(["users", "user"]));
}

#[tokio::test]
async fn test_query_users() {
    let router = test_router().await;

    let all = body_json(send(&router, query(json!({"field": "users"}))).await).await;
    let emails: Vec<&str> = all["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec![SHOPPER, "shopper2@95729.com", "shopper3@95729.com"]);

    let one = body_json(send(&router, query(json!({"field": "user", "args": {"email": SHOPPER}}))).await).await;
    assert_eq!(one["data"]["name"], "Shopper One");

    let none = body_json(
        send(&router, query(json!({"field": "user", "args": {"email": "x@95729.com"}}))).await,
    )
    .await;
    assert_eq!(none, json!({"data": null}));
}

#[tokio::test]
async fn test_query_errors_are_bad_requests() {
    let router = test_router().await;

    let unknown = send(&router, query(json!({"field": "orders"}))).await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(unknown).await["error"].as_str().unwrap().contains("orders"));

    let missing_args = send(&router, query(json!({"field": "user"}))).await;
    assert_eq!(missing_args.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_body_size_limit() {
    let mut config = Config::test_config();
    config.body_size_limit_bytes = 64;
    let router = compose_test_app(config).await.router;

    let padding = "x".repeat(256);
    let response = send(&router, query(json!({"field": "users", "args": {"pad": padding}}))).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let router = test_router().await;
    assert_eq!(
        send(&router, get_request("/nope", None)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        send(&router, get_request("/login", None)).await.status(),
        StatusCode::METHOD_NOT_ALLOWED
    );
}
