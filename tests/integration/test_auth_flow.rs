// Integration tests for the login/authorize/logout/deauthorize handshake

use axum::http::{header, Request, StatusCode};
use axum::body::Body;
use serde_json::json;
use url::Url;

use storefront_api::config::Config;

use crate::common::*;

fn query_param(location: &str, name: &str) -> Option<String> {
    Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn test_login_redirect_encodes_perceived_return_url() {
    let router = test_router().await;

    let response = send(&router, login_request("localhost:3001", SHOPPER, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let target = location(&response);
    assert!(target.starts_with("http://localhost:3001/authorize?state="));

    let pending = set_cookie(response.headers(), "pending_auth").unwrap();
    assert_eq!(query_param(&target, "state").as_deref(), Some(pending.as_str()));
}

#[tokio::test]
async fn test_login_via_authorization_endpoint() {
    let mut config = Config::test_config();
    config.authorization_endpoint = Some("https://id.example/authorize".to_string());
    let router = compose_test_app(config).await.router;

    let response = send(&router, login_request("localhost:3001", SHOPPER, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let target = location(&response);
    assert!(target.starts_with("https://id.example/authorize?"));
    assert_eq!(
        query_param(&target, "return_to").as_deref(),
        Some("http://localhost:3001/authorize")
    );
    assert!(query_param(&target, "state").is_some());
}

#[tokio::test]
async fn test_login_behind_proxy() {
    let router = test_router().await;
    let request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::HOST, "10.0.0.7:3001")
        .header("x-forwarded-host", "shop.example")
        .header("x-forwarded-proto", "https")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "email": SHOPPER }).to_string()))
        .unwrap();

    let response = send(&router, request).await;
    assert!(location(&response).starts_with("https://shop.example/authorize?state="));
}

#[tokio::test]
async fn test_login_rejections() {
    let router = test_router().await;

    let unknown = send(&router, login_request("localhost:3001", "stranger@95729.com", None)).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(unknown.headers(), "pending_auth").is_none());
    let body = body_json(unknown).await;
    assert_eq!(body["error"], "Invalid credentials");
    assert!(body["request_id"].is_string());

    let malformed = send(&router, login_request("localhost:3001", "not-an-email", None)).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let no_origin = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "email": SHOPPER }).to_string()))
        .unwrap();
    assert_eq!(send(&router, no_origin).await.status(), StatusCode::BAD_REQUEST);

    let no_body = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::HOST, "localhost:3001")
        .body(Body::empty())
        .unwrap();
    assert!(send(&router, no_body).await.status().is_client_error());
}

#[tokio::test]
async fn test_authorize_without_login_fails() {
    let router = test_router().await;

    let bare = send(&router, get_request("/authorize", None)).await;
    assert_eq!(bare.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(bare.headers(), "session").is_none());

    let forged = send(
        &router,
        get_request("/authorize?state=forged", Some("pending_auth=forged")),
    )
    .await;
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(forged).await["error"], "Authorization failed");
}

#[tokio::test]
async fn test_authorize_requires_matching_cookie() {
    let router = test_router().await;
    let login = send(&router, login_request("localhost:3001", SHOPPER, None)).await;
    let pending = set_cookie(login.headers(), "pending_auth").unwrap();

    // State without the browser binding
    let no_cookie = send(&router, get_request(&format!("/authorize?state={pending}"), None)).await;
    assert_eq!(no_cookie.status(), StatusCode::UNAUTHORIZED);

    // Browser binding for a different login
    let other = send(
        &router,
        get_request(&format!("/authorize?state={pending}"), Some("pending_auth=someone-else")),
    )
    .await;
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);

    // The pending login survives both attempts
    let ok = send(
        &router,
        get_request(
            &format!("/authorize?state={pending}"),
            Some(&format!("pending_auth={pending}")),
        ),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_login_then_authorize_establishes_session() {
    let router = test_router().await;
    let login = send(&router, login_request("localhost:3001", SHOPPER, None)).await;
    let pending = set_cookie(login.headers(), "pending_auth").unwrap();
    let cookie = format!("pending_auth={pending}");

    let authorize = send(&router, get_request(&format!("/authorize?state={pending}"), Some(&cookie))).await;
    assert_eq!(authorize.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&authorize), format!("{CLIENT_ORIGIN}/auth/authorized"));
    assert_eq!(set_cookie(authorize.headers(), "pending_auth").as_deref(), Some(""));
    let session = set_cookie(authorize.headers(), "session").unwrap();

    let status = send(&router, get_request("/session/test", Some(&format!("session={session}")))).await;
    assert_eq!(status.status(), StatusCode::OK);
    assert_eq!(body_json(status).await, json!({"valid": true, "email": SHOPPER}));

    // The pending login was consumed
    let replay = send(&router, get_request(&format!("/authorize?state={pending}"), Some(&cookie))).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_repeated_login_supersedes_previous() {
    let router = test_router().await;
    let first = send(&router, login_request("localhost:3001", SHOPPER, None)).await;
    let first_token = set_cookie(first.headers(), "pending_auth").unwrap();

    let second = send(
        &router,
        login_request("localhost:3001", SHOPPER, Some(&format!("pending_auth={first_token}"))),
    )
    .await;
    let second_token = set_cookie(second.headers(), "pending_auth").unwrap();
    assert_ne!(first_token, second_token);

    let stale = send(
        &router,
        get_request(
            &format!("/authorize?state={first_token}"),
            Some(&format!("pending_auth={first_token}")),
        ),
    )
    .await;
    assert_eq!(stale.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_and_deauthorize_end_session() {
    let router = test_router().await;
    let session = establish_session(&router, SHOPPER).await;
    let cookie = format!("session={session}");

    let logout = send(&router, logout_request("localhost:3001", Some(&cookie))).await;
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&logout), "http://localhost:3001/deauthorize");

    let during = body_json(send(&router, get_request("/session/test", Some(&cookie))).await).await;
    assert_eq!(during, json!({"valid": true, "email": SHOPPER, "terminating": true}));

    let deauthorize = send(&router, get_request("/deauthorize", Some(&cookie))).await;
    assert_eq!(deauthorize.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&deauthorize), format!("{CLIENT_ORIGIN}/auth/login"));
    assert_eq!(set_cookie(deauthorize.headers(), "session").as_deref(), Some(""));

    let after = body_json(send(&router, get_request("/session/test", Some(&cookie))).await).await;
    assert_eq!(after, json!({"valid": false}));
}

#[tokio::test]
async fn test_logout_via_deauthorization_endpoint() {
    let mut config = Config::test_config();
    config.deauthorization_endpoint = Some("https://id.example/logout".to_string());
    let router = compose_test_app(config).await.router;

    let logout = send(&router, logout_request("localhost:3001", None)).await;
    assert_eq!(logout.status(), StatusCode::SEE_OTHER);
    let target = location(&logout);
    assert!(target.starts_with("https://id.example/logout?"));
    assert_eq!(
        query_param(&target, "return_to").as_deref(),
        Some("http://localhost:3001/deauthorize")
    );
}

#[tokio::test]
async fn test_deauthorize_anonymous_still_redirects() {
    let router = test_router().await;
    let response = send(&router, get_request("/deauthorize", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("{CLIENT_ORIGIN}/auth/login"));
}

#[tokio::test]
async fn test_session_lookup_is_idempotent() {
    let router = test_router().await;
    let session = establish_session(&router, "shopper2@95729.com").await;
    let cookie = format!("session={session}");

    for _ in 0..3 {
        let body = body_json(send(&router, get_request("/session/test", Some(&cookie))).await).await;
        assert_eq!(body["valid"], true);
        assert!(body.get("terminating").is_none());
    }

    for _ in 0..2 {
        let body = body_json(send(&router, get_request("/session/test", None)).await).await;
        assert_eq!(body, json!({"valid": false}));
    }
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let router = test_router().await;
    let first = establish_session(&router, SHOPPER).await;
    let second = establish_session(&router, "shopper3@95729.com").await;
    assert_ne!(first, second);

    send(&router, get_request("/deauthorize", Some(&format!("session={first}")))).await;

    let second_status = body_json(send(&router, get_request("/session/test", Some(&format!("session={second}")))).await).await;
    assert_eq!(second_status["valid"], true);
    assert_eq!(second_status["email"], "shopper3@95729.com");
}

#[tokio::test]
async fn test_concurrent_authorize_has_single_winner() {
    let router = test_router().await;
    let login = send(&router, login_request("localhost:3001", SHOPPER, None)).await;
    let pending = set_cookie(login.headers(), "pending_auth").unwrap();
    let uri = format!("/authorize?state={pending}");
    let cookie = format!("pending_auth={pending}");

    let attempts = (0..8).map(|_| {
        let router = router.clone();
        let request = get_request(&uri, Some(&cookie));
        tokio::spawn(async move { send(&router, request).await.status() })
    });

    let mut winners = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        if attempt.await.unwrap() == StatusCode::SEE_OTHER {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
