// Integration tests for the startup pipeline

use std::sync::{Arc, Mutex};
use std::time::Duration;

use storefront_api::core::errors::StartupStage;
use storefront_api::domains::auth::AuthDomain;
use storefront_api::domains::users::UsersDomain;
use storefront_api::domains::{self, Domain};
use storefront_api::startup::{self, exit::ExitHandler};

use crate::common::*;

/// Port that was free a moment ago
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn no_redirects() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_full_pipeline_serves_verified_app() {
    let handle = startup::run(test_env(), &domains::declared()).await.unwrap();
    let base = handle.base_url();
    assert_ne!(handle.local_addr().port(), 0);

    let client = no_redirects();
    let health: serde_json::Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["fields"], serde_json::json!(["users", "user"]));

    let login = client
        .post(format!("{base}/login"))
        .json(&serde_json::json!({ "email": SHOPPER }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), reqwest::StatusCode::SEE_OTHER);
    let target = login.headers()[reqwest::header::LOCATION].to_str().unwrap().to_string();
    assert!(target.starts_with(&format!("{base}/authorize?state=")));

    handle.shutdown().await.unwrap();
    assert!(client.get(format!("{base}/health")).send().await.is_err());
}

#[tokio::test]
async fn test_users_before_auth_is_required() {
    let reversed: Vec<Box<dyn Domain>> = vec![Box::new(AuthDomain), Box::new(UsersDomain)];
    let err = startup::run(test_env(), &reversed).await.err().expect("auth needs users");

    assert_eq!(err.stage, StartupStage::ComposeDomains);
    let chain = err.chain();
    assert!(chain[1].contains("domain 'auth' (#0)"), "chain: {chain:?}");
    assert!(chain[2].contains("'users'"));
}

#[tokio::test]
async fn test_domains_run_in_declared_order_and_stop_at_failure() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let domains: Vec<Box<dyn Domain>> = vec![
        Box::new(StubDomain::new("first", &log)),
        Box::new(StubDomain::new("second", &log).failing()),
        Box::new(StubDomain::new("third", &log)),
    ];

    let err = startup::run(test_env(), &domains).await.err().unwrap();
    assert_eq!(err.tag(), "compose_domains_failed");
    assert!(err.chain()[1].contains("domain 'second' (#1)"));
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_extra_domain_routes_are_served() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut domains = domains::declared();
    domains.push(Box::new(StubDomain::new("extra", &log).with_route("GET", "/extra")));

    let handle = startup::run(test_env(), &domains).await.unwrap();
    let body = reqwest::get(format!("{}/extra", handle.base_url()))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "stub");
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_route_conflict_fails_app_composition() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut domains = domains::declared();
    domains.push(Box::new(StubDomain::new("impostor", &log).with_route("POST", "/login")));

    let err = startup::run(test_env(), &domains).await.err().unwrap();
    assert_eq!(err.stage, StartupStage::ComposeApp);
    assert!(err.chain()[1].contains("POST /login"));
}

#[tokio::test]
async fn test_missing_configuration_exits_78() {
    let err = startup::run(test_env().without("CLIENT_ORIGIN"), &domains::declared())
        .await
        .err()
        .unwrap();
    assert_eq!(err.tag(), "compose_context_failed");

    let handler = ExitHandler::using(Vec::new(), chrono::Utc::now);
    assert_eq!(handler.status(&err), 78);
    handler.handle(&err);
    let line = String::from_utf8(handler.into_sink()).unwrap();
    assert!(line.contains("stage=compose_context_failed"));
    assert!(line.contains("CLIENT_ORIGIN not set"));
}

#[tokio::test]
async fn test_occupied_port_fails_start() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port().to_string();

    let err = startup::run(test_env().with("PORT", &port), &domains::declared())
        .await
        .err()
        .unwrap();
    assert_eq!(err.stage, StartupStage::Start);
    assert_eq!(ExitHandler::using(Vec::new(), chrono::Utc::now).status(&err), 1);
}

#[tokio::test]
async fn test_serve_until_stops_on_signal() {
    let handle = startup::run(test_env(), &domains::declared()).await.unwrap();
    let base = handle.base_url();

    handle.serve_until(async {}).await.unwrap();
    assert!(reqwest::get(format!("{base}/health")).await.is_err());
}

#[tokio::test]
async fn test_failed_verification_closes_listener() {
    let port = free_port();
    let env = test_env()
        .with("PORT", &port.to_string())
        .with("VERIFY_ATTEMPTS", "1");

    let err = startup::run_with(env, &domains::declared(), |mut settings| {
        settings.path = "/missing".to_string();
        settings
    })
    .await
    .err()
    .expect("a 404 health check must fail startup");

    assert_eq!(err.tag(), "verify_failed");
    assert!(err.chain()[1].contains("returned 404"), "chain: {:?}", err.chain());
    assert_eq!(ExitHandler::using(Vec::new(), chrono::Utc::now).status(&err), 1);

    let connect = tokio::net::TcpStream::connect(("127.0.0.1", port)).await;
    assert!(connect.is_err(), "listener on {port} still accepting");
}

#[tokio::test]
async fn test_oversized_session_ttl_is_a_configuration_failure() {
    let env = test_env().with("SESSION_TTL_SECS", "40000000000");
    let err = startup::run(env, &domains::declared()).await.err().unwrap();

    assert_eq!(err.tag(), "compose_context_failed");
    assert!(err.chain()[1].contains("SESSION_TTL_SECS"));
    assert_eq!(ExitHandler::using(Vec::new(), chrono::Utc::now).status(&err), 78);
}

#[tokio::test]
async fn test_dropping_handle_stops_server() {
    let handle = startup::run(test_env(), &domains::declared()).await.unwrap();
    let addr = handle.local_addr();
    drop(handle);

    let mut closed = false;
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_err() {
            closed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(closed, "server on {addr} kept accepting after its handle was dropped");
}
