// Axum web server layer

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Router};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod routes;

use crate::config::Config;
use crate::core::errors::AppError;
use crate::schema::Schema;
use routes::{HttpMethod, RouteSpec};

/// Routes every application serves regardless of the registered domains
pub const BUILTIN_ROUTES: [(HttpMethod, &str); 2] =
    [(HttpMethod::Get, "/health"), (HttpMethod::Post, "/query")];

/// Application state shared by the built-in handlers
///
/// Domain endpoints carry their own state (see `routes::Endpoint`).
#[derive(Clone)]
pub struct AppState {
    pub schema: Arc<Schema>,
    pub started_at: DateTime<Utc>,
}

/// Create the Axum router from the built-in routes plus the registered ones
///
/// Middleware stack (outermost to innermost):
/// - Timeout (tower::timeout behind HandleErrorLayer) - 408 when exceeded
/// - Body size limit (tower-http::limit)
/// - Tracing (tower-http::trace)
///
/// Fails instead of panicking on duplicate (method, path) pairs or malformed
/// paths, which axum would otherwise reject at `route` time.
pub fn create_router(
    app_state: AppState,
    registered: &[RouteSpec],
    config: &Config,
) -> Result<Router, AppError> {
    let mut seen: HashSet<(HttpMethod, &str)> = BUILTIN_ROUTES.iter().copied().collect();
    // Routes sharing a path are merged into one MethodRouter before mounting
    let mut by_path: Vec<(&str, Vec<&RouteSpec>)> = Vec::new();

    for route in registered {
        if !route.path.starts_with('/') {
            return Err(AppError::InvalidPath(route.path.clone()));
        }
        let builtin_path = BUILTIN_ROUTES.iter().any(|(_, path)| *path == route.path);
        if builtin_path || !seen.insert((route.method, route.path.as_str())) {
            return Err(AppError::RouteConflict {
                method: route.method.to_string(),
                path: route.path.clone(),
            });
        }

        match by_path.iter_mut().find(|(path, _)| *path == route.path) {
            Some((_, specs)) => specs.push(route),
            None => by_path.push((route.path.as_str(), vec![route])),
        }
    }

    let mut router = Router::new()
        .route("/health", axum::routing::get(handlers::health_handler))
        .route("/query", axum::routing::post(handlers::query_handler));

    for (path, specs) in by_path {
        let method_router = specs
            .iter()
            .map(|spec| spec.endpoint.method_router(spec.method))
            .reduce(|merged, next| merged.merge(next));
        if let Some(method_router) = method_router {
            router = router.route(path, method_router);
        }
    }

    let middleware_stack = ServiceBuilder::new()
        // Handle errors (convert Timeout error to HTTP Response)
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .into_inner();

    Ok(router
        .layer(middleware::tracing_layer())
        .layer(middleware::body_size_limit_layer(config.body_size_limit_bytes))
        .layer(middleware_stack)
        .with_state(app_state))
}
