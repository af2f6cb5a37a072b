// Route registrar: ordered (method, path, endpoint) entries appended by domains

use axum::handler::Handler;
use axum::routing::{on, MethodFilter, MethodRouter};
use std::fmt;
use std::sync::Arc;

use crate::api::AppState;

/// HTTP methods a domain may register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn filter(&self) -> MethodFilter {
        match self {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler bound to its own state, not yet attached to a method
///
/// Materialised into an axum `MethodRouter` by the app composer, so registering
/// an endpoint never touches the router itself.
#[derive(Clone)]
pub struct Endpoint {
    build: Arc<dyn Fn(MethodFilter) -> MethodRouter<AppState> + Send + Sync>,
}

impl Endpoint {
    /// Bind `handler` to `state`
    pub fn new<H, T, S>(handler: H, state: S) -> Self
    where
        H: Handler<T, S> + Sync,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        Self {
            build: Arc::new(move |filter| on(filter, handler.clone()).with_state(state.clone())),
        }
    }

    /// Endpoint whose handler reads the application state
    pub fn stateless<H, T>(handler: H) -> Self
    where
        H: Handler<T, AppState> + Sync,
        T: 'static,
    {
        Self {
            build: Arc::new(move |filter| on(filter, handler.clone())),
        }
    }

    pub fn method_router(&self, method: HttpMethod) -> MethodRouter<AppState> {
        (self.build)(method.filter())
    }
}

/// One registered route
#[derive(Clone)]
pub struct RouteSpec {
    pub method: HttpMethod,
    pub path: String,
    pub endpoint: Endpoint,
}

impl fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Append-only list of routes in registration order
#[derive(Clone, Default, Debug)]
pub struct RouteTable {
    routes: Vec<RouteSpec>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, method: HttpMethod, path: &str, endpoint: Endpoint) -> &mut Self {
        self.routes.push(RouteSpec {
            method,
            path: path.to_string(),
            endpoint,
        });
        self
    }

    pub fn get(&mut self, path: &str, endpoint: Endpoint) -> &mut Self {
        self.register(HttpMethod::Get, path, endpoint)
    }

    pub fn post(&mut self, path: &str, endpoint: Endpoint) -> &mut Self {
        self.register(HttpMethod::Post, path, endpoint)
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
