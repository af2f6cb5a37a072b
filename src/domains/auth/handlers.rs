// HTTP handlers for the auth handshake routes

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::audit::{AuthEvent, RequestMeta};
use super::cookies::{read_cookie, PENDING_COOKIE, SESSION_COOKIE};
use super::flow::AuthFlow;
use super::origin::{perceived_origin, PerceivedOrigin};
use super::store::SessionStatus;
use crate::api::responses::ApiError;
use crate::api::routes::Endpoint;
use crate::core::errors::AuthError;

/// Computes a return URL from the origin the client perceives
pub type ReturnUrlFn = Arc<dyn Fn(&PerceivedOrigin) -> String + Send + Sync>;

/// State for routes whose redirect target depends on the request origin
#[derive(Clone)]
pub struct ComputedTarget {
    flow: Arc<AuthFlow>,
    compute_return_url: ReturnUrlFn,
}

/// State for routes that always redirect to the same place
#[derive(Clone)]
pub struct FixedTarget {
    flow: Arc<AuthFlow>,
    target: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeQuery {
    #[serde(default)]
    pub state: Option<String>,
}

/// `POST` endpoint accepting `{email}`; redirects toward authorization
pub fn login<F>(flow: &Arc<AuthFlow>, compute_return_url: F) -> Endpoint
where
    F: Fn(&PerceivedOrigin) -> String + Send + Sync + 'static,
{
    Endpoint::new(
        login_handler,
        ComputedTarget {
            flow: flow.clone(),
            compute_return_url: Arc::new(compute_return_url),
        },
    )
}

/// `GET` endpoint completing the handshake; redirects to `success_redirect_url`
pub fn authorize(flow: &Arc<AuthFlow>, success_redirect_url: String) -> Endpoint {
    Endpoint::new(
        authorize_handler,
        FixedTarget {
            flow: flow.clone(),
            target: success_redirect_url,
        },
    )
}

/// `POST` endpoint starting session termination; redirects toward deauthorization
pub fn logout<F>(flow: &Arc<AuthFlow>, compute_return_url: F) -> Endpoint
where
    F: Fn(&PerceivedOrigin) -> String + Send + Sync + 'static,
{
    Endpoint::new(
        logout_handler,
        ComputedTarget {
            flow: flow.clone(),
            compute_return_url: Arc::new(compute_return_url),
        },
    )
}

/// `GET` endpoint removing the session; redirects to `return_url`
pub fn deauthorize(flow: &Arc<AuthFlow>, return_url: String) -> Endpoint {
    Endpoint::new(
        deauthorize_handler,
        FixedTarget {
            flow: flow.clone(),
            target: return_url,
        },
    )
}

/// `GET` endpoint reporting the caller's session
pub fn test_session(flow: &Arc<AuthFlow>) -> Endpoint {
    Endpoint::new(test_session_handler, flow.clone())
}

/// Extract or generate request ID
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// 303 to `location` carrying the given `Set-Cookie` values
fn redirect_with_cookies(location: &str, cookies: &[String]) -> Result<Response, ApiError> {
    let mut headers = HeaderMap::new();
    for cookie in cookies {
        let value = HeaderValue::from_str(cookie).map_err(|e| {
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, format!("Invalid cookie: {e}"))
        })?;
        headers.append(SET_COOKIE, value);
    }
    Ok((headers, Redirect::to(location)).into_response())
}

fn reject(flow: &AuthFlow, event: AuthEvent, meta: &RequestMeta, err: AuthError, request_id: String) -> ApiError {
    flow.audit().log_auth_event(&event, None, meta);
    ApiError::from_auth_error_with_id(err, request_id)
}

/// Login handler
///
/// POST /login
/// Body: { "email": "..." }
async fn login_handler(
    State(route): State<ComputedTarget>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let request_id = request_id(&headers);
    let meta = RequestMeta::from_headers(&headers);
    let flow = &route.flow;

    let origin = match perceived_origin(&headers) {
        Some(origin) => origin,
        None => {
            let event = AuthEvent::LoginRejected {
                reason: "unknown origin".to_string(),
            };
            return Err(reject(flow, event, &meta, AuthError::UnknownOrigin, request_id));
        }
    };
    let return_url = (route.compute_return_url)(&origin);
    let previous = read_cookie(&headers, PENDING_COOKIE);

    match flow.login(&request.email, &return_url, previous.as_deref()).await {
        Ok(outcome) => {
            flow.audit()
                .log_auth_event(&AuthEvent::LoginAccepted, Some(&outcome.email), &meta);
            info!(request_id = %request_id, origin = %origin, "Login accepted");
            let cookie = flow.cookies().set(
                PENDING_COOKIE,
                outcome.pending_token.expose_secret(),
                flow.pending_max_age_secs(),
            );
            redirect_with_cookies(&outcome.redirect, &[cookie])
        }
        Err(err) => {
            let event = AuthEvent::LoginRejected {
                reason: err.to_string(),
            };
            Err(reject(flow, event, &meta, err, request_id))
        }
    }
}

/// Authorize handler
///
/// GET /authorize?state=...
async fn authorize_handler(
    State(route): State<FixedTarget>,
    headers: HeaderMap,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Response, ApiError> {
    let request_id = request_id(&headers);
    let meta = RequestMeta::from_headers(&headers);
    let flow = &route.flow;
    let pending = read_cookie(&headers, PENDING_COOKIE);

    match flow.authorize(query.state.as_deref(), pending.as_deref()).await {
        Ok(authorized) => {
            flow.audit()
                .log_auth_event(&AuthEvent::Authorized, Some(&authorized.email), &meta);
            let cookies = flow.cookies();
            redirect_with_cookies(
                &route.target,
                &[
                    cookies.set(
                        SESSION_COOKIE,
                        authorized.session_token.expose_secret(),
                        flow.session_max_age_secs(),
                    ),
                    cookies.clear(PENDING_COOKIE),
                ],
            )
        }
        Err(err) => {
            let event = AuthEvent::AuthorizeRejected {
                reason: err.to_string(),
            };
            Err(reject(flow, event, &meta, err, request_id))
        }
    }
}

/// Logout handler
///
/// POST /logout
async fn logout_handler(State(route): State<ComputedTarget>, headers: HeaderMap) -> Result<Response, ApiError> {
    let request_id = request_id(&headers);
    let meta = RequestMeta::from_headers(&headers);
    let flow = &route.flow;

    let Some(origin) = perceived_origin(&headers) else {
        return Err(ApiError::from_auth_error_with_id(AuthError::UnknownOrigin, request_id));
    };
    let return_url = (route.compute_return_url)(&origin);
    let session = read_cookie(&headers, SESSION_COOKIE);

    let outcome = flow
        .logout(session.as_deref(), &return_url)
        .await
        .map_err(|err| ApiError::from_auth_error_with_id(err, request_id))?;
    flow.audit()
        .log_auth_event(&AuthEvent::LogoutStarted, outcome.email.as_deref(), &meta);
    redirect_with_cookies(&outcome.redirect, &[])
}

/// Deauthorize handler
///
/// GET /deauthorize
async fn deauthorize_handler(State(route): State<FixedTarget>, headers: HeaderMap) -> Result<Response, ApiError> {
    let meta = RequestMeta::from_headers(&headers);
    let flow = &route.flow;
    let session = read_cookie(&headers, SESSION_COOKIE);

    let removed = flow.deauthorize(session.as_deref()).await;
    flow.audit().log_auth_event(
        &AuthEvent::Deauthorized {
            had_session: removed.is_some(),
        },
        removed.as_deref(),
        &meta,
    );
    redirect_with_cookies(&route.target, &[flow.cookies().clear(SESSION_COOKIE)])
}

/// Session test handler
///
/// GET /session/test
async fn test_session_handler(State(flow): State<Arc<AuthFlow>>, headers: HeaderMap) -> Json<SessionStatus> {
    let session = read_cookie(&headers, SESSION_COOKIE);
    Json(flow.test_session(session.as_deref()).await)
}
