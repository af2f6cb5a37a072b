// Redirect handshake state machine: login → authorize → logout → deauthorize

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::audit::AuditLogger;
use super::cookies::CookiePolicy;
use super::store::{AuthStore, PendingAuthorization, Session, SessionStatus};
use super::token::{tokens_match, Token, TokenHash};
use crate::config::Config;
use crate::core::errors::{AuthError, DomainError};
use crate::domains::users::{normalize_email, UserIndex};

/// External identity endpoints; `None` redirects straight to the return URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectEndpoints {
    pub authorization: Option<Url>,
    pub deauthorization: Option<Url>,
}

impl RedirectEndpoints {
    pub fn from_config(config: &Config) -> Result<Self, DomainError> {
        let parse = |key: &str, value: &Option<String>| -> Result<Option<Url>, DomainError> {
            value
                .as_deref()
                .map(|v| {
                    Url::parse(v).map_err(|e| DomainError::Registration(format!("{key} '{v}': {e}")))
                })
                .transpose()
        };
        Ok(Self {
            authorization: parse("AUTHORIZATION_ENDPOINT", &config.authorization_endpoint)?,
            deauthorization: parse("DEAUTHORIZATION_ENDPOINT", &config.deauthorization_endpoint)?,
        })
    }
}

/// Accepted login: the pending token to bind to the browser and where to send it
#[derive(Debug)]
pub struct LoginOutcome {
    pub email: String,
    pub pending_token: Token,
    pub redirect: String,
}

/// Completed authorization
#[derive(Debug)]
pub struct AuthorizedSession {
    pub email: String,
    pub session_token: Token,
}

/// Logout redirect and the identity that started it, if any
#[derive(Debug)]
pub struct LogoutOutcome {
    pub email: Option<String>,
    pub redirect: String,
}

/// Build `endpoint?return_to=<return_url>[&state=..]`, or `return_url[?state=..]`
/// when no endpoint is configured
fn redirect_via(endpoint: Option<&Url>, return_url: &str, state: Option<&str>) -> Result<String, AuthError> {
    let mut url = match endpoint {
        Some(endpoint) => {
            let mut url = endpoint.clone();
            url.query_pairs_mut().append_pair("return_to", return_url);
            url
        }
        None => Url::parse(return_url).map_err(|e| AuthError::InvalidRedirect(e.to_string()))?,
    };
    if let Some(state) = state {
        url.query_pairs_mut().append_pair("state", state);
    }
    Ok(url.to_string())
}

/// Session-based authentication handshake
///
/// Holds the user index it authenticates against and the pending/session stores.
/// Every method is safe to call concurrently.
pub struct AuthFlow {
    users: Arc<UserIndex>,
    store: AuthStore,
    endpoints: RedirectEndpoints,
    cookies: CookiePolicy,
    audit: AuditLogger,
}

impl AuthFlow {
    pub fn new(
        users: Arc<UserIndex>,
        store: AuthStore,
        endpoints: RedirectEndpoints,
        cookies: CookiePolicy,
    ) -> Self {
        Self {
            users,
            store,
            endpoints,
            cookies,
            audit: AuditLogger::new(),
        }
    }

    pub fn from_config(users: Arc<UserIndex>, config: &Config) -> Result<Self, DomainError> {
        let store = AuthStore::new(
            Duration::from_secs(config.pending_auth_ttl_secs),
            Duration::from_secs(config.session_ttl_secs),
        );
        Ok(Self::new(
            users,
            store,
            RedirectEndpoints::from_config(config)?,
            CookiePolicy::new(config.cookie_secure),
        ))
    }

    pub fn cookies(&self) -> CookiePolicy {
        self.cookies
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    pub fn pending_max_age_secs(&self) -> u64 {
        self.store.pending_ttl().as_secs()
    }

    pub fn session_max_age_secs(&self) -> u64 {
        self.store.session_ttl().as_secs()
    }

    /// Accept a login for a known user and open a pending authorization
    ///
    /// Any pending entry named by `previous_pending` is discarded first.
    pub async fn login(
        &self,
        email: &str,
        return_url: &str,
        previous_pending: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let email = normalize_email(email).ok_or_else(|| AuthError::InvalidEmail(email.to_string()))?;
        let user = self.users.find_by_email(&email).ok_or(AuthError::UnknownUser)?;

        if let Some(previous) = previous_pending {
            self.store.discard_pending(&TokenHash::from_token(previous)).await;
        }

        let pending_token = Token::generate();
        let redirect = redirect_via(
            self.endpoints.authorization.as_ref(),
            return_url,
            Some(pending_token.expose_secret()),
        )?;

        self.store
            .insert_pending(
                pending_token.hash(),
                PendingAuthorization {
                    user_id: user.id,
                    email: user.email.clone(),
                    created_at: Utc::now(),
                },
            )
            .await;

        debug!(user_id = %user.id, "Pending authorization opened");
        Ok(LoginOutcome {
            email: user.email.clone(),
            pending_token,
            redirect,
        })
    }

    /// Consume the pending authorization named by `state` and open a session
    ///
    /// `state` must equal the browser's pending cookie. Fails closed.
    pub async fn authorize(
        &self,
        state: Option<&str>,
        pending_cookie: Option<&str>,
    ) -> Result<AuthorizedSession, AuthError> {
        let (Some(state), Some(cookie)) = (state, pending_cookie) else {
            return Err(AuthError::MissingCorrelation);
        };
        if !tokens_match(state, cookie) {
            return Err(AuthError::UnmatchedCorrelation);
        }

        let pending = self
            .store
            .take_pending(&TokenHash::from_token(state))
            .await
            .ok_or(AuthError::UnmatchedCorrelation)?;

        let session_token = Token::generate();
        self.store
            .insert_session(
                session_token.hash(),
                Session::new(pending.user_id, pending.email.clone()),
            )
            .await;

        debug!(user_id = %pending.user_id, "Session established");
        Ok(AuthorizedSession {
            email: pending.email,
            session_token,
        })
    }

    /// Flag the caller's session as terminating and redirect to deauthorization
    pub async fn logout(&self, session_cookie: Option<&str>, return_url: &str) -> Result<LogoutOutcome, AuthError> {
        let email = match session_cookie {
            Some(token) => self
                .store
                .mark_terminating(&TokenHash::from_token(token))
                .await
                .map(|session| session.email.clone()),
            None => None,
        };
        let redirect = redirect_via(self.endpoints.deauthorization.as_ref(), return_url, None)?;
        Ok(LogoutOutcome { email, redirect })
    }

    /// Remove the caller's session; returns the removed session's email
    pub async fn deauthorize(&self, session_cookie: Option<&str>) -> Option<String> {
        let token = session_cookie?;
        self.store
            .remove_session(&TokenHash::from_token(token))
            .await
            .map(|session| session.email.clone())
    }

    /// Report the caller's session without changing it
    pub async fn test_session(&self, session_cookie: Option<&str>) -> SessionStatus {
        match session_cookie {
            Some(token) => self.store.session_status(&TokenHash::from_token(token)).await,
            None => SessionStatus::invalid(),
        }
    }
}
