// Security event logging for the auth handshake

use axum::http::HeaderMap;
use tracing::{info, warn};

use super::token::fingerprint;

/// Handshake event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoginAccepted,
    LoginRejected { reason: String },
    Authorized,
    AuthorizeRejected { reason: String },
    LogoutStarted,
    Deauthorized { had_session: bool },
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuthEvent::LoginAccepted => "login_accepted",
            AuthEvent::LoginRejected { .. } => "login_rejected",
            AuthEvent::Authorized => "authorized",
            AuthEvent::AuthorizeRejected { .. } => "authorize_rejected",
            AuthEvent::LogoutStarted => "logout_started",
            AuthEvent::Deauthorized { .. } => "deauthorized",
        }
    }
}

/// Client details attached to audit lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    /// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip_address = headers
            .get("X-Forwarded-For")
            .or_else(|| headers.get("X-Real-IP"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let user_agent = headers
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Audit logger for handshake events
///
/// Emails are never logged in clear; a short SHA-256 fingerprint stands in.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditLogger;

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    pub fn log_auth_event(&self, event: &AuthEvent, email: Option<&str>, meta: &RequestMeta) {
        let email_hash = email.map(fingerprint);
        let ip = meta.ip_address.as_deref();
        let ua = meta.user_agent.as_deref();

        match event {
            AuthEvent::LoginRejected { reason } | AuthEvent::AuthorizeRejected { reason } => {
                warn!(
                    event = event.name(),
                    email_hash = ?email_hash,
                    ip_address = ?ip,
                    user_agent = ?ua,
                    reason = %reason,
                    "Auth handshake rejected"
                );
            }
            AuthEvent::Deauthorized { had_session } => {
                info!(
                    event = event.name(),
                    email_hash = ?email_hash,
                    ip_address = ?ip,
                    had_session = had_session,
                    "Session ended"
                );
            }
            _ => {
                info!(
                    event = event.name(),
                    email_hash = ?email_hash,
                    ip_address = ?ip,
                    user_agent = ?ua,
                    "Auth handshake step"
                );
            }
        }
    }
}
