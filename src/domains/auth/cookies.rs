// Cookie header parsing and Set-Cookie construction

use axum::http::{header::COOKIE, HeaderMap};

/// Browser binding for an in-flight login
pub const PENDING_COOKIE: &str = "pending_auth";

/// Browser binding for an established session
pub const SESSION_COOKIE: &str = "session";

/// Value of the named cookie across every `Cookie` header
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Attributes shared by every cookie the handshake sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// `Set-Cookie` value binding `name` to `value` for `max_age_secs`
    pub fn set(&self, name: &str, value: &str, max_age_secs: u64) -> String {
        format!("{name}={value}; {}; Max-Age={max_age_secs}", self.attributes())
    }

    /// `Set-Cookie` value that removes `name` from the browser
    pub fn clear(&self, name: &str) -> String {
        format!("{name}=; {}; Max-Age=0", self.attributes())
    }

    fn attributes(&self) -> &'static str {
        if self.secure {
            "Path=/; HttpOnly; SameSite=Lax; Secure"
        } else {
            "Path=/; HttpOnly; SameSite=Lax"
        }
    }
}
