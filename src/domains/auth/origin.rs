// Perceived request origin: the scheme+host the client used to reach us

use axum::http::HeaderMap;
use std::fmt;
use url::Url;

/// Normalised `scheme://host[:port]` origin, no trailing slash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerceivedOrigin(String);

impl PerceivedOrigin {
    /// Parse an absolute URL and keep only its origin
    pub fn parse(value: &str) -> Option<Self> {
        let url = Url::parse(value.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return None;
        }
        Some(Self(url.origin().ascii_serialization()))
    }

    fn from_parts(scheme: &str, host: &str) -> Option<Self> {
        let scheme = scheme.trim().to_ascii_lowercase();
        let host = host.trim();
        if host.is_empty() || host.contains(['/', '@', '?', '#', '\\']) || host.contains(char::is_whitespace) {
            return None;
        }
        if !matches!(scheme.as_str(), "http" | "https") {
            return None;
        }
        Self::parse(&format!("{scheme}://{host}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PerceivedOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// First hop of a comma-separated proxy list
fn first_hop(value: &str) -> &str {
    value.split(',').next().unwrap_or_default().trim()
}

/// `Forwarded: for=..;proto=https;host=shop.example` (RFC 7239), first element only
fn from_forwarded(value: &str) -> Option<PerceivedOrigin> {
    let mut proto = None;
    let mut host = None;
    for pair in first_hop(value).split(';') {
        let Some((key, val)) = pair.split_once('=') else {
            continue;
        };
        let val = val.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "proto" => proto = Some(val),
            "host" => host = Some(val),
            _ => {}
        }
    }
    PerceivedOrigin::from_parts(proto.unwrap_or("http"), host?)
}

/// Derive the origin the client perceives from proxy and host headers
///
/// Explicit forwarding signals win over `Host`: `X-Forwarded-Origin`, then
/// `Forwarded`, then `X-Forwarded-Host` with `X-Forwarded-Proto`, then `Host`.
/// A malformed signal is skipped rather than trusted.
pub fn perceived_origin(headers: &HeaderMap) -> Option<PerceivedOrigin> {
    if let Some(origin) = header(headers, "x-forwarded-origin").and_then(|v| PerceivedOrigin::parse(first_hop(v))) {
        return Some(origin);
    }

    if let Some(origin) = header(headers, "forwarded").and_then(from_forwarded) {
        return Some(origin);
    }

    if let Some(host) = header(headers, "x-forwarded-host") {
        let proto = header(headers, "x-forwarded-proto").map(first_hop).unwrap_or("http");
        if let Some(origin) = PerceivedOrigin::from_parts(proto, first_hop(host)) {
            return Some(origin);
        }
    }

    header(headers, "host").and_then(|host| PerceivedOrigin::from_parts("http", host))
}
