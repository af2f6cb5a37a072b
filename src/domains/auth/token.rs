// Opaque handshake tokens and their storage hashes

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// Random bytes per token (256 bits)
const TOKEN_BYTES: usize = 32;

/// Token hash - SHA-256 hash of a token (64-character hex string)
///
/// The store is keyed by hashes so its contents never hold a usable token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn from_token(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque bearer token with memory protection
///
/// Uses `secrecy::Secret` to prevent accidental logging of token material.
pub struct Token(Secret<String>);

impl Token {
    /// Draw a fresh token from the OS RNG (base64url, no padding)
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(Secret::new(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Wrap a token presented by a client
    #[cfg(test)]
    pub fn presented(token: &str) -> Self {
        Self(Secret::new(token.to_string()))
    }

    pub fn hash(&self) -> TokenHash {
        TokenHash::from_token(self.expose_secret())
    }

    /// Expose the secret token (use with caution)
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token").field("value", &"<REDACTED>").finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<REDACTED>")
    }
}

/// Constant-time comparison of two presented values
pub fn tokens_match(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Short, non-reversible identifier for log lines (first 16 hex chars of SHA-256)
pub fn fingerprint(value: &str) -> String {
    let hash = TokenHash::from_token(value);
    hash.as_str()[..16].to_string()
}
