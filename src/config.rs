// Configuration management

use crate::core::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Longest accepted pending/session lifetime (10 years)
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Snapshot of the process environment (name → value)
///
/// Configuration is parsed from this map rather than from `std::env` directly so
/// a startup can be composed from an explicit set of inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

impl Env {
    /// Capture the current process environment
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_process() -> Self {
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // Ignore errors (file may not exist)
        }

        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Return a copy with `key` set to `value`
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Return a copy without `key`
    pub fn without(mut self, key: &str) -> Self {
        self.vars.remove(key);
        self
    }
}

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Client application (redirect targets are built from it)
    pub client_origin: String,

    // External identity endpoints; `None` means the handshake redirects directly
    pub authorization_endpoint: Option<String>,
    pub deauthorization_endpoint: Option<String>,

    // Users domain
    pub users_seed_path: Option<PathBuf>,

    // Handshake state lifetimes
    pub pending_auth_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub cookie_secure: bool,

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Post-start verification
    pub verify_timeout_secs: u64,
    pub verify_attempts: u32,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_env_map(&Env::from_process())
    }

    /// Load configuration from an environment snapshot
    ///
    /// Validates all required fields and file paths.
    pub fn from_env_map(env: &Env) -> Result<Self, ConfigurationError> {
        let config = Self {
            bind_address: Self::get_env_or_default(env, "BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port(env)?,
            client_origin: Self::get_required(env, "CLIENT_ORIGIN")?
                .trim_end_matches('/')
                .to_string(),
            authorization_endpoint: Self::get_optional_env(env, "AUTHORIZATION_ENDPOINT"),
            deauthorization_endpoint: Self::get_optional_env(env, "DEAUTHORIZATION_ENDPOINT"),
            users_seed_path: Self::get_optional_env(env, "USERS_SEED_PATH").map(PathBuf::from),
            pending_auth_ttl_secs: Self::parse_or_default(env, "PENDING_AUTH_TTL_SECS", 300)?,
            session_ttl_secs: Self::parse_or_default(env, "SESSION_TTL_SECS", 86_400)?,
            cookie_secure: Self::parse_bool_or_default(env, "COOKIE_SECURE", false)?,
            request_timeout_secs: Self::parse_or_default(env, "REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_or_default(env, "BODY_SIZE_LIMIT_BYTES", 1024 * 1024)?,
            verify_timeout_secs: Self::parse_or_default(env, "VERIFY_TIMEOUT_SECS", 5)?,
            verify_attempts: Self::parse_or_default(env, "VERIFY_ATTEMPTS", 3)?,
            log_level: Self::get_env_or_default(env, "LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default(env, "LOG_FORMAT", "json"),
        };

        // Post-load validation
        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(env: &Env, key: &str, default: &str) -> String {
        env.get(key).unwrap_or(default).to_string()
    }

    /// Get optional environment variable (empty counts as unset)
    fn get_optional_env(env: &Env, key: &str) -> Option<String> {
        env.get(key)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    /// Get required environment variable
    fn get_required(env: &Env, key: &str) -> Result<String, ConfigurationError> {
        let value = env
            .get(key)
            .ok_or_else(|| ConfigurationError::Missing(key.to_string()))?;

        if value.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(value.to_string())
    }

    /// Parse port from PORT environment variable (0 selects an ephemeral port)
    fn parse_port(env: &Env) -> Result<u16, ConfigurationError> {
        let port_str = env.get("PORT").unwrap_or("3001");
        port_str
            .parse::<u16>()
            .map_err(|e| ConfigurationError::Invalid {
                key: "PORT".to_string(),
                value: port_str.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parse a positive number from environment variable or return default
    fn parse_or_default<T>(env: &Env, key: &str, default: T) -> Result<T, ConfigurationError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        match env.get(key) {
            Some(value) => {
                let parsed = value.parse::<T>().map_err(|e| ConfigurationError::Invalid {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                })?;

                if parsed == T::default() {
                    return Err(ConfigurationError::Invalid {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "must be greater than 0".to_string(),
                    });
                }

                Ok(parsed)
            }
            None => Ok(default),
        }
    }

    fn parse_bool_or_default(env: &Env, key: &str, default: bool) -> Result<bool, ConfigurationError> {
        match env.get(key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ConfigurationError::Invalid {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "must be 'true' or 'false'".to_string(),
                }),
            },
            None => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                key: "BIND_ADDRESS".to_string(),
                value: self.bind_address.clone(),
                reason: "must not be empty".to_string(),
            });
        }

        Self::validate_http_url(&self.client_origin, "CLIENT_ORIGIN")?;
        if let Some(ref url) = self.authorization_endpoint {
            Self::validate_http_url(url, "AUTHORIZATION_ENDPOINT")?;
        }
        if let Some(ref url) = self.deauthorization_endpoint {
            Self::validate_http_url(url, "DEAUTHORIZATION_ENDPOINT")?;
        }

        if let Some(ref path) = self.users_seed_path {
            Self::validate_file_path(path, "USERS_SEED_PATH")?;
        }

        Self::validate_ttl(self.pending_auth_ttl_secs, "PENDING_AUTH_TTL_SECS")?;
        Self::validate_ttl(self.session_ttl_secs, "SESSION_TTL_SECS")?;

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate a handshake lifetime against the cache's upper bound
    fn validate_ttl(secs: u64, key: &str) -> Result<(), ConfigurationError> {
        if secs > MAX_TTL_SECS {
            return Err(ConfigurationError::Invalid {
                key: key.to_string(),
                value: secs.to_string(),
                reason: format!("must be at most {} seconds (10 years)", MAX_TTL_SECS),
            });
        }
        Ok(())
    }

    /// Validate that a file path exists and is a file
    fn validate_file_path(path: &PathBuf, key: &str) -> Result<(), ConfigurationError> {
        if !path.is_file() {
            return Err(ConfigurationError::Invalid {
                key: key.to_string(),
                value: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }
        Ok(())
    }

    /// Validate an absolute http(s) URL
    fn validate_http_url(value: &str, key: &str) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason,
        };

        let url = url::Url::parse(value).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid("scheme must be http or https".to_string()));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), ConfigurationError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(ConfigurationError::Invalid {
                key: "LOG_LEVEL".to_string(),
                value: level.to_string(),
                reason: format!("must be one of {}", valid_levels.join(", ")),
            });
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), ConfigurationError> {
        if format != "json" && format != "text" {
            return Err(ConfigurationError::Invalid {
                key: "LOG_FORMAT".to_string(),
                value: format.to_string(),
                reason: "must be 'json' or 'text'".to_string(),
            });
        }
        Ok(())
    }

    /// Address the listener binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Config {
    /// Create a test configuration for unit tests
    ///
    /// This bypasses environment loading and file validation; it binds an
    /// ephemeral loopback port and redirects directly (no identity endpoints).
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            client_origin: "http://localhost:3000".to_string(),
            authorization_endpoint: None,
            deauthorization_endpoint: None,
            users_seed_path: None,
            pending_auth_ttl_secs: 300,
            session_ttl_secs: 3600,
            cookie_secure: false,
            request_timeout_secs: 30,
            body_size_limit_bytes: 1024 * 1024,
            verify_timeout_secs: 2,
            verify_attempts: 3,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
