// Error taxonomy for the startup pipeline and the auth handshake

use std::fmt;
use thiserror::Error;

/// Boxed cause carried by [`StartupError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Pipeline stage that produced a [`StartupError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStage {
    ComposeContext,
    ComposeDomains,
    ComposeApp,
    Start,
    Verify,
    Serve,
}

impl StartupStage {
    /// Stable tag written to the log by the exit handler
    pub fn tag(&self) -> &'static str {
        match self {
            StartupStage::ComposeContext => "compose_context_failed",
            StartupStage::ComposeDomains => "compose_domains_failed",
            StartupStage::ComposeApp => "compose_app_failed",
            StartupStage::Start => "start_failed",
            StartupStage::Verify => "verify_failed",
            StartupStage::Serve => "serve_failed",
        }
    }

    /// Process exit status for a failure in this stage (78 is EX_CONFIG)
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupStage::ComposeContext => 78,
            _ => 1,
        }
    }
}

impl fmt::Display for StartupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Stage-tagged failure that aborts the startup pipeline
///
/// The underlying cause is kept as the error `source()` so the whole chain can be
/// reported.
#[derive(Error, Debug)]
#[error("{stage}")]
pub struct StartupError {
    pub stage: StartupStage,
    #[source]
    pub cause: BoxError,
}

impl StartupError {
    pub fn new(stage: StartupStage, cause: impl Into<BoxError>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }

    pub fn tag(&self) -> &'static str {
        self.stage.tag()
    }

    /// Messages of this error and every nested source, outermost first
    pub fn chain(&self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            messages.push(err.to_string());
            current = err.source();
        }
        messages
    }
}

/// Bad or missing environment input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{0} not set")]
    Missing(String),

    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Unusable(String),
}

/// A domain failed while registering into the runtime context
#[derive(Error, Debug)]
#[error("domain '{domain}' (#{index}) failed to compose")]
pub struct ComposeDomainsError {
    pub domain: &'static str,
    pub index: usize,
    #[source]
    pub cause: DomainError,
}

/// Failure raised by a single domain's `init`
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("loader failed")]
    Loader(#[from] LoaderError),

    #[error("required service '{0}' has not been registered by an earlier domain")]
    MissingDependency(&'static str),

    #[error("registration failed: {0}")]
    Registration(String),
}

/// Failure while building the in-memory user index
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("cannot read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid user seed: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid email '{0}'")]
    InvalidEmail(String),

    #[error("duplicate email '{0}'")]
    DuplicateEmail(String),
}

/// Assembly failure in the app composer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("route {method} {path} registered more than once")]
    RouteConflict { method: String, path: String },

    #[error("route path '{0}' must start with '/'")]
    InvalidPath(String),

    #[error("resolver field '{0}' bound more than once")]
    ResolverConflict(String),
}

/// Listener could not be established
#[derive(Error, Debug)]
pub enum StartError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Post-start self check failed
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("health check to {url} failed after {attempts} attempt(s)")]
    Unreachable {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("health check to {url} returned {status}")]
    Unhealthy { url: String, status: u16 },

    #[error("health check to {url} reported '{reported}'")]
    NotReady { url: String, reported: String },
}

/// Authentication handshake errors (per request, never fatal to the process)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Unknown user")]
    UnknownUser,

    #[error("Request origin could not be determined")]
    UnknownOrigin,

    #[error("Missing authorization correlation")]
    MissingCorrelation,

    #[error("Authorization correlation does not match a pending login")]
    UnmatchedCorrelation,

    #[error("Invalid redirect target: {0}")]
    InvalidRedirect(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidEmail(_) => 400,
            AuthError::UnknownUser => 401,
            AuthError::UnknownOrigin => 400,
            AuthError::MissingCorrelation => 401,
            AuthError::UnmatchedCorrelation => 401,
            AuthError::InvalidRedirect(_) => 500,
        }
    }

    /// Get user-friendly error message (no account enumeration, no internals)
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidEmail(_) => "Invalid email".to_string(),
            AuthError::UnknownUser => "Invalid credentials".to_string(),
            AuthError::UnknownOrigin => "Request origin could not be determined".to_string(),
            AuthError::MissingCorrelation | AuthError::UnmatchedCorrelation => {
                "Authorization failed".to_string()
            }
            AuthError::InvalidRedirect(_) => "Internal error".to_string(),
        }
    }
}
