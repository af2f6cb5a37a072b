// Runtime context: the owned builder threaded through every startup stage

use std::fmt;
use std::sync::Arc;

use crate::api::routes::RouteTable;
use crate::config::{Config, Env};
use crate::core::errors::{StartupError, StartupStage};
use crate::core::logger::{init_tracing, Logger, Severity};
use crate::domains::users::UserIndex;
use crate::schema::ResolverFactory;

/// Shared state accumulated during composition
///
/// Exactly one instance exists per startup. It is moved from stage to stage and
/// its registries only ever grow; the app composer reads it without mutation.
pub struct RuntimeContext {
    env: Env,
    config: Config,
    logger: Logger,
    resolver_factories: Vec<ResolverFactory>,
    routes: RouteTable,
    users: Option<Arc<UserIndex>>,
}

impl RuntimeContext {
    /// Context with empty registries around an already validated config
    pub fn new(env: Env, config: Config) -> Self {
        Self {
            env,
            config,
            logger: Logger::new(),
            resolver_factories: Vec::new(),
            routes: RouteTable::new(),
            users: None,
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn resolver_factories(&self) -> &[ResolverFactory] {
        &self.resolver_factories
    }

    pub fn register_resolver_factory(&mut self, factory: ResolverFactory) {
        self.resolver_factories.push(factory);
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route registrar target for domains
    pub fn routes_mut(&mut self) -> &mut RouteTable {
        &mut self.routes
    }

    /// User index published by the users domain
    pub fn users(&self) -> Option<Arc<UserIndex>> {
        self.users.clone()
    }

    pub fn provide_users(&mut self, users: Arc<UserIndex>) {
        self.users = Some(users);
    }
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("config", &self.config)
            .field("resolver_factories", &self.resolver_factories)
            .field("routes", &self.routes)
            .field("users", &self.users.as_ref().map(|u| u.len()))
            .finish()
    }
}

/// Build a fresh runtime context from the environment
///
/// Validates the environment, installs the tracing subscriber and starts with
/// empty registries.
pub async fn compose_context(env: Env) -> Result<RuntimeContext, StartupError> {
    let config = Config::from_env_map(&env)
        .map_err(|e| StartupError::new(StartupStage::ComposeContext, e))?;

    init_tracing(&config).map_err(|e| StartupError::new(StartupStage::ComposeContext, e))?;

    let context = RuntimeContext::new(env, config);
    context.logger().emit(
        "compose_context_complete",
        Severity::Trace,
        "compose_context_complete",
    );
    Ok(context)
}
