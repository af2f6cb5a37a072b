// Feature domains composed into the runtime context at startup

use async_trait::async_trait;

use crate::core::errors::DomainError;
use crate::startup::context::RuntimeContext;

pub mod auth;
pub mod users;

/// A feature that registers its loaders, resolvers and routes into the context
///
/// `init` must finish all of its asynchronous setup before returning; the next
/// domain only runs afterwards and observes everything registered so far.
#[async_trait]
pub trait Domain: Send + Sync {
    fn name(&self) -> &'static str;

    async fn init(&self, context: &mut RuntimeContext) -> Result<(), DomainError>;
}

/// Domains in declaration order
///
/// Auth depends on the user index published by Users, so Users comes first.
pub fn declared() -> Vec<Box<dyn Domain>> {
    vec![Box::new(users::UsersDomain), Box::new(auth::AuthDomain)]
}
