// Users domain: builds the user index and exposes user resolvers

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::errors::DomainError;
use crate::domains::Domain;
use crate::schema::ResolverFactory;
use crate::startup::context::RuntimeContext;

pub mod index;
pub mod resolvers;

pub use index::{normalize_email, User, UserIndex};
pub use resolvers::resolve_users;

/// Build the user index and publish it into the context
///
/// Runs once per startup; the index is complete when this resolves.
pub async fn index_users(context: &mut RuntimeContext) -> Result<Arc<UserIndex>, DomainError> {
    let index = Arc::new(index::load_index(context.config().users_seed_path.as_deref()).await?);
    context.provide_users(index.clone());
    Ok(index)
}

pub struct UsersDomain;

#[async_trait]
impl Domain for UsersDomain {
    fn name(&self) -> &'static str {
        "users"
    }

    async fn init(&self, context: &mut RuntimeContext) -> Result<(), DomainError> {
        index_users(context).await?;
        context.register_resolver_factory(ResolverFactory::new("users", resolve_users));
        Ok(())
    }
}
