// Resolver registry: factories registered by domains, resolved into a schema by the app composer

use crate::core::errors::AppError;
use crate::startup::context::RuntimeContext;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Resolution failure for a single field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Resolves one field from its JSON arguments
pub type Resolver = Arc<dyn Fn(&Value) -> Result<Value, ResolveError> + Send + Sync>;

/// A field name bound to its resolver
#[derive(Clone)]
pub struct ResolverBinding {
    pub field: String,
    pub resolver: Resolver,
}

impl ResolverBinding {
    pub fn new<F>(field: &str, resolver: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, ResolveError> + Send + Sync + 'static,
    {
        Self {
            field: field.to_string(),
            resolver: Arc::new(resolver),
        }
    }
}

impl fmt::Debug for ResolverBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverBinding")
            .field("field", &self.field)
            .finish()
    }
}

/// Pure function producing resolver bindings from the runtime context
#[derive(Clone)]
pub struct ResolverFactory {
    name: &'static str,
    produce: Arc<dyn Fn(&RuntimeContext) -> Vec<ResolverBinding> + Send + Sync>,
}

impl ResolverFactory {
    pub fn new<F>(name: &'static str, produce: F) -> Self
    where
        F: Fn(&RuntimeContext) -> Vec<ResolverBinding> + Send + Sync + 'static,
    {
        Self {
            name,
            produce: Arc::new(produce),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bindings(&self, context: &RuntimeContext) -> Vec<ResolverBinding> {
        (self.produce)(context)
    }
}

impl fmt::Debug for ResolverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverFactory")
            .field("name", &self.name)
            .finish()
    }
}

/// Field name → resolver, frozen once built
#[derive(Default)]
pub struct Schema {
    fields: Vec<String>,
    resolvers: HashMap<String, Resolver>,
}

impl Schema {
    /// Build a schema from bindings in registration order
    pub fn from_bindings<I>(bindings: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = ResolverBinding>,
    {
        let mut schema = Schema::default();
        for binding in bindings {
            if schema.resolvers.contains_key(&binding.field) {
                return Err(AppError::ResolverConflict(binding.field));
            }
            schema.fields.push(binding.field.clone());
            schema.resolvers.insert(binding.field, binding.resolver);
        }
        Ok(schema)
    }

    /// Field names in registration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn resolve(&self, field: &str, args: &Value) -> Result<Value, ResolveError> {
        let resolver = self
            .resolvers
            .get(field)
            .ok_or_else(|| ResolveError::UnknownField(field.to_string()))?;
        resolver(args)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("fields", &self.fields).finish()
    }
}
