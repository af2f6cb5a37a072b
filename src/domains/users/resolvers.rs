// Resolver factory for the users domain

use serde_json::{json, Value};

use crate::schema::{ResolveError, ResolverBinding};
use crate::startup::context::RuntimeContext;

/// Bind `users` and `user(email)` against the indexed users
///
/// Pure: reads the index published in the context and produces nothing when
/// no index has been published.
pub fn resolve_users(context: &RuntimeContext) -> Vec<ResolverBinding> {
    let Some(index) = context.users() else {
        return Vec::new();
    };

    let all = index.clone();
    let one = index;

    vec![
        ResolverBinding::new("users", move |_args| Ok(json!(all.all()))),
        ResolverBinding::new("user", move |args| {
            let email = args
                .get("email")
                .and_then(Value::as_str)
                .ok_or_else(|| ResolveError::InvalidArguments("'email' is required".to_string()))?;
            Ok(one
                .find_by_email(email)
                .map(|user| json!(user))
                .unwrap_or(Value::Null))
        }),
    ]
}
