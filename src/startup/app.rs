// App composer: freezes the context's registries into a router and a schema

use axum::Router;
use chrono::Utc;
use std::sync::Arc;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::core::errors::{StartupError, StartupStage};
use crate::core::logger::Severity;
use crate::schema::Schema;
use crate::startup::context::RuntimeContext;

/// Servable application
pub struct App {
    pub router: Router,
    pub schema: Arc<Schema>,
    pub config: Config,
}

/// Assemble the application from the final context
///
/// Reads the registries without mutating them. Resolver factories run in
/// registration order and routes are mounted in registration order.
pub fn compose_app(context: &RuntimeContext) -> Result<App, StartupError> {
    let bindings = context
        .resolver_factories()
        .iter()
        .flat_map(|factory| factory.bindings(context));

    let schema = Arc::new(
        Schema::from_bindings(bindings)
            .map_err(|e| StartupError::new(StartupStage::ComposeApp, e))?,
    );

    let app_state = AppState {
        schema: schema.clone(),
        started_at: Utc::now(),
    };

    let router = create_router(app_state, context.routes().routes(), context.config())
        .map_err(|e| StartupError::new(StartupStage::ComposeApp, e))?;

    let factories: Vec<&str> = context
        .resolver_factories()
        .iter()
        .map(|factory| factory.name())
        .collect();
    context.logger().emit(
        "compose_app_complete",
        Severity::Trace,
        &format!(
            "{} route(s), {} schema field(s) from [{}]",
            context.routes().len(),
            schema.fields().len(),
            factories.join(", ")
        ),
    );

    Ok(App {
        router,
        schema,
        config: context.config().clone(),
    })
}
