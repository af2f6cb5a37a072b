// Domain composer: runs each declared domain against the context, in order

use tracing::info;

use crate::core::errors::{ComposeDomainsError, StartupError, StartupStage};
use crate::core::logger::Severity;
use crate::domains::Domain;
use crate::startup::context::RuntimeContext;

/// Let every domain register into the context, stopping at the first failure
///
/// Partially registered state is not rolled back; a failure abandons the whole
/// startup.
pub async fn compose_domains(
    mut context: RuntimeContext,
    domains: &[Box<dyn Domain>],
) -> Result<RuntimeContext, StartupError> {
    for (index, domain) in domains.iter().enumerate() {
        domain.init(&mut context).await.map_err(|cause| {
            StartupError::new(
                StartupStage::ComposeDomains,
                ComposeDomainsError {
                    domain: domain.name(),
                    index,
                    cause,
                },
            )
        })?;

        info!(
            domain = domain.name(),
            index,
            routes = context.routes().len(),
            resolver_factories = context.resolver_factories().len(),
            "Domain composed"
        );
    }

    context.logger().emit(
        "compose_domains_complete",
        Severity::Trace,
        "compose_domains_complete",
    );

    Ok(context)
}
