// Startup pipeline: context → domains → app → start → verify

pub mod app;
pub mod context;
pub mod domains;
pub mod exit;
pub mod start;
pub mod verify;

use tracing::{info, warn};

use crate::config::Env;
use crate::core::errors::{StartupError, StartupStage};
use crate::domains::Domain;
use app::compose_app;
use context::compose_context;
use domains::compose_domains;
use start::{start, ServerHandle};
use verify::{verify_health, VerifySettings};

/// Run every startup stage in order and return the verified server
///
/// The first failing stage short-circuits the rest. A server that starts but
/// fails verification is shut down before the error is returned.
pub async fn run(env: Env, domains: &[Box<dyn Domain>]) -> Result<ServerHandle, StartupError> {
    run_with(env, domains, |settings| settings).await
}

/// Like [`run`], with the health check settings adjusted by `verify`
pub async fn run_with<F>(
    env: Env,
    domains: &[Box<dyn Domain>],
    verify: F,
) -> Result<ServerHandle, StartupError>
where
    F: FnOnce(VerifySettings) -> VerifySettings,
{
    let context = compose_context(env).await?;
    let context = compose_domains(context, domains).await?;
    let app = compose_app(&context)?;
    let settings = verify(VerifySettings::from_config(context.config()));
    drop(context);

    let handle = start(app).await?;

    if let Err(e) = verify_health(&handle.base_url(), settings).await {
        let addr = handle.local_addr();
        if let Err(shutdown_err) = handle.shutdown().await {
            warn!(error = %shutdown_err, addr = %addr, "Shutdown after failed verification errored");
        }
        return Err(StartupError::new(StartupStage::Verify, e));
    }

    info!(addr = %handle.local_addr(), "Startup verified");
    Ok(handle)
}
