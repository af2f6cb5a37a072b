// Main entry point for the storefront API

use std::process::ExitCode;
use tokio::signal;
use tracing::{info, warn};

use storefront_api::config::Env;
use storefront_api::core::errors::{StartupError, StartupStage};
use storefront_api::domains;
use storefront_api::startup::{self, exit::ExitHandler};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let exit = ExitHandler::stderr();

    let handle = match startup::run(Env::from_process(), &domains::declared()).await {
        Ok(handle) => handle,
        Err(e) => return exit.handle(&e),
    };

    info!(addr = %handle.local_addr(), "Serving");

    if let Err(e) = handle.serve_until(shutdown_signal()).await {
        return exit.handle(&StartupError::new(StartupStage::Serve, e));
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Graceful shutdown signal handler
///
/// Waits for SIGTERM or SIGINT (Ctrl+C). A handler that cannot be installed
/// never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
