// Starter: binds the composed app to a TCP listener

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::core::errors::{StartError, StartupError, StartupStage};
use crate::startup::app::App;

/// A running server
///
/// Dropping the handle starts a graceful shutdown, like `shutdown` but
/// without waiting for it to finish.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL reachable from this host (wildcard binds map to loopback)
    pub fn base_url(&self) -> String {
        let ip = if self.local_addr.ip().is_unspecified() {
            match self.local_addr {
                SocketAddr::V4(_) => "127.0.0.1".to_string(),
                SocketAddr::V6(_) => "[::1]".to_string(),
            }
        } else if self.local_addr.is_ipv6() {
            format!("[{}]", self.local_addr.ip())
        } else {
            self.local_addr.ip().to_string()
        };
        format!("http://{}:{}", ip, self.local_addr.port())
    }

    /// Stop accepting connections and wait for in-flight requests to finish
    pub async fn shutdown(self) -> io::Result<()> {
        // The receiver is gone only if the server already stopped
        let _ = self.shutdown.send(());
        Self::join(self.task).await
    }

    /// Serve until `signal` resolves or the server fails
    pub async fn serve_until<F>(self, signal: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut task = self.task;
        tokio::select! {
            result = &mut task => Self::flatten(result),
            _ = signal => {
                let _ = self.shutdown.send(());
                Self::join(task).await
            }
        }
    }

    async fn join(task: JoinHandle<io::Result<()>>) -> io::Result<()> {
        Self::flatten(task.await)
    }

    fn flatten(result: Result<io::Result<()>, tokio::task::JoinError>) -> io::Result<()> {
        result.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }
}

/// Bind the listener and start serving in a background task
pub async fn start(app: App) -> Result<ServerHandle, StartupError> {
    let addr = app.config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|source| {
        error!(error = %source, addr = %addr, "Failed to bind to address");
        StartupError::new(
            StartupStage::Start,
            StartError::Bind {
                addr: addr.clone(),
                source,
            },
        )
    })?;

    let local_addr = listener.local_addr().map_err(|source| {
        StartupError::new(StartupStage::Start, StartError::Bind { addr, source })
    })?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let make_service = app.router.into_make_service();
    let task = tokio::spawn(async move {
        axum::serve(listener, make_service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    info!(addr = %local_addr, "Server listening on {}", local_addr);

    Ok(ServerHandle {
        local_addr,
        shutdown: shutdown_tx,
        task,
    })
}
