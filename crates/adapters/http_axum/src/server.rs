//! HTTP server with cooperative shutdown.
//!
//! The server stops accepting connections once its [`Shutdown`] is
//! triggered, lets in-flight requests finish, and then resolves
//! [`ServerHandle::stopped`].

use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinHandle;

use rfhub_app::ports::DeviceLibrary;

use crate::router;
use crate::state::{AppState, Shutdown};

/// Entry points for starting the server.
pub struct Server;

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
}

impl Server {
    /// Bind `addr` and start serving in the background.
    ///
    /// # Errors
    ///
    /// Returns the bind failure.
    pub async fn bind<L, A>(addr: A, state: AppState<L>) -> io::Result<ServerHandle>
    where
        L: DeviceLibrary + 'static,
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        Self::from_listener(listener, state)
    }

    /// Serve on an already bound listener in the background.
    ///
    /// # Errors
    ///
    /// Returns an error when the listener's local address cannot be read.
    pub fn from_listener<L>(listener: TcpListener, state: AppState<L>) -> io::Result<ServerHandle>
    where
        L: DeviceLibrary + 'static,
    {
        let local_addr = listener.local_addr()?;
        let shutdown = state.shutdown.clone();
        let signal = shutdown.clone();
        let app = router::build(state);

        tracing::info!(%local_addr, "listening");
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.wait().await })
                .await
        });

        Ok(ServerHandle {
            local_addr,
            shutdown,
            task,
        })
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The signal that stops this server.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Wait until the server has drained and stopped.
    ///
    /// # Errors
    ///
    /// Returns the serve loop's IO failure, or an error if its task panicked.
    pub async fn stopped(self) -> io::Result<()> {
        let result = self.task.await.map_err(io::Error::other)?;
        tracing::info!(local_addr = %self.local_addr, "server stopped");
        result
    }
}
