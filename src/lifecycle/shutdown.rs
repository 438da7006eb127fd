//! Shutdown coordination.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

use crate::database::DocumentStore;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("server terminated with an I/O error: {0}")]
    Serve(#[from] io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] JoinError),
}

/// A running server.
///
/// Dropping the handle leaves the server running; call [`ServerHandle::shutdown`]
/// to stop it and release the database connection.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<io::Result<()>>,
    store: Arc<dyn DocumentStore>,
}

impl ServerHandle {
    pub(crate) fn new(
        local_addr: SocketAddr,
        shutdown: Shutdown,
        task: JoinHandle<io::Result<()>>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            local_addr,
            shutdown,
            task,
            store,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Stop accepting, drain in-flight requests, then close the database.
    ///
    /// The database is closed even when the server task ended in error.
    pub async fn shutdown(self) -> Result<(), ShutdownError> {
        tracing::info!(address = %self.local_addr, "Shutting down");
        self.shutdown.trigger();

        let served = match self.task.await {
            Ok(result) => result.map_err(ShutdownError::from),
            Err(e) => Err(ShutdownError::from(e)),
        };

        self.store.close().await;

        match &served {
            Ok(()) => tracing::info!("Shutdown complete"),
            Err(e) => tracing::error!(error = %e, "Server stopped with an error"),
        }
        served
    }
}
