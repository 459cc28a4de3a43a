//! Relay HTTP server
//!
//! Binds the listener and serves the router until shutdown.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::RelayConfig;
use crate::control::Relay;

use super::routes::create_router;

/// HTTP front end for one [`Relay`]
pub struct RelayServer {
    relay: Arc<Relay>,
}

impl RelayServer {
    /// Create a server with a fresh relay built from `config`
    pub fn new(config: RelayConfig) -> Self {
        Self::with_relay(Arc::new(Relay::new(config)))
    }

    /// Create a server for an existing relay
    pub fn with_relay(relay: Arc<Relay>) -> Self {
        Self { relay }
    }

    /// Get a reference to the relay
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.relay.config().server.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    ///
    /// On shutdown the encoder is stopped first, so every open `/stream`
    /// response ends and the graceful drain can complete.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = %listener.local_addr()?, "Relay server listening");

        let relay = Arc::clone(&self.relay);
        let shutdown = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            if let Err(e) = tokio::task::spawn_blocking(move || relay.shutdown()).await {
                tracing::error!(error = %e, "Shutdown task failed");
            }
        };

        let app = create_router(Arc::clone(&self.relay));
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_addr_from_config() {
        let mut config = RelayConfig::default();
        config.server.bind_addr = "127.0.0.1:8123".parse().unwrap();
        let server = RelayServer::new(config);

        assert_eq!(server.bind_addr().port(), 8123);
        assert!(!server.relay().is_running());
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let server = RelayServer::new(RelayConfig::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await
        });

        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
