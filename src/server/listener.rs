//! Broadcast server listener
//!
//! Handles the TCP accept loop and spawns one send-loop per subscriber.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::registry::SubscriberRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::SubscriberConnection;
use crate::server::endpoint::{Endpoint, Scheme};
use crate::stats::BroadcastStats;
use crate::transport::FrameWriter;

/// First pause after a failed `accept`
const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);

/// Longest pause between `accept` retries
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause before the next `accept` after `failures` consecutive errors
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Bound broadcast server
///
/// Accepts subscriber connections and drains each subscriber's queue to its
/// socket. Frames enter through the shared [`SubscriberRegistry`].
pub struct FrameServer {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<BroadcastStats>,
    connection_semaphore: Option<Arc<Semaphore>>,
    connections: JoinSet<()>,
}

impl FrameServer {
    /// Parse the configured endpoint and bind a listener on it
    pub async fn bind(
        config: ServerConfig,
        registry: Arc<SubscriberRegistry>,
        stats: Arc<BroadcastStats>,
    ) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;

        let listener = match endpoint.scheme() {
            Scheme::Tcp => TcpListener::bind((endpoint.host(), endpoint.port())).await?,
        };
        let local_addr = listener.local_addr()?;

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Ok(Self {
            config,
            listener,
            local_addr,
            registry,
            stats,
            connection_semaphore,
            connections: JoinSet::new(),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the server
    ///
    /// This method runs until the task is dropped.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` completes, the listener is closed, every subscriber
    /// queue is closed and every connection task has finished. No subscriber
    /// stays registered once this returns.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %self.local_addr, "Broadcast server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop() => {}
        }

        self.registry.close_all();

        // A task accepted just before shutdown may register after
        // `close_all`; aborting runs its unregister guard.
        self.connections.abort_all();
        while self.connections.join_next().await.is_some() {}

        Ok(())
    }

    async fn accept_loop(&mut self) {
        let mut failures = 0u32;

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        failures = 0;
                        self.handle_connection(socket, peer_addr);
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let backoff = accept_backoff(failures);
                        tracing::error!(
                            error = %e,
                            failures,
                            backoff_ms = backoff.as_millis() as u64,
                            "Failed to accept connection"
                        );
                        tokio::time::sleep(backoff).await;
                    }
                },
                Some(finished) = self.connections.join_next(), if !self.connections.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Subscriber task panicked");
                        }
                    }
                }
            }
        }
    }

    fn handle_connection(&mut self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.record_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        self.stats.record_connection();

        let (read_half, write_half) = socket.into_split();
        let mut connection = SubscriberConnection::new(
            FrameWriter::new(write_half),
            read_half,
            Arc::clone(&self.registry),
            Arc::clone(&self.stats),
        );

        self.connections.spawn(async move {
            let _permit = permit;
            let result = connection.run().await;
            let subscriber = connection.id().map(|id| id.as_u64());

            match result {
                Ok(reason) => {
                    tracing::debug!(
                        subscriber = ?subscriber,
                        peer = %peer_addr,
                        reason = ?reason,
                        "Subscriber disconnected"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        subscriber = ?subscriber,
                        peer = %peer_addr,
                        error = %e,
                        "Subscriber connection error"
                    );
                }
            }
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}
