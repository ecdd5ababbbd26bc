//! Public publishing entry point
//!
//! A [`Broadcaster`] owns the subscriber registry and a dedicated I/O thread
//! that runs the [`FrameServer`]. Producers call [`Broadcaster::publish`]
//! from any thread; the call pushes the frame into every subscriber queue
//! and returns without touching the network.
//!
//! ```text
//!  producer threads                     framecast-io thread
//!  ────────────────                     ──────────────────────────────
//!  publish() ─┐                         current-thread tokio runtime
//!  publish() ─┼─► registry.fan_out() ──► queue.push() + notify
//!  publish() ─┘                              │
//!                                            ▼
//!                                       send-loop per subscriber ──► TCP
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::thread;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::registry::{Frame, SubscriberRegistry};
use crate::server::{Endpoint, FrameServer, ServerConfig};
use crate::stats::{BroadcastStats, StatsSnapshot};

/// Name of the thread that owns the listener and every connection
pub const IO_THREAD_NAME: &str = "framecast-io";

struct IoThread {
    shutdown_tx: oneshot::Sender<()>,
    thread: thread::JoinHandle<()>,
}

enum IoState {
    Idle,
    Running(IoThread),
    Stopped,
}

/// Fan-out publisher with per-subscriber drop-oldest queues
///
/// # Example
/// ```no_run
/// use framecast::{Broadcaster, ServerConfig};
///
/// # fn example() -> framecast::Result<()> {
/// let broadcaster = Broadcaster::new(
///     ServerConfig::with_endpoint("tcp://*:5556").high_water_mark(8),
/// )?;
///
/// // The first publish binds the listener and starts the I/O thread.
/// broadcaster.publish(r#"{"seq":1}"#, vec![0u8; 1024])?;
/// # Ok(())
/// # }
/// ```
pub struct Broadcaster {
    config: ServerConfig,
    endpoint: Endpoint,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<BroadcastStats>,
    local_addr: OnceLock<SocketAddr>,
    io: Mutex<IoState>,
}

impl Broadcaster {
    /// Create a broadcaster
    ///
    /// The endpoint is validated here; nothing is bound until
    /// [`start`](Self::start) or the first [`publish`](Self::publish).
    pub fn new(config: ServerConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(&config.endpoint)?;
        let registry = Arc::new(SubscriberRegistry::new(config.high_water_mark));

        Ok(Self {
            config,
            endpoint,
            registry,
            stats: Arc::new(BroadcastStats::new()),
            local_addr: OnceLock::new(),
            io: Mutex::new(IoState::Idle),
        })
    }

    /// Bind the listener and start the I/O thread
    ///
    /// Only the first successful call does any work; later calls return the
    /// same address. A failed attempt (e.g. address in use) leaves the
    /// broadcaster idle so it can be retried. Blocks the calling thread until
    /// the listener is bound.
    pub fn start(&self) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr.get() {
            return Ok(*addr);
        }

        let mut io = self.io.lock();
        if let Some(addr) = self.local_addr.get() {
            return Ok(*addr);
        }
        if matches!(*io, IoState::Stopped) {
            return Err(Error::ServerStopped);
        }

        let (io_thread, addr) = self.spawn_io_thread()?;
        *io = IoState::Running(io_thread);
        let _ = self.local_addr.set(addr);

        tracing::info!(endpoint = %self.endpoint, addr = %addr, "Broadcaster started");
        Ok(addr)
    }

    fn spawn_io_thread(&self) -> Result<(IoThread, SocketAddr)> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<SocketAddr>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        let thread = thread::Builder::new()
            .name(IO_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let server = match FrameServer::bind(config, registry, stats).await {
                        Ok(server) => server,
                        Err(e) => {
                            let _ = ready_tx.send(Err(e));
                            return;
                        }
                    };
                    let _ = ready_tx.send(Ok(server.local_addr()));

                    let shutdown = async {
                        let _ = shutdown_rx.await;
                    };
                    if let Err(e) = server.run_until(shutdown).await {
                        tracing::error!(error = %e, "Broadcast server failed");
                    }
                });
                // Dropping the runtime cancels any send-loop still running.
            })?;

        // Must not panic inside a runtime, which rules out `blocking_recv`.
        match futures::executor::block_on(ready_rx) {
            Ok(Ok(addr)) => Ok((IoThread { shutdown_tx, thread }, addr)),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::ServerStopped)
            }
        }
    }

    /// Publish one message to every connected subscriber
    ///
    /// Starts the server on first use. Returns the number of subscriber
    /// queues the frame was pushed into; with no subscribers the frame is
    /// dropped. Never waits for network I/O, and once the server is running
    /// it never fails.
    pub fn publish(&self, metadata: impl Into<Bytes>, payload: impl Into<Bytes>) -> Result<usize> {
        if self.local_addr.get().is_none() {
            self.start()?;
        }

        let frame = Frame::new(metadata, payload);
        let (queues, evicted) = self.registry.fan_out(&frame);
        self.stats.record_publish(queues, evicted);

        Ok(queues)
    }

    /// Stop accepting subscribers and close every connection
    ///
    /// Joins the I/O thread. Publishing afterwards reaches nobody; the
    /// server is not restarted. Called automatically on drop.
    pub fn shutdown(&self) {
        let state = std::mem::replace(&mut *self.io.lock(), IoState::Stopped);

        if let IoState::Running(io) = state {
            let _ = io.shutdown_tx.send(());
            if io.thread.join().is_err() {
                tracing::error!("Broadcast I/O thread panicked");
            }
            tracing::info!(endpoint = %self.endpoint, "Broadcaster stopped");
        }

        self.registry.close_all();
    }

    /// Address the listener is bound to, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Whether the server is currently running
    pub fn is_running(&self) -> bool {
        matches!(*self.io.lock(), IoState::Running(_))
    }

    /// High-water mark new subscribers get
    pub fn high_water_mark(&self) -> usize {
        self.registry.high_water_mark()
    }

    /// Change the high-water mark for subscribers that connect from now on
    pub fn set_high_water_mark(&self, high_water_mark: usize) {
        self.registry.set_high_water_mark(high_water_mark);
    }

    /// Number of connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Current statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot(self.registry.len())
    }
}

impl Drop for Broadcaster {
    fn drop(&mut self) {
        self.shutdown();
    }
}
