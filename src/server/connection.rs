//! Per-subscriber send-loop
//!
//! Each accepted connection gets one [`SubscriberConnection`] running on the
//! I/O thread. It registers a queue, drains it to the wire and unregisters
//! when the peer goes away, a write fails or the queue is closed.
//!
//! ```text
//!   Connecting ──register()──► Active ──error / hang-up / close──► Closed
//! ```

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::registry::{FrameQueue, SubscriberId, SubscriberRegistry};
use crate::stats::BroadcastStats;
use crate::transport::FrameSink;

/// Subscriber lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberPhase {
    /// Accepted, not yet registered
    Connecting,
    /// Registered and draining its queue
    Active,
    /// Unregistered; terminal
    Closed,
}

/// Why a send-loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed its side of the connection
    PeerClosed,
    /// The subscriber's queue was closed (unregistered or shutdown)
    QueueClosed,
}

/// Unregisters the subscriber when dropped, including on task cancellation
struct Registration {
    id: SubscriberId,
    queue: Arc<FrameQueue>,
    registry: Arc<SubscriberRegistry>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// One subscriber connection
///
/// `S` receives frames; `R` is the read side of the same connection and is
/// only watched for hang-up. Subscribers are not expected to send anything,
/// so any bytes read from it are discarded.
pub struct SubscriberConnection<S, R> {
    id: Option<SubscriberId>,
    phase: SubscriberPhase,
    sink: S,
    hangup: R,
    registry: Arc<SubscriberRegistry>,
    stats: Arc<BroadcastStats>,
}

impl<S, R> SubscriberConnection<S, R>
where
    S: FrameSink,
    R: AsyncRead + Unpin + Send,
{
    /// Create a connection in the `Connecting` phase
    pub fn new(
        sink: S,
        hangup: R,
        registry: Arc<SubscriberRegistry>,
        stats: Arc<BroadcastStats>,
    ) -> Self {
        Self {
            id: None,
            phase: SubscriberPhase::Connecting,
            sink,
            hangup,
            registry,
            stats,
        }
    }

    /// Subscriber id, once registered
    pub fn id(&self) -> Option<SubscriberId> {
        self.id
    }

    /// Current phase
    pub fn phase(&self) -> SubscriberPhase {
        self.phase
    }

    /// Register and run the send-loop until the subscriber goes away
    ///
    /// Write and read errors are returned so the caller can log them; the
    /// subscriber is unregistered in every case. A connection that is
    /// already `Closed` returns immediately.
    pub async fn run(&mut self) -> io::Result<CloseReason> {
        if self.phase != SubscriberPhase::Connecting {
            return Ok(CloseReason::QueueClosed);
        }

        let (id, queue) = self.registry.register();
        let registration = Registration {
            id,
            queue,
            registry: Arc::clone(&self.registry),
        };
        self.id = Some(id);
        self.phase = SubscriberPhase::Active;

        let result = self.send_loop(&registration.queue).await;

        drop(registration);
        self.phase = SubscriberPhase::Closed;
        result
    }

    async fn send_loop(&mut self, queue: &FrameQueue) -> io::Result<CloseReason> {
        let mut discard = [0u8; 256];

        loop {
            tokio::select! {
                frame = queue.pop() => {
                    let Some(frame) = frame else {
                        return Ok(CloseReason::QueueClosed);
                    };
                    // Runs to completion before the next pop; nothing else
                    // writes to this sink.
                    self.sink.send_frame(&frame).await?;
                    self.stats.record_sent(frame.len());
                }
                read = self.hangup.read(&mut discard) => {
                    if read? == 0 {
                        return Ok(CloseReason::PeerClosed);
                    }
                }
            }
        }
    }
}
