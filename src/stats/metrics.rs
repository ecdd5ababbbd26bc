//! Statistics and metrics for the broadcaster

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters shared between producers and the I/O thread
#[derive(Debug)]
pub struct BroadcastStats {
    started_at: Instant,
    frames_published: AtomicU64,
    frames_fanned_out: AtomicU64,
    frames_evicted: AtomicU64,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    total_connections: AtomicU64,
    rejected_connections: AtomicU64,
}

impl BroadcastStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            frames_published: AtomicU64::new(0),
            frames_fanned_out: AtomicU64::new(0),
            frames_evicted: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            total_connections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
        }
    }

    /// Record one `publish` call reaching `queues` subscribers
    pub fn record_publish(&self, queues: usize, evicted: usize) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
        self.frames_fanned_out.fetch_add(queues as u64, Ordering::Relaxed);
        if evicted > 0 {
            self.frames_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    /// Record a frame fully written to one subscriber
    pub fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record an accepted subscriber connection
    pub fn record_connection(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection refused by the connection limit
    pub fn record_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters out
    pub fn snapshot(&self, active_subscribers: usize) -> StatsSnapshot {
        StatsSnapshot {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            frames_fanned_out: self.frames_fanned_out.load(Ordering::Relaxed),
            frames_evicted: self.frames_evicted.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            active_subscribers,
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for BroadcastStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`BroadcastStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Calls to `publish`
    pub frames_published: u64,
    /// Frame copies pushed into subscriber queues
    pub frames_fanned_out: u64,
    /// Frames dropped by the drop-oldest policy
    pub frames_evicted: u64,
    /// Frames fully written to a subscriber
    pub frames_sent: u64,
    /// Bytes written to subscribers, excluding framing
    pub bytes_sent: u64,
    /// Subscriber connections ever accepted
    pub total_connections: u64,
    /// Connections refused by the connection limit
    pub rejected_connections: u64,
    /// Subscribers registered right now
    pub active_subscribers: usize,
    /// Time since the stats were created
    pub uptime: Duration,
}

impl StatsSnapshot {
    /// Average outgoing throughput in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.uptime.as_secs();
        if secs > 0 {
            (self.bytes_sent * 8) / secs
        } else {
            0
        }
    }

    /// Fraction of fanned-out frames that were evicted before sending
    pub fn eviction_ratio(&self) -> f64 {
        if self.frames_fanned_out > 0 {
            self.frames_evicted as f64 / self.frames_fanned_out as f64
        } else {
            0.0
        }
    }
}
