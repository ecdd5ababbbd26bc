//! Per-subscriber bounded queue with drop-oldest eviction
//!
//! Producers push from any thread; the subscriber's send-loop pops on the
//! I/O thread. The push side never waits: when the queue is over its
//! high-water mark the oldest frames are discarded before the new frame is
//! appended.
//!
//! ```text
//!  high_water_mark = 3, nothing consumed
//!
//!  push m1..m4   [m1 m2 m3 m4]
//!  push m5       [m2 m3 m4 m5]     m1 evicted
//!  push m6       [m3 m4 m5 m6]     m2 evicted
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

use super::frame::Frame;

#[derive(Debug, Default)]
struct QueueState {
    frames: VecDeque<Frame>,
    closed: bool,
}

/// Bounded FIFO of frames for a single subscriber
///
/// After any [`push`](Self::push) the queue holds at most
/// `high_water_mark + 1` frames. A high-water mark of 0 keeps only the most
/// recently pushed frame.
#[derive(Debug)]
pub struct FrameQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    high_water_mark: usize,
    evicted: AtomicU64,
}

impl FrameQueue {
    /// Create an empty queue with the given high-water mark
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                frames: VecDeque::with_capacity(high_water_mark.saturating_add(1).min(1024)),
                closed: false,
            }),
            notify: Notify::new(),
            high_water_mark,
            evicted: AtomicU64::new(0),
        }
    }

    /// Append a frame, evicting from the front while over the high-water mark
    ///
    /// Returns the number of frames evicted by this call. Pushing into a
    /// closed queue drops the frame and returns 0.
    pub fn push(&self, frame: Frame) -> usize {
        let mut evicted = 0;
        {
            let mut state = self.state.lock();
            if state.closed {
                return 0;
            }
            while state.frames.len() > self.high_water_mark {
                state.frames.pop_front();
                evicted += 1;
            }
            state.frames.push_back(frame);
        }

        if evicted > 0 {
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::trace!(evicted, hwm = self.high_water_mark, "Evicted oldest frames");
        }

        self.notify.notify_one();
        evicted
    }

    /// Remove the front frame, waiting until one is available
    ///
    /// Returns `None` once the queue has been closed. Intended for a single
    /// consumer (the subscriber's send-loop).
    pub async fn pop(&self) -> Option<Frame> {
        loop {
            {
                let mut state = self.state.lock();
                if let Some(frame) = state.frames.pop_front() {
                    return Some(frame);
                }
                if state.closed {
                    return None;
                }
            }

            // A push between the unlock above and this await leaves a permit,
            // so the wake-up cannot be lost.
            self.notify.notified().await;
        }
    }

    /// Remove the front frame without waiting
    pub fn try_pop(&self) -> Option<Frame> {
        self.state.lock().frames.pop_front()
    }

    /// Close the queue
    ///
    /// Pending frames are discarded, not flushed, and a waiting
    /// [`pop`](Self::pop) returns `None`.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.frames.clear();
        }
        self.notify.notify_waiters();
        self.notify.notify_one();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of frames waiting to be sent
    pub fn len(&self) -> usize {
        self.state.lock().frames.len()
    }

    /// True if no frames are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured high-water mark
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Total frames evicted from this queue since creation
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}
