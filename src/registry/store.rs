//! Subscriber registry implementation
//!
//! Tracks the live set of subscriber queues. Producers only take snapshots;
//! registration and removal happen on the I/O thread as connections come
//! and go.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::frame::{Frame, SubscriberId};
use super::queue::FrameQueue;

/// Registry of connected subscribers and their queues
///
/// Thread-safe via `RwLock`. Fan-out only needs the read side, so
/// concurrent producers do not serialize on each other.
pub struct SubscriberRegistry {
    /// Map of subscriber id to its queue
    subscribers: RwLock<HashMap<SubscriberId, Arc<FrameQueue>>>,

    /// High-water mark applied to queues created from now on
    high_water_mark: AtomicUsize,

    /// Next subscriber id to hand out
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry whose queues use the given high-water mark
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            high_water_mark: AtomicUsize::new(high_water_mark),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new subscriber
    ///
    /// Creates a fresh queue with the current high-water mark. The queue only
    /// sees frames fanned out after this call returns.
    pub fn register(&self) -> (SubscriberId, Arc<FrameQueue>) {
        let id = SubscriberId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::new(FrameQueue::new(self.high_water_mark()));

        let count = {
            let mut subscribers = self.subscribers.write();
            subscribers.insert(id, Arc::clone(&queue));
            subscribers.len()
        };

        tracing::debug!(
            subscriber = %id,
            subscribers = count,
            hwm = queue.high_water_mark(),
            "Subscriber registered"
        );

        (id, queue)
    }

    /// Remove a subscriber and close its queue
    ///
    /// Unknown or already removed ids are ignored.
    pub fn unregister(&self, id: SubscriberId) {
        let removed = self.subscribers.write().remove(&id);

        if let Some(queue) = removed {
            queue.close();
            tracing::debug!(
                subscriber = %id,
                evicted = queue.evicted(),
                "Subscriber unregistered"
            );
        }
    }

    /// Point-in-time copy of every registered queue
    pub fn snapshot(&self) -> Vec<Arc<FrameQueue>> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Push a frame into every queue of a fresh snapshot
    ///
    /// Returns `(queues reached, frames evicted)`.
    pub fn fan_out(&self, frame: &Frame) -> (usize, usize) {
        let queues = self.snapshot();
        let evicted: usize = queues.iter().map(|q| q.push(frame.clone())).sum();
        (queues.len(), evicted)
    }

    /// Whether the given subscriber is currently registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().contains_key(&id)
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// True if no subscriber is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// High-water mark that new queues will get
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark.load(Ordering::Relaxed)
    }

    /// Change the high-water mark for queues created after this call
    pub fn set_high_water_mark(&self, high_water_mark: usize) {
        self.high_water_mark.store(high_water_mark, Ordering::Relaxed);
    }

    /// Remove every subscriber and close its queue
    pub fn close_all(&self) {
        let drained: Vec<(SubscriberId, Arc<FrameQueue>)> =
            self.subscribers.write().drain().collect();

        for (_, queue) in &drained {
            queue.close();
        }

        if !drained.is_empty() {
            tracing::debug!(subscribers = drained.len(), "All subscribers closed");
        }
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: &'static str) -> Frame {
        Frame::new(tag, tag)
    }

    #[test]
    fn test_register_unregister() {
        let registry = SubscriberRegistry::new(2);

        let (a, queue_a) = registry.register();
        let (b, _queue_b) = registry.register();

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(queue_a.high_water_mark(), 2);

        registry.unregister(a);
        assert!(!registry.contains(a));
        assert!(registry.contains(b));
        assert!(queue_a.is_closed());

        // Idempotent
        registry.unregister(a);
        registry.unregister(SubscriberId::new(999));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fan_out_reaches_every_queue() {
        let registry = SubscriberRegistry::new(4);
        let (_, q1) = registry.register();
        let (_, q2) = registry.register();

        let (reached, evicted) = registry.fan_out(&frame("m1"));

        assert_eq!(reached, 2);
        assert_eq!(evicted, 0);
        assert_eq!(q1.try_pop(), Some(frame("m1")));
        assert_eq!(q2.try_pop(), Some(frame("m1")));
    }

    #[test]
    fn test_fan_out_without_subscribers() {
        let registry = SubscriberRegistry::default();
        assert_eq!(registry.fan_out(&frame("m1")), (0, 0));
    }

    #[test]
    fn test_no_replay_for_late_subscriber() {
        let registry = SubscriberRegistry::new(8);
        let (_, early) = registry.register();

        registry.fan_out(&frame("m1"));
        let (_, late) = registry.register();
        registry.fan_out(&frame("m2"));

        assert_eq!(early.try_pop(), Some(frame("m1")));
        assert_eq!(early.try_pop(), Some(frame("m2")));
        assert_eq!(late.try_pop(), Some(frame("m2")));
        assert_eq!(late.try_pop(), None);
    }

    #[test]
    fn test_hwm_change_only_affects_new_queues() {
        let registry = SubscriberRegistry::new(0);
        let (_, old) = registry.register();

        registry.set_high_water_mark(5);
        let (_, new) = registry.register();

        assert_eq!(old.high_water_mark(), 0);
        assert_eq!(new.high_water_mark(), 5);
    }

    #[test]
    fn test_queues_are_isolated() {
        let registry = SubscriberRegistry::new(1);
        let (_, slow) = registry.register();
        let (_, fast) = registry.register();

        for tag in ["m1", "m2", "m3"] {
            registry.fan_out(&frame(tag));
            assert_eq!(fast.try_pop(), Some(frame(tag)));
        }

        assert_eq!(slow.evicted(), 1);
        assert_eq!(fast.evicted(), 0);
        assert_eq!(slow.try_pop(), Some(frame("m2")));
        assert_eq!(slow.try_pop(), Some(frame("m3")));
    }

    #[test]
    fn test_close_all() {
        let registry = SubscriberRegistry::new(0);
        let (_, q1) = registry.register();
        let (_, q2) = registry.register();

        registry.close_all();

        assert!(registry.is_empty());
        assert!(q1.is_closed());
        assert!(q2.is_closed());
    }

    #[test]
    fn test_concurrent_register_and_fan_out() {
        let registry = Arc::new(SubscriberRegistry::new(3));

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        registry.fan_out(&frame("tick"));
                    }
                })
            })
            .collect();

        let mut queues = Vec::new();
        for _ in 0..50 {
            let (id, queue) = registry.register();
            queues.push((id, queue));
        }
        for (id, _) in queues.iter().step_by(2) {
            registry.unregister(*id);
        }

        for p in producers {
            p.join().unwrap();
        }

        assert_eq!(registry.len(), 25);
        for (_, queue) in &queues {
            assert!(queue.len() <= 4);
        }
    }
}
