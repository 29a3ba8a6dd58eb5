// src/pending.rs
//! Pending identifiers and the callers waiting on them.
//!
//! Identifiers move from the queue into the in-flight set when a batch is
//! drained, and leave the in-flight set when that batch resolves them. Waiters
//! are keyed by identifier and survive the move, so a lookup arriving while
//! its identifier is in flight is answered by the batch already on the wire.

use indexmap::IndexSet;
use std::collections::{HashMap, HashSet};
use tokio::sync::oneshot;

/// Completion handle for one suspended lookup.
pub(crate) type Waiter = oneshot::Sender<Option<String>>;

#[derive(Default)]
pub(crate) struct Pending {
    queue: IndexSet<String>,
    in_flight: HashSet<String>,
    waiters: HashMap<String, Vec<Waiter>>,
}

impl Pending {
    /// Queue `id` unless it is already queued or in flight. Returns whether
    /// it was newly queued.
    pub(crate) fn enqueue(&mut self, id: &str) -> bool {
        if self.in_flight.contains(id) || self.queue.contains(id) {
            return false;
        }
        self.queue.insert(id.to_string())
    }

    /// Register a caller for `id` and return the receiving half.
    pub(crate) fn register(&mut self, id: &str) -> oneshot::Receiver<Option<String>> {
        let (tx, rx) = oneshot::channel();
        self.waiters.entry(id.to_string()).or_default().push(tx);
        rx
    }

    /// Move up to `max` identifiers from the front of the queue into flight.
    pub(crate) fn drain_batch(&mut self, max: usize) -> Vec<String> {
        let n = max.min(self.queue.len());
        let batch: Vec<String> = self.queue.drain(..n).collect();
        self.in_flight.extend(batch.iter().cloned());
        batch
    }

    /// Mark `id` resolved and hand back its waiters in registration order.
    pub(crate) fn complete(&mut self, id: &str) -> Vec<Waiter> {
        self.in_flight.remove(id);
        self.waiters.remove(id).unwrap_or_default()
    }

    /// Clear everything, returning every outstanding waiter.
    pub(crate) fn take_all(&mut self) -> Vec<Waiter> {
        self.queue.clear();
        self.in_flight.clear();
        self.waiters.drain().flat_map(|(_, w)| w).collect()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub(crate) fn is_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains(id)
    }

    /// Queued or in flight.
    pub(crate) fn is_pending(&self, id: &str) -> bool {
        self.queue.contains(id) || self.in_flight.contains(id)
    }
}

/// Deliver `name` to every waiter. A dropped receiver is not an error.
pub(crate) fn resolve_all(waiters: Vec<Waiter>, name: &Option<String>) {
    for waiter in waiters {
        let _ = waiter.send(name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_dedups_queued_and_in_flight() {
        let mut pending = Pending::default();
        assert!(pending.enqueue("a"));
        assert!(!pending.enqueue("a"));
        assert!(pending.enqueue("b"));

        let batch = pending.drain_batch(1);
        assert_eq!(batch, vec!["a".to_string()]);
        assert!(pending.is_in_flight("a"));
        assert!(!pending.enqueue("a"));
        assert_eq!(pending.queued(), 1);
    }

    #[test]
    fn drain_preserves_queue_order() {
        let mut pending = Pending::default();
        for id in ["c", "a", "b"] {
            pending.enqueue(id);
        }
        assert_eq!(pending.drain_batch(10), vec!["c", "a", "b"]);
        assert!(pending.drain_batch(10).is_empty());
    }

    #[tokio::test]
    async fn waiters_survive_drain_and_resolve_in_order() {
        let mut pending = Pending::default();
        pending.enqueue("foo");
        let first = pending.register("foo");
        pending.drain_batch(100);
        let second = pending.register("foo");

        let waiters = pending.complete("foo");
        assert_eq!(waiters.len(), 2);
        resolve_all(waiters, &Some("Foo".to_string()));

        assert_eq!(first.await.unwrap().as_deref(), Some("Foo"));
        assert_eq!(second.await.unwrap().as_deref(), Some("Foo"));
        assert!(!pending.is_in_flight("foo"));
        assert!(pending.complete("foo").is_empty());
    }

    #[test]
    fn take_all_empties_everything() {
        let mut pending = Pending::default();
        pending.enqueue("a");
        let _rx = pending.register("a");
        pending.drain_batch(1);
        pending.enqueue("b");
        let _rx2 = pending.register("b");
        assert_eq!(pending.take_all().len(), 2);
        assert_eq!(pending.queued(), 0);
        assert!(!pending.is_in_flight("a"));
    }
}
