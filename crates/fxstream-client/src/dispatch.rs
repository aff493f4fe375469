//! Per-partition queues and their workers.
//!
//! Every key a session subscribes to owns one bounded [`PartitionQueue`] and
//! one worker task. A full queue drops its oldest item so the read loop never
//! waits on a slow consumer.

use crate::frame::StreamMessage;
use crate::stats::StreamStats;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Outcome of pushing into a [`PartitionQueue`].
#[derive(Debug, PartialEq, Eq)]
pub enum Push<T> {
    /// The item was queued.
    Queued,
    /// The item was queued and the returned oldest item was dropped.
    Evicted(T),
    /// The queue is closed; the item is handed back.
    Closed(T),
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Bounded drop-oldest queue with a single consumer.
#[derive(Debug)]
pub struct PartitionQueue<T> {
    state: Mutex<QueueState<T>>,
    notify: Notify,
    capacity: usize,
}

impl<T> PartitionQueue<T> {
    /// Creates an empty queue holding at most `capacity` items (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Appends an item, dropping the oldest one if the queue is full.
    pub fn push(&self, item: T) -> Push<T> {
        let outcome = {
            let mut state = self.state.lock();
            if state.closed {
                return Push::Closed(item);
            }
            let evicted = if state.items.len() >= self.capacity {
                state.items.pop_front()
            } else {
                None
            };
            state.items.push_back(item);
            evicted.map_or(Push::Queued, Push::Evicted)
        };
        self.notify.notify_one();
        outcome
    }

    /// Waits for the next item.
    ///
    /// Returns `None` once the queue is closed and empty.
    pub async fn pop(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    return Some(item);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Closes the queue. Items already queued can still be popped.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_one();
    }

    /// Drops all queued items, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.items.len();
        state.items.clear();
        dropped
    }

    /// Returns true if the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns the number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the queue capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Clone> PartitionQueue<T> {
    /// Returns a copy of the queued items, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.state.lock().items.iter().cloned().collect()
    }
}

/// Outcome of routing a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Queued for the key's worker.
    Queued,
    /// Queued, and the oldest pending message of the key was dropped.
    Evicted,
    /// No partition is registered for the key.
    Unrouted,
    /// The partition is already closed.
    Closed,
}

/// Callback run by partition workers.
pub type PartitionHandler<K> = Arc<dyn Fn(&K, StreamMessage) + Send + Sync>;

type Routes<K> = HashMap<K, Arc<PartitionQueue<StreamMessage>>>;

/// Read-only view of the routing table, used by the read loop.
pub struct Router<K> {
    routes: Arc<Routes<K>>,
    stats: Arc<StreamStats>,
}

impl<K> Clone for Router<K> {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for Router<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("keys", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K> Router<K>
where
    K: Eq + Hash + fmt::Display,
{
    /// Queues a message for its partition.
    pub fn route(&self, key: &K, message: StreamMessage) -> RouteOutcome {
        let Some(queue) = self.routes.get(key) else {
            self.stats.record_unrouted();
            tracing::warn!(key = %key, kind = message.kind(), "No partition registered for message");
            return RouteOutcome::Unrouted;
        };

        match queue.push(message) {
            Push::Queued => RouteOutcome::Queued,
            Push::Evicted(dropped) => {
                self.stats.record_evicted();
                tracing::debug!(key = %key, kind = dropped.kind(), "Partition queue full, dropped oldest message");
                RouteOutcome::Evicted
            }
            Push::Closed(_) => RouteOutcome::Closed,
        }
    }
}

/// Owns the per-key queues and the workers draining them.
///
/// Partitions are registered before routing starts; afterwards the table is
/// only read, through a [`Router`], so routing takes no lock beyond the target
/// queue's own.
pub struct Dispatcher<K> {
    routes: Routes<K>,
    capacity: usize,
    workers: JoinSet<()>,
    stats: Arc<StreamStats>,
}

impl<K: fmt::Debug> fmt::Debug for Dispatcher<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("keys", &self.routes.keys().collect::<Vec<_>>())
            .field("capacity", &self.capacity)
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl<K> Dispatcher<K>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
{
    /// Creates a dispatcher whose queues hold `capacity` messages each.
    #[must_use]
    pub fn new(capacity: usize, stats: Arc<StreamStats>) -> Self {
        Self {
            routes: HashMap::new(),
            capacity: capacity.max(1),
            workers: JoinSet::new(),
            stats,
        }
    }

    /// Registers a partition, returning its queue. Registering a key twice
    /// returns the existing queue.
    pub fn register(&mut self, key: K) -> Arc<PartitionQueue<StreamMessage>> {
        let capacity = self.capacity;
        Arc::clone(
            self.routes
                .entry(key)
                .or_insert_with(|| Arc::new(PartitionQueue::new(capacity))),
        )
    }

    /// Returns the number of registered partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no partition is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns a router over the partitions registered so far.
    #[must_use]
    pub fn router(&self) -> Router<K> {
        Router {
            routes: Arc::new(self.routes.clone()),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Spawns one worker per partition.
    ///
    /// Workers stop invoking `handler` as soon as `cancel` fires.
    pub fn start_workers(&mut self, handler: PartitionHandler<K>, cancel: &CancellationToken) {
        for (key, queue) in &self.routes {
            let key = key.clone();
            let queue = Arc::clone(queue);
            let handler = Arc::clone(&handler);
            let cancel = cancel.clone();
            self.workers.spawn(async move {
                while let Some(message) = queue.pop().await {
                    if cancel.is_cancelled() {
                        break;
                    }
                    handler(&key, message);
                }
                tracing::trace!(key = %key, "Partition worker exited");
            });
        }
    }

    /// Closes every partition and waits for all workers to exit.
    ///
    /// With `discard` set, pending messages are dropped instead of delivered.
    pub async fn drain_and_close(&mut self, discard: bool) {
        for (key, queue) in &self.routes {
            if discard {
                let dropped = queue.clear();
                if dropped > 0 {
                    tracing::debug!(key = %key, dropped, "Discarded pending messages");
                }
            }
            queue.close();
        }

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Partition worker failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn message(kind: &str, payload: &'static str) -> StreamMessage {
        StreamMessage::new(kind, payload)
    }

    #[test]
    fn test_queue_drops_oldest() {
        let queue = PartitionQueue::new(3);
        for item in ["a", "b", "c"] {
            assert_eq!(queue.push(item), Push::Queued);
        }
        assert_eq!(queue.push("d"), Push::Evicted("a"));
        assert_eq!(queue.push("e"), Push::Evicted("b"));
        assert_eq!(queue.snapshot(), ["c", "d", "e"]);
        assert_eq!(queue.len(), queue.capacity());
    }

    #[test]
    fn test_closed_queue_rejects() {
        let queue = PartitionQueue::new(2);
        queue.push(1);
        queue.close();
        assert_eq!(queue.push(2), Push::Closed(2));
        assert!(queue.is_closed());
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_pop_drains_then_ends() {
        let queue = PartitionQueue::new(4);
        queue.push(1);
        queue.push(2);
        queue.close();
        assert_eq!(queue.pop().await, Some(1));
        assert_eq!(queue.pop().await, Some(2));
        assert_eq!(queue.pop().await, None);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let queue = Arc::new(PartitionQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(7);
        assert_eq!(consumer.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_routing_is_isolated() {
        let stats = Arc::new(StreamStats::new());
        let mut dispatcher = Dispatcher::new(5, Arc::clone(&stats));
        dispatcher.register("A".to_string());
        dispatcher.register("B".to_string());

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler: PartitionHandler<String> = {
            let seen = Arc::clone(&seen);
            Arc::new(move |key: &String, message: StreamMessage| {
                seen.lock().push((key.clone(), message.payload().clone()));
            })
        };

        let router = dispatcher.router();
        assert_eq!(router.route(&"A".to_string(), message("tick", "1")), RouteOutcome::Queued);
        assert_eq!(router.route(&"C".to_string(), message("tick", "2")), RouteOutcome::Unrouted);
        assert_eq!(router.route(&"A".to_string(), message("tick", "3")), RouteOutcome::Queued);

        dispatcher.start_workers(handler, &CancellationToken::new());
        dispatcher.drain_and_close(false).await;

        let seen = seen.lock();
        let payloads: Vec<_> = seen.iter().map(|(k, p)| (k.as_str(), p.as_ref())).collect();
        assert_eq!(payloads, [("A", &b"1"[..]), ("A", &b"3"[..])]);
        assert_eq!(stats.snapshot().unrouted, 1);
    }

    #[tokio::test]
    async fn test_overflow_counts_evictions() {
        let stats = Arc::new(StreamStats::new());
        let mut dispatcher = Dispatcher::new(2, Arc::clone(&stats));
        let queue = dispatcher.register(1_i64);
        let router = dispatcher.router();
        for i in 0..5 {
            router.route(&1, message("transaction", if i % 2 == 0 { "even" } else { "odd" }));
        }
        assert_eq!(queue.len(), 2);
        assert_eq!(stats.snapshot().evicted, 3);
        dispatcher.drain_and_close(true).await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_discard_delivers_nothing() {
        let stats = Arc::new(StreamStats::new());
        let mut dispatcher = Dispatcher::new(5, stats);
        dispatcher.register("EUR_USD".to_string());
        let router = dispatcher.router();
        for _ in 0..3 {
            router.route(&"EUR_USD".to_string(), message("tick", "{}"));
        }

        let calls = Arc::new(Mutex::new(0));
        let handler: PartitionHandler<String> = {
            let calls = Arc::clone(&calls);
            Arc::new(move |_: &String, _: StreamMessage| *calls.lock() += 1)
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        dispatcher.start_workers(handler, &cancel);
        dispatcher.drain_and_close(true).await;
        assert_eq!(*calls.lock(), 0);
    }
}
