use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use smlpipe_decode::Metric;

use crate::error::{DeliveryError, Result};

/// Identifies one configured sink (and its queue).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SinkId(String);

impl SinkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SinkId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A metric waiting for delivery to one sink.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub sink: SinkId,
    pub metric: Metric,
}

/// Counters for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pushed: u64,
    pub requeued: u64,
    pub delivered: u64,
    pub depth: usize,
}

/// Unbounded FIFO of items for one sink, shared between the producer and
/// that sink's worker.
///
/// An item popped by the worker is owned by it until it either calls
/// [`ack`](Self::ack) after a successful delivery or hands it back with
/// [`requeue`](Self::requeue).
#[derive(Debug)]
pub struct SinkQueue {
    id: SinkId,
    items: Mutex<VecDeque<QueueItem>>,
    pushed: AtomicU64,
    requeued: AtomicU64,
    delivered: AtomicU64,
}

impl SinkQueue {
    pub fn new(id: SinkId) -> Self {
        Self {
            id,
            items: Mutex::new(VecDeque::new()),
            pushed: AtomicU64::new(0),
            requeued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &SinkId {
        &self.id
    }

    /// Append a metric at the tail. Never blocks on capacity.
    pub fn push(&self, metric: Metric) {
        let item = QueueItem {
            sink: self.id.clone(),
            metric,
        };
        self.lock().push_back(item);
        self.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove and return the head, if any.
    pub fn pop(&self) -> Option<QueueItem> {
        self.lock().pop_front()
    }

    /// Hand an undelivered item back. It goes to the tail, so retries are
    /// best-effort FIFO.
    pub fn requeue(&self, item: QueueItem) {
        self.lock().push_back(item);
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that `item` reached its sink.
    pub fn ack(&self, item: QueueItem) {
        drop(item);
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pushed: self.pushed.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            depth: self.len(),
        }
    }

    // Every critical section is a single VecDeque call, so a poisoned lock
    // still guards a consistent queue.
    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One queue per sink, keyed by [`SinkId`].
///
/// Cloning is cheap and shares the underlying queues.
#[derive(Debug, Clone, Default)]
pub struct DeliveryQueue {
    queues: BTreeMap<SinkId, Arc<SinkQueue>>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or return the existing) queue for `sink`.
    pub fn register(&mut self, sink: SinkId) -> Arc<SinkQueue> {
        self.queues
            .entry(sink.clone())
            .or_insert_with(|| Arc::new(SinkQueue::new(sink)))
            .clone()
    }

    /// Queue handle for `sink`.
    pub fn queue(&self, sink: &SinkId) -> Result<&Arc<SinkQueue>> {
        self.queues
            .get(sink)
            .ok_or_else(|| DeliveryError::UnknownSink(sink.to_string()))
    }

    pub fn push(&self, sink: &SinkId, metric: Metric) -> Result<()> {
        self.queue(sink)?.push(metric);
        Ok(())
    }

    pub fn pop(&self, sink: &SinkId) -> Result<Option<QueueItem>> {
        Ok(self.queue(sink)?.pop())
    }

    pub fn requeue(&self, sink: &SinkId, item: QueueItem) -> Result<()> {
        self.queue(sink)?.requeue(item);
        Ok(())
    }

    /// Push a copy of `metric` to every registered sink.
    pub fn broadcast(&self, metric: &Metric) {
        for queue in self.queues.values() {
            queue.push(metric.clone());
        }
    }

    /// Registered sinks in id order.
    pub fn sinks(&self) -> impl Iterator<Item = &SinkId> {
        self.queues.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(n: u32) -> Metric {
        Metric::new(format!("m{n}"), f64::from(n), 1_700_000_000.0 + f64::from(n))
    }

    #[test]
    fn fifo_on_happy_path() {
        let queue = SinkQueue::new("influx".into());
        for n in 0..3 {
            queue.push(metric(n));
        }

        let order: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|i| i.metric.name).collect();
        assert_eq!(order, ["m0", "m1", "m2"]);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn requeue_then_pop_returns_same_item() {
        let queue = SinkQueue::new("influx".into());
        queue.push(metric(7));

        let item = queue.pop().unwrap();
        let copy = item.clone();
        queue.requeue(item);

        assert_eq!(queue.pop().unwrap(), copy);
        assert_eq!(queue.stats().requeued, 1);
    }

    #[test]
    fn requeue_goes_to_tail() {
        let queue = SinkQueue::new("graphite".into());
        queue.push(metric(1));
        queue.push(metric(2));

        let first = queue.pop().unwrap();
        queue.requeue(first);

        assert_eq!(queue.pop().unwrap().metric.name, "m2");
        assert_eq!(queue.pop().unwrap().metric.name, "m1");
    }

    #[test]
    fn items_carry_their_sink() {
        let queue = SinkQueue::new("graphite".into());
        queue.push(metric(1));
        assert_eq!(queue.pop().unwrap().sink, SinkId::new("graphite"));
        assert_eq!(queue.id().as_str(), "graphite");
    }

    #[test]
    fn items_are_conserved_across_operations() {
        let queue = SinkQueue::new("s".into());
        let mut in_flight: Vec<QueueItem> = Vec::new();
        let mut delivered = Vec::new();
        let mut pushed = 0u32;
        let mut seed = 0x2545_f491_u32;

        for _ in 0..2_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            match seed % 4 {
                0 => {
                    queue.push(metric(pushed));
                    pushed += 1;
                }
                1 => {
                    if let Some(item) = queue.pop() {
                        in_flight.push(item);
                    }
                }
                2 => {
                    if let Some(item) = in_flight.pop() {
                        queue.requeue(item);
                    }
                }
                _ => {
                    if let Some(item) = in_flight.pop() {
                        delivered.push(item.metric.name.clone());
                        queue.ack(item);
                    }
                }
            }

            assert_eq!(
                queue.len() + in_flight.len() + delivered.len(),
                pushed as usize
            );
        }

        let mut seen: Vec<String> = std::iter::from_fn(|| queue.pop())
            .chain(in_flight)
            .map(|i| i.metric.name)
            .chain(delivered)
            .collect();
        seen.sort();
        let mut expected: Vec<String> = (0..pushed).map(|n| format!("m{n}")).collect();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn stats_track_lifecycle() {
        let queue = SinkQueue::new("s".into());
        queue.push(metric(1));
        queue.push(metric(2));
        let item = queue.pop().unwrap();
        queue.requeue(item);
        let item = queue.pop().unwrap();
        queue.ack(item);

        assert_eq!(
            queue.stats(),
            QueueStats {
                pushed: 2,
                requeued: 1,
                delivered: 1,
                depth: 1,
            }
        );
    }

    #[test]
    fn concurrent_producer_and_consumer_keep_order() {
        let queue = Arc::new(SinkQueue::new("s".into()));
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for n in 0..1_000 {
                    queue.push(metric(n));
                }
            })
        };

        let mut received = Vec::new();
        while received.len() < 1_000 {
            match queue.pop() {
                Some(item) => received.push(item.metric.value as u32),
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();

        assert_eq!(received, (0..1_000).collect::<Vec<_>>());
    }

    #[test]
    fn delivery_queue_routes_by_sink() {
        let mut queues = DeliveryQueue::new();
        let influx = SinkId::new("influx");
        let graphite = SinkId::new("graphite");
        queues.register(influx.clone());
        queues.register(graphite.clone());

        queues.push(&influx, metric(1)).unwrap();
        queues.broadcast(&metric(2));

        assert_eq!(queues.queue(&influx).unwrap().len(), 2);
        assert_eq!(queues.queue(&graphite).unwrap().len(), 1);

        let item = queues.pop(&influx).unwrap().unwrap();
        assert_eq!(item.metric.name, "m1");
        queues.requeue(&influx, item).unwrap();
        assert_eq!(queues.queue(&influx).unwrap().len(), 2);

        let names: Vec<_> = queues.sinks().map(SinkId::as_str).collect();
        assert_eq!(names, ["graphite", "influx"]);
    }

    #[test]
    fn unknown_sink_is_an_error() {
        let queues = DeliveryQueue::new();
        assert!(queues.is_empty());
        let err = queues.push(&SinkId::new("nope"), metric(0)).unwrap_err();
        assert!(matches!(err, DeliveryError::UnknownSink(name) if name == "nope"));
    }

    #[test]
    fn register_is_idempotent() {
        let mut queues = DeliveryQueue::new();
        let a = queues.register(SinkId::new("x"));
        a.push(metric(1));
        let b = queues.register(SinkId::new("x"));
        assert_eq!(b.len(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
