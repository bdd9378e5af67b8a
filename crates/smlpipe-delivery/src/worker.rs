use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{DeliveryError, Result};
use crate::queue::SinkQueue;
use crate::shutdown::Shutdown;
use crate::sink::Sink;

/// Worker pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Sleep after finding the queue empty.
    pub idle_interval: Duration,
    /// Sleep after a failed delivery.
    pub backoff_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_secs(1),
            backoff_interval: Duration::from_secs(2),
        }
    }
}

/// Where a worker is in its delivery cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Delivering,
    Backoff,
}

/// Outcome of one [`SinkWorker::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Queue was empty.
    Idle,
    /// One item reached the sink.
    Delivered,
    /// Delivery failed and the item went back to the queue.
    Backoff,
}

/// Drains one sink's queue into that sink.
pub struct SinkWorker<S: Sink> {
    sink: S,
    queue: Arc<SinkQueue>,
    config: WorkerConfig,
    state: WorkerState,
}

impl<S: Sink> SinkWorker<S> {
    pub fn new(sink: S, queue: Arc<SinkQueue>, config: WorkerConfig) -> Self {
        Self {
            sink,
            queue,
            config,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn queue(&self) -> &Arc<SinkQueue> {
        &self.queue
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Pop at most one item and try to deliver it.
    ///
    /// A failed item is requeued before this returns, so nothing is lost
    /// whatever the caller does next.
    pub fn step(&mut self) -> Step {
        self.state = WorkerState::Idle;
        let Some(item) = self.queue.pop() else {
            return Step::Idle;
        };

        self.state = WorkerState::Delivering;
        match self.sink.deliver(&item.metric) {
            Ok(()) => {
                debug!(sink = self.sink.name(), metric = %item.metric.name, "delivered");
                self.queue.ack(item);
                self.state = WorkerState::Idle;
                Step::Delivered
            }
            Err(err) => {
                warn!(
                    sink = self.sink.name(),
                    metric = %item.metric.name,
                    error = %err,
                    "delivery failed, requeueing"
                );
                self.queue.requeue(item);
                self.state = WorkerState::Backoff;
                Step::Backoff
            }
        }
    }

    /// Deliver until `shutdown` is triggered.
    ///
    /// Delivery is eager while the queue has items. The signal is checked
    /// between steps and wakes idle and backoff sleeps early.
    pub fn run(&mut self, shutdown: &Shutdown) {
        info!(sink = self.sink.name(), "worker started");
        while !shutdown.is_triggered() {
            let pause = match self.step() {
                Step::Delivered => continue,
                Step::Idle => self.config.idle_interval,
                Step::Backoff => self.config.backoff_interval,
            };
            if shutdown.sleep(pause) {
                break;
            }
            self.state = WorkerState::Idle;
        }
        self.state = WorkerState::Idle;

        let stats = self.queue.stats();
        info!(
            sink = self.sink.name(),
            delivered = stats.delivered,
            requeued = stats.requeued,
            pending = stats.depth,
            "worker stopped"
        );
    }
}

/// Run `worker` on its own named thread until `shutdown` fires.
pub fn spawn<S>(mut worker: SinkWorker<S>, shutdown: Shutdown) -> Result<JoinHandle<()>>
where
    S: Sink + 'static,
{
    let name = format!("sink-{}", worker.sink.name());
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || worker.run(&shutdown))
        .map_err(|err| DeliveryError::Setup(format!("spawning {name}: {err}")))
}
