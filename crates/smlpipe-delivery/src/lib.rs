//! Reliable delivery of metrics to downstream sinks.
//!
//! Each configured sink gets its own FIFO queue and its own worker thread.
//! A worker that fails to deliver puts the item back at the tail and backs
//! off; items are never dropped on failure, and one slow or broken sink
//! never holds up the others.
//!
//! ```text
//! producer --push--> SinkQueue --pop--> SinkWorker --deliver--> Sink
//!                        ^                  |
//!                        +-----requeue------+  (on SinkError)
//! ```

pub mod error;
pub mod graphite;
pub mod influx;
pub mod queue;
pub mod shutdown;
pub mod sink;
pub mod worker;

pub use error::{DeliveryError, Result, SinkError};
pub use graphite::{GraphiteConfig, GraphiteSink};
pub use influx::{InfluxConfig, InfluxSink};
pub use queue::{DeliveryQueue, QueueItem, QueueStats, SinkId, SinkQueue};
pub use shutdown::Shutdown;
pub use sink::Sink;
pub use worker::{spawn, SinkWorker, Step, WorkerConfig, WorkerState};
