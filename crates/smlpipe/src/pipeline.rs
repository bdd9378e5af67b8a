//! The producer loop: meter link to per-sink queues.

use std::fmt::Write as _;
use std::time::{Duration, SystemTime};

use smlpipe_decode::{DecodeError, MeasurementFilter, MessageDecoder};
use smlpipe_delivery::{DeliveryQueue, Shutdown};
use smlpipe_frame::{FrameError, FrameReader, RawFrame};
use smlpipe_transport::ByteSource;
use tracing::{debug, info, trace, warn};

/// Pause after a failing byte source before reading again.
const TRANSPORT_RETRY: Duration = Duration::from_secs(1);

/// Why one [`Producer::poll_once`] produced nothing.
///
/// Both variants are per-frame conditions. [`Producer::run`] logs them and
/// moves on to the next frame.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Running totals of a producer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Frames read and decoded.
    pub frames: u64,
    /// Metrics handed to the queues (once per metric, not per sink).
    pub metrics: u64,
    pub frame_errors: u64,
    pub decode_errors: u64,
}

/// Reads frames, decodes and filters them, and broadcasts the resulting
/// metrics to every registered sink queue.
pub struct Producer<S, D> {
    reader: FrameReader<S>,
    decoder: D,
    filter: MeasurementFilter,
    queues: DeliveryQueue,
    dump_frames: bool,
    stats: ProducerStats,
}

impl<S: ByteSource, D: MessageDecoder> Producer<S, D> {
    pub fn new(
        reader: FrameReader<S>,
        decoder: D,
        filter: MeasurementFilter,
        queues: DeliveryQueue,
    ) -> Self {
        Self {
            reader,
            decoder,
            filter,
            queues,
            dump_frames: false,
            stats: ProducerStats::default(),
        }
    }

    /// Log a hex dump of every frame at debug level.
    pub fn with_frame_dump(mut self, enabled: bool) -> Self {
        self.dump_frames = enabled;
        self
    }

    /// Process a single frame. Returns the number of metrics queued.
    pub fn poll_once(&mut self) -> Result<usize, ProducerError> {
        let result = self.process_frame();
        match &result {
            Ok(n) => {
                self.stats.frames += 1;
                self.stats.metrics += *n as u64;
            }
            Err(ProducerError::Frame(_)) => self.stats.frame_errors += 1,
            Err(ProducerError::Decode(_)) => self.stats.decode_errors += 1,
        }
        result
    }

    fn process_frame(&mut self) -> Result<usize, ProducerError> {
        let frame = self.reader.next_frame()?;
        let captured_at = SystemTime::now();
        self.dump(&frame);

        let records = self.decoder.decode(&frame)?;
        let metrics = self.filter.filter(&records, captured_at);
        for metric in &metrics {
            trace!(name = %metric.name, value = metric.value, "queueing metric");
            self.queues.broadcast(metric);
        }
        debug!(records = records.len(), metrics = metrics.len(), "frame processed");
        Ok(metrics.len())
    }

    fn dump(&self, frame: &RawFrame) {
        if self.dump_frames {
            debug!(len = frame.len(), hex = %hex(frame.as_bytes()), "frame");
        }
    }

    /// Process frames until `shutdown` is triggered.
    ///
    /// Per-frame errors are logged and never end the loop. A failing byte
    /// source is retried after a short pause.
    pub fn run(&mut self, shutdown: &Shutdown) -> ProducerStats {
        info!("producer started");
        while !shutdown.is_triggered() {
            match self.poll_once() {
                Ok(_) => {}
                Err(ProducerError::Frame(FrameError::Transport(err))) => {
                    warn!(error = %err, "meter link read failed");
                    if shutdown.sleep(TRANSPORT_RETRY) {
                        break;
                    }
                }
                Err(ProducerError::Frame(err @ FrameError::NoStart { .. })) => {
                    warn!(error = %err, "no frame on meter link");
                }
                Err(ProducerError::Frame(err)) => {
                    debug!(error = %err, "dropping partial frame");
                }
                Err(ProducerError::Decode(err)) => {
                    warn!(error = %err, "dropping undecodable frame");
                }
            }
        }

        let stats = self.stats;
        info!(
            frames = stats.frames,
            metrics = stats.metrics,
            frame_errors = stats.frame_errors,
            decode_errors = stats.decode_errors,
            "producer stopped"
        );
        stats
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    pub fn filter(&self) -> &MeasurementFilter {
        &self.filter
    }

    pub fn queues(&self) -> &DeliveryQueue {
        &self.queues
    }

    pub fn reader(&self) -> &FrameReader<S> {
        &self.reader
    }
}

/// Lowercase hex, two digits per byte, no separators.
pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
