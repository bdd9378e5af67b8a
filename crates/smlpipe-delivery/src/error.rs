/// Errors from a single delivery attempt.
///
/// None of these stop a worker: the item is requeued and the worker backs
/// off before trying again.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The sink could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The sink answered but refused the write.
    #[error("write rejected: {0}")]
    WriteRejected(String),

    /// The sink did not answer in time.
    #[error("sink timed out")]
    Timeout,
}

/// Errors from queue bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// No queue is registered for the sink.
    #[error("unknown sink {0:?}")]
    UnknownSink(String),

    /// The sink client could not be constructed.
    #[error("sink setup failed: {0}")]
    Setup(String),
}

pub type Result<T> = std::result::Result<T, DeliveryError>;
