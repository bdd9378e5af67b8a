//! Smart meter SML reader.
//!
//! smlpipe reads SML frames from a meter's optical interface, decodes the
//! readings, keeps the configured OBIS codes and forwards them to InfluxDB
//! and Graphite with per-sink retry.
//!
//! # Crate Structure
//!
//! - [`transport`] Byte sources (serial tty, any `Read` stream)
//! - [`frame`] Transport frame extraction
//! - [`decode`] SML decoding and measurement filtering
//! - [`delivery`] Per-sink queues, workers and sink clients
//! - [`pipeline`] The producer loop tying the above together

/// Re-export transport types.
pub mod transport {
    pub use smlpipe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use smlpipe_frame::*;
}

/// Re-export decode types.
pub mod decode {
    pub use smlpipe_decode::*;
}

/// Re-export delivery types.
pub mod delivery {
    pub use smlpipe_delivery::*;
}

pub mod pipeline;

pub use pipeline::{hex, Producer, ProducerError, ProducerStats};
