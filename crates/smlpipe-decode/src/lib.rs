//! SML message decoding and measurement filtering.
//!
//! Turns a [`RawFrame`](smlpipe_frame::RawFrame) into measurement records
//! and the records of interest into timestamped metrics:
//!
//! ```text
//! RawFrame --> MessageDecoder --> Vec<MeasurementRecord> --> MeasurementFilter --> Vec<Metric>
//! ```
//!
//! [`SmlDecoder`] is the stock decoder; anything implementing
//! [`MessageDecoder`] can stand in for it.

pub mod checksum;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod obis;
pub mod record;
pub mod sml;
pub mod units;

pub use decoder::{MessageDecoder, SmlDecoder};
pub use error::{DecodeError, Result};
pub use filter::{MeasurementFilter, Metric};
pub use obis::{ObisCode, ParseObisError};
pub use record::MeasurementRecord;

#[cfg(test)]
mod test_support;
