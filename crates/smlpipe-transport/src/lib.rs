//! Byte sources for smart meter links.
//!
//! Provides a unified interface over the places meter bytes come from:
//! - Serial devices, opened 8N1 at a fixed baud rate
//! - Any [`std::io::Read`] stream, for captures and tests
//!
//! This is the lowest layer of smlpipe. Framing builds on the
//! [`ByteSource`] trait provided here.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{SerialConfig, SerialPort};
pub use traits::{ByteSource, SetReadTimeout, StreamSource};
