use smlpipe_frame::RawFrame;
use tracing::{debug, trace};

use crate::checksum;
use crate::error::{DecodeError, Result};
use crate::obis::ObisCode;
use crate::record::MeasurementRecord;
use crate::sml::{self, MessageBody, SmlMessage};

/// Turns a complete frame into measurement records.
pub trait MessageDecoder {
    /// Decode every numeric reading carried by `frame`.
    ///
    /// `DecodeError::IncompleteMessage` means the frame did not hold a full
    /// message; callers skip the frame and keep reading.
    fn decode(&self, frame: &RawFrame) -> Result<Vec<MeasurementRecord>>;
}

impl<T: MessageDecoder + ?Sized> MessageDecoder for &T {
    fn decode(&self, frame: &RawFrame) -> Result<Vec<MeasurementRecord>> {
        (**self).decode(frame)
    }
}

impl<T: MessageDecoder + ?Sized> MessageDecoder for Box<T> {
    fn decode(&self, frame: &RawFrame) -> Result<Vec<MeasurementRecord>> {
        (**self).decode(frame)
    }
}

/// Decoder for SML 1.04 meter pushes.
#[derive(Debug, Clone)]
pub struct SmlDecoder {
    verify_crc: bool,
}

impl Default for SmlDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SmlDecoder {
    /// Create a decoder that verifies transport checksums.
    pub fn new() -> Self {
        Self { verify_crc: true }
    }

    /// Enable or disable transport checksum verification.
    pub fn with_crc_check(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    pub fn verifies_crc(&self) -> bool {
        self.verify_crc
    }

    /// Check the checksum, strip padding and parse every message in `frame`.
    pub fn messages(&self, frame: &RawFrame) -> Result<Vec<SmlMessage>> {
        if self.verify_crc {
            let bytes = frame.as_bytes();
            let expected = checksum::crc16(&bytes[..bytes.len() - 2]);
            let actual = checksum::from_wire(frame.checksum());
            if expected != actual {
                return Err(DecodeError::ChecksumMismatch { expected, actual });
            }
        }

        let payload = frame.payload();
        let padding = usize::from(frame.padding());
        if padding > 3 || padding > payload.len() {
            return Err(DecodeError::MalformedPayload(format!(
                "padding count {padding} out of range"
            )));
        }

        let messages = sml::parse_messages(&payload[..payload.len() - padding])?;
        if messages.is_empty() {
            return Err(DecodeError::IncompleteMessage);
        }
        Ok(messages)
    }
}

impl MessageDecoder for SmlDecoder {
    fn decode(&self, frame: &RawFrame) -> Result<Vec<MeasurementRecord>> {
        let mut records = Vec::new();

        for message in self.messages(frame)? {
            let MessageBody::GetListResponse(list) = message.body else {
                continue;
            };
            for entry in list.entries {
                let Some(code) = ObisCode::from_slice(&entry.obj_name) else {
                    debug!(len = entry.obj_name.len(), "skipping entry with odd objName");
                    continue;
                };
                let Some(mantissa) = entry.value.as_i64() else {
                    trace!(code = %code, "skipping non-numeric entry");
                    continue;
                };
                records.push(MeasurementRecord::new(
                    code,
                    mantissa,
                    entry.scaler.unwrap_or(0),
                    entry.unit,
                ));
            }
        }

        trace!(records = records.len(), "frame decoded");
        Ok(records)
    }
}
