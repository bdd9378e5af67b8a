//! CRC-16/X-25 as used by the SML transport layer.

use crc::{Crc, CRC_16_IBM_SDLC};

const X25: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Checksum of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    X25.checksum(data)
}

/// The checksum as it appears on the wire (least significant byte first).
pub fn to_wire(crc: u16) -> [u8; 2] {
    crc.to_le_bytes()
}

/// Reads a checksum from its wire representation.
pub fn from_wire(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}
