//! Builders for SML payloads and frames used across this crate's tests.

use smlpipe_frame::{RawFrame, END_PREFIX, START};

use crate::checksum;

pub const SERVER_ID: [u8; 10] = [0x0a, 0x01, 0x4c, 0x47, 0x5a, 0x00, 0x03, 0x40, 0x11, 0x22];

pub fn octets(data: &[u8]) -> Vec<u8> {
    assert!(data.len() < 15, "test builder only emits short octet strings");
    let mut v = vec![data.len() as u8 + 1];
    v.extend_from_slice(data);
    v
}

pub fn list(n: usize) -> u8 {
    assert!(n < 16);
    0x70 | n as u8
}

pub fn uint8(v: u8) -> [u8; 2] {
    [0x62, v]
}

pub fn uint16(v: u16) -> [u8; 3] {
    let [hi, lo] = v.to_be_bytes();
    [0x63, hi, lo]
}

pub fn int8(v: i8) -> [u8; 2] {
    [0x52, v as u8]
}

pub fn int64(v: i64) -> Vec<u8> {
    let mut out = vec![0x59];
    out.extend_from_slice(&v.to_be_bytes());
    out
}

/// A complete message: 6-field list wrapping a `[tag, body]` choice.
pub fn message(tx: &[u8], tag: u16, body: &[u8]) -> Vec<u8> {
    let mut v = vec![list(6)];
    v.extend(octets(tx));
    v.extend(uint8(0));
    v.extend(uint8(0));
    v.push(list(2));
    v.extend(uint16(tag));
    v.extend_from_slice(body);
    v.extend(uint16(0));
    v.push(0x00);
    v
}

pub fn open_response(tx: &[u8]) -> Vec<u8> {
    let mut body = vec![list(6)];
    body.extend([0x01; 6]);
    message(tx, 0x0101, &body)
}

pub fn close_response(tx: &[u8]) -> Vec<u8> {
    message(tx, 0x0201, &[list(1), 0x01])
}

/// GetListResponse with `(objName, unit, scaler, value)` entries.
pub fn get_list_response(tx: &[u8], entries: &[([u8; 6], Option<u8>, i8, i64)]) -> Vec<u8> {
    let mut body = vec![list(7), 0x01];
    body.extend(octets(&SERVER_ID));
    body.extend([0x01, 0x01]);
    body.push(list(entries.len()));
    for (code, unit, scaler, value) in entries {
        body.push(list(7));
        body.extend(octets(code));
        body.extend([0x01, 0x01]);
        match unit {
            Some(u) => body.extend(uint8(*u)),
            None => body.push(0x01),
        }
        body.extend(int8(*scaler));
        body.extend(int64(*value));
        body.push(0x01);
    }
    body.extend([0x01, 0x01]);
    message(tx, 0x0701, &body)
}

/// Wrap a message list into a transport frame with padding and checksum.
pub fn frame_bytes(messages: &[u8]) -> Vec<u8> {
    let padding = (4 - messages.len() % 4) % 4;
    let mut v = START.to_vec();
    v.extend_from_slice(messages);
    v.extend(std::iter::repeat(0x00).take(padding));
    v.extend_from_slice(&END_PREFIX);
    v.push(padding as u8);
    let crc = checksum::crc16(&v);
    v.extend(checksum::to_wire(crc));
    v
}

pub fn frame(messages: &[u8]) -> RawFrame {
    RawFrame::new(frame_bytes(messages)).expect("builder emits valid frames")
}

/// The usual meter push: open, readings, close.
pub fn meter_frame(entries: &[([u8; 6], Option<u8>, i8, i64)]) -> RawFrame {
    let mut payload = open_response(b"\x01");
    payload.extend(get_list_response(b"\x02", entries));
    payload.extend(close_response(b"\x03"));
    frame(&payload)
}
