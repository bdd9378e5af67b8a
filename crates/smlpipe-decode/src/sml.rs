//! SML (Smart Message Language) TL encoding and message structure.
//!
//! Every SML value starts with a type-length field:
//! ```text
//!   bit 7     bits 6..4   bits 3..0
//! ┌─────────┬───────────┬──────────┐
//! │ more TL │ type      │ length   │
//! └─────────┴───────────┴──────────┘
//! type: 000 octet string, 100 bool, 101 signed, 110 unsigned, 111 list
//! ```
//! Scalar lengths count the TL bytes themselves; list lengths count
//! elements. `0x00` ends a message, `0x01` marks an absent optional value.

use crate::error::{DecodeError, Result};

const TYPE_OCTETS: u8 = 0x0;
const TYPE_BOOL: u8 = 0x4;
const TYPE_INT: u8 = 0x5;
const TYPE_UINT: u8 = 0x6;
const TYPE_LIST: u8 = 0x7;

const MAX_DEPTH: usize = 16;
const MAX_TL_BYTES: usize = 4;

/// Message body tags.
const TAG_OPEN_RESPONSE: u32 = 0x0101;
const TAG_CLOSE_RESPONSE: u32 = 0x0201;
const TAG_GET_LIST_RESPONSE: u32 = 0x0701;

/// A decoded SML value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmlValue {
    EndOfMessage,
    Absent,
    Octets(Vec<u8>),
    Bool(bool),
    Int(i64),
    UInt(u64),
    List(Vec<SmlValue>),
}

impl SmlValue {
    /// Numeric value as signed integer, if it is one and fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SmlValue::Int(v) => Some(*v),
            SmlValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Numeric value as unsigned integer, if it is one and fits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SmlValue::UInt(v) => Some(*v),
            SmlValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_octets(&self) -> Option<&[u8]> {
        match self {
            SmlValue::Octets(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SmlValue]> {
        match self {
            SmlValue::List(v) => Some(v),
            _ => None,
        }
    }
}

/// Cursor over TL-encoded bytes.
pub struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Parse the next value, recursing into lists.
    pub fn parse_value(&mut self) -> Result<SmlValue> {
        self.parse_value_at(0)
    }

    fn parse_value_at(&mut self, depth: usize) -> Result<SmlValue> {
        if depth > MAX_DEPTH {
            return Err(malformed("list nesting too deep"));
        }

        match self.peek() {
            None => return Err(DecodeError::IncompleteMessage),
            Some(0x00) => {
                self.pos += 1;
                return Ok(SmlValue::EndOfMessage);
            }
            Some(0x01) => {
                self.pos += 1;
                return Ok(SmlValue::Absent);
            }
            Some(_) => {}
        }

        let (kind, len, tl_len) = self.read_tl()?;
        if kind == TYPE_LIST {
            let mut items = Vec::with_capacity(len.min(64));
            for _ in 0..len {
                items.push(self.parse_value_at(depth + 1)?);
            }
            return Ok(SmlValue::List(items));
        }

        let data_len = len
            .checked_sub(tl_len)
            .ok_or_else(|| malformed(format!("length {len} shorter than its TL field")))?;
        let data = self.take(data_len)?;

        match kind {
            TYPE_OCTETS => Ok(SmlValue::Octets(data.to_vec())),
            TYPE_BOOL => match data {
                [b] => Ok(SmlValue::Bool(*b != 0)),
                _ => Err(malformed(format!("bool of {data_len} bytes"))),
            },
            TYPE_INT => {
                check_int_len(data_len)?;
                let init: i64 = if data[0] & 0x80 != 0 { -1 } else { 0 };
                Ok(SmlValue::Int(
                    data.iter().fold(init, |acc, b| (acc << 8) | i64::from(*b)),
                ))
            }
            TYPE_UINT => {
                check_int_len(data_len)?;
                Ok(SmlValue::UInt(
                    data.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
                ))
            }
            other => Err(malformed(format!("unknown TL type {other:#x}"))),
        }
    }

    /// Returns `(type, length, number of TL bytes)`.
    fn read_tl(&mut self) -> Result<(u8, usize, usize)> {
        let first = self.next_byte()?;
        let kind = (first >> 4) & 0x07;
        let mut len = usize::from(first & 0x0f);
        let mut tl_len = 1;
        let mut more = first & 0x80 != 0;

        while more {
            let b = self.next_byte()?;
            if b & 0x70 != 0 {
                return Err(malformed("invalid TL continuation byte"));
            }
            tl_len += 1;
            if tl_len > MAX_TL_BYTES {
                return Err(malformed("TL field too long"));
            }
            more = b & 0x80 != 0;
            len = (len << 4) | usize::from(b & 0x0f);
        }

        Ok((kind, len, tl_len))
    }

    fn next_byte(&mut self) -> Result<u8> {
        let b = self.peek().ok_or(DecodeError::IncompleteMessage)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::IncompleteMessage)?;
        let slice = self.buf.get(self.pos..end).ok_or(DecodeError::IncompleteMessage)?;
        self.pos = end;
        Ok(slice)
    }
}

fn check_int_len(n: usize) -> Result<()> {
    if (1..=8).contains(&n) {
        Ok(())
    } else {
        Err(malformed(format!("integer of {n} bytes")))
    }
}

fn malformed(msg: impl Into<String>) -> DecodeError {
    DecodeError::MalformedPayload(msg.into())
}

/// One SML message: transaction id plus body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmlMessage {
    pub transaction_id: Vec<u8>,
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    OpenResponse,
    CloseResponse,
    GetListResponse(GetListResponse),
    /// Any body this crate does not interpret, by tag.
    Other(u32),
}

/// The body that carries meter readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetListResponse {
    pub server_id: Option<Vec<u8>>,
    pub entries: Vec<ListEntry>,
}

/// One `valList` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub obj_name: Vec<u8>,
    pub unit: Option<u8>,
    pub scaler: Option<i8>,
    pub value: SmlValue,
}

impl SmlMessage {
    /// Interpret a parsed top-level value as a message.
    pub fn from_value(value: SmlValue) -> Result<Self> {
        let SmlValue::List(mut fields) = value else {
            return Err(malformed("message is not a list"));
        };
        if fields.len() != 6 {
            return Err(malformed(format!("message has {} fields, expected 6", fields.len())));
        }
        if fields[5] != SmlValue::EndOfMessage {
            return Err(malformed("missing end-of-message marker"));
        }

        let transaction_id = fields[0].as_octets().unwrap_or_default().to_vec();
        let body = std::mem::replace(&mut fields[3], SmlValue::Absent);
        let SmlValue::List(body) = body else {
            return Err(malformed("message body is not a list"));
        };
        let [tag, choice]: [SmlValue; 2] = body
            .try_into()
            .map_err(|_| malformed("message body must have 2 fields"))?;
        let tag = tag
            .as_u64()
            .and_then(|t| u32::try_from(t).ok())
            .ok_or_else(|| malformed("message body tag is not an integer"))?;

        let body = match tag {
            TAG_OPEN_RESPONSE => MessageBody::OpenResponse,
            TAG_CLOSE_RESPONSE => MessageBody::CloseResponse,
            TAG_GET_LIST_RESPONSE => MessageBody::GetListResponse(GetListResponse::from_value(choice)?),
            other => MessageBody::Other(other),
        };

        Ok(Self {
            transaction_id,
            body,
        })
    }
}

impl GetListResponse {
    fn from_value(value: SmlValue) -> Result<Self> {
        let SmlValue::List(fields) = value else {
            return Err(malformed("GetListResponse is not a list"));
        };
        if fields.len() != 7 {
            return Err(malformed(format!(
                "GetListResponse has {} fields, expected 7",
                fields.len()
            )));
        }

        let server_id = fields[1].as_octets().map(<[u8]>::to_vec);
        let entries = fields[4]
            .as_list()
            .ok_or_else(|| malformed("valList is not a list"))?
            .iter()
            .map(ListEntry::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { server_id, entries })
    }
}

impl ListEntry {
    fn from_value(value: &SmlValue) -> Result<Self> {
        let fields = value
            .as_list()
            .filter(|f| f.len() == 7)
            .ok_or_else(|| malformed("valList entry must be a list of 7"))?;

        let obj_name = fields[0]
            .as_octets()
            .ok_or_else(|| malformed("objName is not an octet string"))?
            .to_vec();
        let unit = fields[3].as_u64().and_then(|u| u8::try_from(u).ok());
        let scaler = fields[4].as_i64().and_then(|s| i8::try_from(s).ok());

        Ok(Self {
            obj_name,
            unit,
            scaler,
            value: fields[5].clone(),
        })
    }
}

/// Parse all messages in an SML payload. Zero bytes between or after
/// messages are padding.
pub fn parse_messages(payload: &[u8]) -> Result<Vec<SmlMessage>> {
    let mut parser = Parser::new(payload);
    let mut messages = Vec::new();

    while let Some(b) = parser.peek() {
        if b == 0x00 {
            parser.pos += 1;
            continue;
        }
        let value = parser.parse_value()?;
        messages.push(SmlMessage::from_value(value)?);
    }

    Ok(messages)
}
