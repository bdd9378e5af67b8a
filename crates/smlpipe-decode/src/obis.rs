//! OBIS object identifiers.
//!
//! An OBIS code names a measured quantity with six value groups
//! `A-B:C.D.E*F`, e.g. `1-0:1.8.0*255` for total imported active energy.
//! SML carries it as 6 raw bytes; configuration writes it as 12 hex digits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 6-byte OBIS code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObisCode(pub [u8; 6]);

/// Error returned when a string is not 12 hex digits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid OBIS code {0:?} (expected 12 hex digits)")]
pub struct ParseObisError(pub String);

impl ObisCode {
    /// Total imported active energy (`1-0:1.8.0*255`).
    pub const ENERGY_IMPORT_TOTAL: ObisCode = ObisCode([0x01, 0x00, 0x01, 0x08, 0x00, 0xff]);
    /// Total exported active energy (`1-0:2.8.0*255`).
    pub const ENERGY_EXPORT_TOTAL: ObisCode = ObisCode([0x01, 0x00, 0x02, 0x08, 0x00, 0xff]);
    /// Current active power (`1-0:16.7.0*255`).
    pub const ACTIVE_POWER: ObisCode = ObisCode([0x01, 0x00, 0x10, 0x07, 0x00, 0xff]);

    /// Build a code from its SML octet string. Returns `None` unless the
    /// slice is exactly 6 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// Raw value groups.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Reduced form `C.D.E`, e.g. `1.8.0`.
    pub fn short(&self) -> String {
        let [_, _, c, d, e, _] = self.0;
        format!("{c}.{d}.{e}")
    }
}

impl fmt::Display for ObisCode {
    /// `0100010800ff`, or `1-0:1.8.0*255` with the alternate flag (`{:#}`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        if f.alternate() {
            write!(f, "{a}-{b}:{c}.{d}.{e}*{g}")
        } else {
            write!(f, "{a:02x}{b:02x}{c:02x}{d:02x}{e:02x}{g:02x}")
        }
    }
}

impl FromStr for ObisCode {
    type Err = ParseObisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseObisError(s.to_string());
        if s.len() != 12 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        let mut out = [0u8; 6];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| err())?;
        }
        Ok(Self(out))
    }
}

impl Serialize for ObisCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObisCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Human-readable name for well-known codes.
pub fn describe(code: &ObisCode) -> Option<&'static str> {
    let name = match code.0 {
        [0x01, 0x00, 0x00, 0x00, 0x09, 0xff] => "Device ID",
        [0x01, 0x00, 0x01, 0x08, 0x00, 0xff] => "Positive active energy, total",
        [0x01, 0x00, 0x01, 0x08, 0x01, 0xff] => "Positive active energy, tariff 1",
        [0x01, 0x00, 0x01, 0x08, 0x02, 0xff] => "Positive active energy, tariff 2",
        [0x01, 0x00, 0x02, 0x08, 0x00, 0xff] => "Negative active energy, total",
        [0x01, 0x00, 0x02, 0x08, 0x01, 0xff] => "Negative active energy, tariff 1",
        [0x01, 0x00, 0x02, 0x08, 0x02, 0xff] => "Negative active energy, tariff 2",
        [0x01, 0x00, 0x10, 0x07, 0x00, 0xff] => "Sum active instantaneous power",
        [0x01, 0x00, 0x24, 0x07, 0x00, 0xff] => "Active instantaneous power L1",
        [0x01, 0x00, 0x38, 0x07, 0x00, 0xff] => "Active instantaneous power L2",
        [0x01, 0x00, 0x4c, 0x07, 0x00, 0xff] => "Active instantaneous power L3",
        [0x01, 0x00, 0x60, 0x32, 0x01, 0x01] => "Manufacturer ID",
        [0x81, 0x81, 0xc7, 0x82, 0x03, 0xff] => "Manufacturer ID",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let code: ObisCode = "0100010800ff".parse().unwrap();
        assert_eq!(code, ObisCode::ENERGY_IMPORT_TOTAL);
        assert_eq!(code.to_string(), "0100010800ff");
        assert_eq!(format!("{code:#}"), "1-0:1.8.0*255");
        assert_eq!(code.short(), "1.8.0");
    }

    #[test]
    fn parse_accepts_uppercase() {
        let code: ObisCode = "0100100700FF".parse().unwrap();
        assert_eq!(code, ObisCode::ACTIVE_POWER);
        assert_eq!(format!("{code:#}"), "1-0:16.7.0*255");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("0100010800".parse::<ObisCode>().is_err());
        assert!("0100010800fg".parse::<ObisCode>().is_err());
        assert!("01000108000ä".parse::<ObisCode>().is_err());
    }

    #[test]
    fn parse_rejects_sign_characters() {
        assert!("+100010800ff".parse::<ObisCode>().is_err());
        assert!("01+0010800ff".parse::<ObisCode>().is_err());
        assert!("0100-10800ff".parse::<ObisCode>().is_err());
        assert!(" 100010800ff".parse::<ObisCode>().is_err());
    }

    #[test]
    fn from_slice_requires_six_bytes() {
        assert_eq!(
            ObisCode::from_slice(&[1, 0, 2, 8, 0, 255]),
            Some(ObisCode::ENERGY_EXPORT_TOTAL)
        );
        assert_eq!(ObisCode::from_slice(&[1, 0, 2]), None);
    }

    #[test]
    fn serde_uses_hex_string() {
        let json = serde_json::to_string(&ObisCode::ACTIVE_POWER).unwrap();
        assert_eq!(json, "\"0100100700ff\"");

        let back: ObisCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ObisCode::ACTIVE_POWER);
    }

    #[test]
    fn describe_known_codes() {
        assert_eq!(
            describe(&ObisCode::ENERGY_IMPORT_TOTAL),
            Some("Positive active energy, total")
        );
        assert_eq!(describe(&ObisCode([9; 6])), None);
    }
}
