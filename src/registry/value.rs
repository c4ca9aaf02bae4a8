// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

//! Registry value type tags and payload codecs.
//!
//! Decoders take the raw payload as stored (UTF-16LE strings, little-endian
//! integers, 16-byte GUID blobs). Undersized payloads are decode failures,
//! never zero-padded; oversized payloads decode from their first N bytes.

use uuid::Uuid;

/// Raw REG_* type codes.
const REG_NONE: u32 = 0;
const REG_SZ: u32 = 1;
const REG_EXPAND_SZ: u32 = 2;
const REG_BINARY: u32 = 3;
const REG_DWORD: u32 = 4;
const REG_QWORD: u32 = 11;

/// Type tag of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Absent value (only produced by the suppressing read shapes).
    None,
    Str,
    ExpandStr,
    Binary,
    U32,
    U64,
    Other(u32),
}

impl ValueKind {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            REG_NONE => ValueKind::None,
            REG_SZ => ValueKind::Str,
            REG_EXPAND_SZ => ValueKind::ExpandStr,
            REG_BINARY => ValueKind::Binary,
            REG_DWORD => ValueKind::U32,
            REG_QWORD => ValueKind::U64,
            other => ValueKind::Other(other),
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            ValueKind::None => REG_NONE,
            ValueKind::Str => REG_SZ,
            ValueKind::ExpandStr => REG_EXPAND_SZ,
            ValueKind::Binary => REG_BINARY,
            ValueKind::U32 => REG_DWORD,
            ValueKind::U64 => REG_QWORD,
            ValueKind::Other(raw) => raw,
        }
    }

    pub fn label(self) -> String {
        match self {
            ValueKind::None => "REG_NONE".to_string(),
            ValueKind::Str => "REG_SZ".to_string(),
            ValueKind::ExpandStr => "REG_EXPAND_SZ".to_string(),
            ValueKind::Binary => "REG_BINARY".to_string(),
            ValueKind::U32 => "REG_DWORD".to_string(),
            ValueKind::U64 => "REG_QWORD".to_string(),
            ValueKind::Other(raw) => format!("REG_?({raw})"),
        }
    }
}

/// Decode a UTF-16LE string payload. The payload is defensively
/// NUL-terminated at its last code unit: platform data is allowed to lack
/// a terminator, and must never be read past its end.
pub fn decode_string(data: &[u8]) -> Result<String, &'static str> {
    let units = data.len() / 2;
    if units == 0 {
        return Err("empty string buffer");
    }
    let mut wide: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    if let Some(last) = wide.last_mut() {
        *last = 0;
    }
    let end = wide.iter().position(|&u| u == 0).unwrap_or(wide.len());
    Ok(String::from_utf16_lossy(&wide[..end]))
}

pub fn decode_u32(data: &[u8]) -> Result<u32, &'static str> {
    if data.len() < 4 {
        return Err("undersized DWORD buffer");
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[..4]);
    Ok(u32::from_le_bytes(bytes))
}

pub fn decode_u64(data: &[u8]) -> Result<u64, &'static str> {
    if data.len() < 8 {
        return Err("undersized QWORD buffer");
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[..8]);
    Ok(u64::from_le_bytes(bytes))
}

/// Decode a 16-byte GUID blob (stored in Windows mixed-endian layout).
pub fn decode_guid(data: &[u8]) -> Result<Uuid, &'static str> {
    if data.len() < 16 {
        return Err("undersized GUID buffer");
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&data[..16]);
    Ok(Uuid::from_bytes_le(bytes))
}

/// Encode a string as UTF-16LE with a trailing NUL, as `REG_SZ` stores it.
pub fn encode_string(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(|u| u.to_le_bytes())
        .collect()
}

pub fn encode_u32(value: u32) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_roundtrip() {
        let data = encode_string("hello");
        assert_eq!(decode_string(&data).unwrap(), "hello");
    }

    #[test]
    fn string_empty_payload_fails() {
        assert_eq!(decode_string(&[]), Err("empty string buffer"));
        // A single stray byte is shorter than one code unit.
        assert_eq!(decode_string(&[0x41]), Err("empty string buffer"));
    }

    #[test]
    fn string_without_terminator_is_tolerated() {
        // "hi" stored without the trailing NUL; the last unit is clobbered
        // to terminate, so only "h" survives.
        let data: Vec<u8> = "hi".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        assert_eq!(decode_string(&data).unwrap(), "h");
    }

    #[test]
    fn string_embedded_nul_truncates() {
        let mut data = encode_string("ab");
        // Overwrite 'a' with NUL: decode stops there.
        data[0] = 0;
        data[1] = 0;
        assert_eq!(decode_string(&data).unwrap(), "");
    }

    #[test]
    fn u32_exact_and_oversized() {
        assert_eq!(decode_u32(&42u32.to_le_bytes()).unwrap(), 42);
        let mut long = 42u32.to_le_bytes().to_vec();
        long.extend_from_slice(&[0xFF; 4]);
        assert_eq!(decode_u32(&long).unwrap(), 42);
    }

    #[test]
    fn u32_undersized_fails() {
        assert!(decode_u32(&[1, 2, 3]).is_err());
    }

    #[test]
    fn u64_undersized_fails() {
        assert!(decode_u64(&[0; 7]).is_err());
    }

    #[test]
    fn guid_sizes() {
        let guid = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let bytes = guid.to_bytes_le();
        assert_eq!(decode_guid(&bytes).unwrap(), guid);
        assert!(decode_guid(&bytes[..15]).is_err());
        let mut long = bytes.to_vec();
        long.push(0xEE);
        assert_eq!(decode_guid(&long).unwrap(), guid);
    }

    #[test]
    fn kind_raw_roundtrip() {
        for kind in [
            ValueKind::None,
            ValueKind::Str,
            ValueKind::ExpandStr,
            ValueKind::Binary,
            ValueKind::U32,
            ValueKind::U64,
            ValueKind::Other(77),
        ] {
            assert_eq!(ValueKind::from_raw(kind.raw()), kind);
        }
    }
}
