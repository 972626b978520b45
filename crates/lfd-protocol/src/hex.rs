//! Hex-expanded byte encoding
//!
//! The wire format never carries logical values directly. Every logical byte
//! is expanded into the ASCII codes of its two uppercase hex digits, so the
//! logical byte `0x1A` travels as `b"1A"` (`[0x31, 0x41]`) and a 16-bit value
//! takes four characters, most significant digit first. Displays emit
//! uppercase digits but some firmware revisions answer in lowercase, so
//! decoding accepts both cases.

use crate::error::ParseError;

const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Expand one logical byte into its two hex characters.
pub fn encode_byte(value: u8) -> [u8; 2] {
    [DIGITS[(value >> 4) as usize], DIGITS[(value & 0x0F) as usize]]
}

/// Expand a 16-bit value into four hex characters, most significant first.
pub fn encode_u16(value: u16) -> [u8; 4] {
    let hi = encode_byte((value >> 8) as u8);
    let lo = encode_byte(value as u8);
    [hi[0], hi[1], lo[0], lo[1]]
}

/// Decode a single hex character.
pub fn decode_digit(ch: u8) -> Result<u8, ParseError> {
    match ch {
        b'0'..=b'9' => Ok(ch - b'0'),
        b'A'..=b'F' => Ok(ch - b'A' + 10),
        b'a'..=b'f' => Ok(ch - b'a' + 10),
        other => Err(ParseError::InvalidHexDigit(other)),
    }
}

/// Decode the two characters forming one logical byte.
pub fn decode_pair(hi: u8, lo: u8) -> Result<u8, ParseError> {
    Ok((decode_digit(hi)? << 4) | decode_digit(lo)?)
}

/// Decode the logical byte whose two characters start at `offset` in `buf`.
pub fn decode_byte(buf: &[u8], offset: usize) -> Result<u8, ParseError> {
    if buf.len() < offset + 2 {
        return Err(ParseError::Incomplete {
            needed: offset + 2 - buf.len(),
        });
    }
    decode_pair(buf[offset], buf[offset + 1])
}

/// Decode the 16-bit value whose four characters start at `offset` in `buf`.
pub fn decode_u16(buf: &[u8], offset: usize) -> Result<u16, ParseError> {
    if buf.len() < offset + 4 {
        return Err(ParseError::Incomplete {
            needed: offset + 4 - buf.len(),
        });
    }
    let hi = decode_pair(buf[offset], buf[offset + 1])?;
    let lo = decode_pair(buf[offset + 2], buf[offset + 3])?;
    Ok(u16::from_be_bytes([hi, lo]))
}
