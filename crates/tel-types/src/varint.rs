//! Canonical unsigned LEB128.
//!
//! Seven payload bits per byte, least significant group first, high bit set
//! on every byte except the last. Decoders only accept the minimal encoding
//! of a value: a trailing zero group, more bytes than the value width
//! allows, or payload bits beyond that width are all rejected.

use crate::error::VarintError;

/// Maximum encoded length of a `u64`.
pub const MAX_U64_BYTES: usize = 10;

/// Maximum encoded length of a `u32`.
pub const MAX_U32_BYTES: usize = 5;

/// Append the canonical encoding of `value` to `buf`.
pub fn encode_u64(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Encode `value` into a fresh buffer.
pub fn to_vec(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    encode_u64(&mut buf, value);
    buf
}

/// Number of bytes the canonical encoding of `value` occupies.
pub fn encoded_len(value: u64) -> usize {
    let significant_bits = 64 - value.leading_zeros() as usize;
    significant_bits.max(1).div_ceil(7)
}

/// Decode a `u64` from the front of `data`. Returns (value, bytes_consumed).
pub fn decode_u64(data: &[u8]) -> Result<(u64, usize), VarintError> {
    decode_bounded(data, 64)
}

/// Decode a `u32` from the front of `data`. Returns (value, bytes_consumed).
pub fn decode_u32(data: &[u8]) -> Result<(u32, usize), VarintError> {
    let (value, consumed) = decode_bounded(data, 32)?;
    // decode_bounded never lets bits past the 32nd through
    let value = u32::try_from(value).map_err(|_| VarintError::Overflow { bits: 32 })?;
    Ok((value, consumed))
}

fn decode_bounded(data: &[u8], bits: u32) -> Result<(u64, usize), VarintError> {
    let max_bytes = bits.div_ceil(7) as usize;
    let mut value = 0u64;

    for (i, &byte) in data.iter().take(max_bytes).enumerate() {
        let payload = u64::from(byte & 0x7F);
        let shift = 7 * i as u32;
        let last_allowed = i + 1 == max_bytes;

        if last_allowed {
            if byte & 0x80 != 0 {
                return Err(VarintError::Overlong { max_bytes });
            }
            if payload >> (bits - shift) != 0 {
                return Err(VarintError::Overflow { bits });
            }
        }

        value |= payload << shift;

        if byte & 0x80 == 0 {
            if byte == 0 && i > 0 {
                return Err(VarintError::NonMinimal);
            }
            return Ok((value, i + 1));
        }
    }

    Err(VarintError::Truncated)
}
