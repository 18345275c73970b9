//! Script number codec.
//!
//! Script numbers are little-endian sign-magnitude: the top bit of the last
//! byte is the sign. Two encodings are used by covenants:
//!
//! - minimal (`encode`/`decode`), used for pushed numbers such as Rabin
//!   public keys and unlocking arguments;
//! - fixed width (`num2bin`/`bin2num`), used for state fields that must keep
//!   a load-bearing byte width, such as the 32-byte token amount.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};

use crate::ScriptError;

/// Encode a number minimally. Zero encodes as the empty byte string.
pub fn encode(val: &BigInt) -> Vec<u8> {
    if val.is_zero() {
        return Vec::new();
    }
    let negative = val.is_negative();
    let (_, mut bytes) = val.abs().to_bytes_le();
    let last = bytes.len() - 1;
    if bytes[last] & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        bytes[last] |= 0x80;
    }
    bytes
}

/// Decode a script number of at most `max_len` bytes.
///
/// # Arguments
/// * `bytes` - The encoded number.
/// * `max_len` - Maximum accepted byte length.
/// * `require_minimal` - Reject encodings with a redundant trailing byte.
pub fn decode(bytes: &[u8], max_len: usize, require_minimal: bool) -> Result<BigInt, ScriptError> {
    if bytes.len() > max_len {
        return Err(ScriptError::NumberTooBig {
            value: hex::encode(bytes),
            size: max_len,
        });
    }
    if require_minimal {
        check_minimal(bytes)?;
    }
    Ok(bin2num(bytes))
}

/// Decode a sign-magnitude number of any width, tolerating padding bytes.
pub fn bin2num(bytes: &[u8]) -> BigInt {
    let Some((&last, _)) = bytes.split_last() else {
        return BigInt::zero();
    };
    let mut magnitude = bytes.to_vec();
    let end = magnitude.len() - 1;
    magnitude[end] = last & 0x7f;
    let value = BigInt::from_bytes_le(Sign::Plus, &magnitude);
    if last & 0x80 != 0 {
        -value
    } else {
        value
    }
}

/// Encode a number into exactly `size` bytes, sign-magnitude little-endian.
///
/// # Returns
/// The padded encoding, or `NumberTooBig` if the number needs more bytes.
pub fn num2bin(val: &BigInt, size: usize) -> Result<Vec<u8>, ScriptError> {
    let too_big = || ScriptError::NumberTooBig {
        value: val.to_string(),
        size,
    };
    if val.is_zero() {
        return Ok(vec![0u8; size]);
    }
    let (_, mut magnitude) = val.abs().to_bytes_le();
    // The sign bit needs a clear top bit in the last byte.
    let needs_extra = magnitude[magnitude.len() - 1] & 0x80 != 0;
    if magnitude.len() + needs_extra as usize > size {
        return Err(too_big());
    }
    magnitude.resize(size, 0);
    if val.is_negative() {
        magnitude[size - 1] |= 0x80;
    }
    Ok(magnitude)
}

/// Check that a script number uses no redundant trailing byte.
pub fn check_minimal(bytes: &[u8]) -> Result<(), ScriptError> {
    let Some((&last, rest)) = bytes.split_last() else {
        return Ok(());
    };
    if last & 0x7f == 0 && rest.last().map_or(true, |b| b & 0x80 == 0) {
        return Err(ScriptError::NonMinimalNumber(hex::encode(bytes)));
    }
    Ok(())
}
