//! Hex quantity and data parsing for JSON-RPC payloads.
//!
//! Quantities are `0x`-prefixed, big-endian, without leading zeros (though
//! leading zeros are tolerated here). Data is `0x`-prefixed with an even
//! number of hex digits.

use chainwatch_core::WatchError;

fn strip_prefix<'a>(field: &str, s: &'a str) -> Result<&'a str, WatchError> {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| WatchError::Decode(format!("{field}: missing 0x prefix in {s:?}")))
}

/// Parse a quantity that must fit in a `u64`.
pub fn parse_u64(field: &str, s: &str) -> Result<u64, WatchError> {
    let digits = strip_prefix(field, s)?;
    if digits.is_empty() {
        return Err(WatchError::Decode(format!("{field}: empty quantity")));
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.len() > 16 {
        return Err(WatchError::Decode(format!("{field}: {s} overflows u64")));
    }
    if trimmed.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(trimmed, 16).map_err(|e| WatchError::Decode(format!("{field}: {e}")))
}

/// Parse a quantity of at most 256 bits into minimal big-endian bytes.
/// Zero becomes the empty slice, which is how RLP encodes it.
pub fn parse_quantity(field: &str, s: &str) -> Result<Vec<u8>, WatchError> {
    let digits = strip_prefix(field, s)?;
    if digits.is_empty() {
        return Err(WatchError::Decode(format!("{field}: empty quantity")));
    }
    let trimmed = digits.trim_start_matches('0');
    if trimmed.len() > 64 {
        return Err(WatchError::Decode(format!("{field}: {s} exceeds 256 bits")));
    }
    let padded = if trimmed.len() % 2 == 1 {
        format!("0{trimmed}")
    } else {
        trimmed.to_string()
    };
    hex::decode(padded).map_err(|e| WatchError::Decode(format!("{field}: {e}")))
}

/// Parse a quantity into a 32-byte left-padded word (signature `r` / `s`).
pub fn parse_word(field: &str, s: &str) -> Result<[u8; 32], WatchError> {
    let bytes = parse_quantity(field, s)?;
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

/// Parse arbitrary-length data.
pub fn parse_data(field: &str, s: &str) -> Result<Vec<u8>, WatchError> {
    let digits = strip_prefix(field, s)?;
    hex::decode(digits).map_err(|e| WatchError::Decode(format!("{field}: {e}")))
}

/// Parse data that must be exactly `N` bytes (addresses, hashes).
pub fn parse_fixed<const N: usize>(field: &str, s: &str) -> Result<[u8; N], WatchError> {
    let bytes = parse_data(field, s)?;
    <[u8; N]>::try_from(bytes.as_slice())
        .map_err(|_| WatchError::Decode(format!("{field}: expected {N} bytes, got {}", bytes.len())))
}
