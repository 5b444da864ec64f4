//! Base32 secrets, as typed in by users or found in provisioning URIs.
//!
//! Decoding is forgiving: case, padding and whitespace are ignored, and
//! trailing characters that do not complete a byte are dropped.

use data_encoding::{Encoding, BASE32_NOPAD};
use log::debug;

use crate::{Error, Result};

/// Largest secret a credential slot can hold.
pub const MAX_SECRET_LEN: usize = 64;

fn lenient_base32() -> Result<Encoding> {
    let mut spec = BASE32_NOPAD.specification();
    spec.check_trailing_bits = false;
    spec.encoding().map_err(|_| Error::DecodeFailure)
}

/// Decodes a base32 secret into the raw HOTP key.
pub fn decode(secret: &str) -> Result<Vec<u8>> {
    let mut normalized: Vec<u8> = secret
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b'=')
        .map(|b| b.to_ascii_uppercase())
        .collect();
    // 1, 3 or 6 characters past a full quantum carry no complete byte
    while matches!(normalized.len() % 8, 1 | 3 | 6) {
        normalized.pop();
    }

    let key = lenient_base32()?.decode(&normalized).map_err(|err| {
        debug!("base32: {}", err);
        Error::DecodeFailure
    })?;
    if key.is_empty() || key.len() > MAX_SECRET_LEN {
        return Err(Error::DecodeFailure);
    }
    Ok(key)
}
