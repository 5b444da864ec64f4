//! Counter-based one-time passwords (RFC 4226), over HMAC-SHA256.

use log::debug;

use crate::hmac::{compute_hmac, Digest};
use crate::platform::Platform;
use crate::{Error, Result};

/// Longest code whose modulus still fits in 32 bits.
pub const MAX_DIGITS: u32 = 9;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Contains a one-time password
pub struct Otp {
    value: u32,
    digits: u32,
}

impl Otp {
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

/// OTP codes are presented as left-zero-padded strings of exactly `digits` characters
impl core::fmt::Display for Otp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:0width$}", self.value, width = self.digits as usize)
    }
}

/// The HOTP moving factor: the counter, most significant byte first.
pub fn moving_factor(counter: u64) -> [u8; 8] {
    counter.to_be_bytes()
}

/// Dynamic truncation of an HMAC-SHA256 digest to a `digits`-digit code.
pub fn truncate(digest: &Digest, digits: u32) -> Result<Otp> {
    if digits == 0 || digits > MAX_DIGITS {
        return Err(Error::InvalidDigits(digits));
    }
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let truncated = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    Ok(Otp { value: truncated % 10u32.pow(digits), digits })
}

/// Derives the code for `counter` from `secret`.
///
/// Must not be called for an unconfigured slot: an empty `secret` is refused
/// by the accelerator.
pub fn generate_code(platform: &mut Platform, secret: &[u8], counter: u64, digits: u32) -> Result<Otp> {
    if digits == 0 || digits > MAX_DIGITS {
        return Err(Error::InvalidDigits(digits));
    }
    let digest = compute_hmac(platform, secret, &moving_factor(counter))?;
    let otp = truncate(&digest, digits)?;
    debug!("calculated OTP for counter {}: {}", counter, otp);
    Ok(otp)
}
