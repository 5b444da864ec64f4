//! Blocking HMAC-SHA256 on top of the keyed-hash accelerator.

use delog::hex_str;
use log::{debug, warn};

use crate::platform::hmac::{HmacAlgorithm, SHA256_LEN};
use crate::platform::{ErrorCode, Platform};
use crate::sync::{self, Scope, UpcallArgs};
use crate::{Error, Result};

pub type Digest = [u8; SHA256_LEN];

fn release(platform: &mut Platform) {
    let hmac = &mut platform.hmac;
    let _ = hmac.allow_data(Vec::new());
    let _ = hmac.allow_destination(Vec::new());
    let _ = hmac.allow_key(Vec::new());
    hmac.subscribe(None);
}

/// Computes HMAC-SHA256 of `message` under `key`.
///
/// The key, message and destination are shared with the driver only for the
/// duration of the call. Any stage the driver rejects aborts the remaining
/// ones and its error is returned; nothing is retried.
pub fn compute_hmac(platform: &mut Platform, key: &[u8], message: &[u8]) -> Result<Digest> {
    let args = UpcallArgs::default();
    let mut scope = Scope::new(platform, release);
    sync::await_upcall(&mut scope, |platform, fired| {
        platform.hmac.subscribe(Some(fired.recorder(&args)));
        platform.hmac.allow_key(key.to_vec())?;
        platform.hmac.allow_destination(vec![0; SHA256_LEN])?;
        platform.hmac.allow_data(message.to_vec())?;
        platform.hmac.set_algorithm(HmacAlgorithm::Sha256 as u32)?;
        platform.hmac.run().map_err(|code| {
            warn!("HMAC failure: {}", code.code());
            code
        })?;
        Ok(())
    })?;

    let destination = scope.hmac.allow_destination(Vec::new())?;
    let len = sync::completion(args.get())?;
    if len != SHA256_LEN || destination.len() < SHA256_LEN {
        return Err(Error::DriverRejected(ErrorCode::Size));
    }
    let mut digest = [0u8; SHA256_LEN];
    digest.copy_from_slice(&destination[..SHA256_LEN]);
    debug!("hmac: {}", hex_str!(&digest, 4));
    Ok(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::platform;

    // RFC 4231, test case 2
    #[test]
    fn rfc4231_vector() {
        let mut platform = platform("");
        let digest = compute_hmac(&mut platform, b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            digest[..8],
            [0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e],
        );
        assert_eq!(digest[28..], [0x64, 0xec, 0x38, 0x43]);
        assert!(!platform.hmac.is_exposed());
    }

    #[test]
    fn rejected_run_releases_everything() {
        let mut platform = platform("");
        let oversized = [0x42u8; 65];
        assert_eq!(
            compute_hmac(&mut platform, &oversized, b"message"),
            Err(Error::DriverRejected(ErrorCode::Size)),
        );
        assert!(!platform.hmac.is_exposed());
        assert_eq!(platform.hmac.runs(), 0);
    }

    #[test]
    fn empty_key_is_refused_and_released() {
        let mut platform = platform("");
        assert_eq!(compute_hmac(&mut platform, &[], b"message"), Err(Error::DriverRejected(ErrorCode::Reserve)));
        assert!(!platform.hmac.is_exposed());
    }
}
