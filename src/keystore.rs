//! Persistence of credentials in the key-value store, one record per slot.

use log::{debug, error, info};

use crate::credential::{storage_key, Credential, NUM_SLOTS, RECORD_SIZE};
use crate::platform::{ErrorCode, Platform};
use crate::sync::kv;
use crate::{Error, Result};

/// Credentials as found in storage at boot.
#[derive(Clone, Debug)]
pub struct Restored {
    pub credentials: [Credential; NUM_SLOTS],
    /// Slots that held no valid record and were written back blank.
    pub formatted: Vec<usize>,
}

/// Reads the credential of `slot`.
///
/// A record that is missing or of the wrong size means "not configured" and
/// is reported as `Ok(None)`; any other storage error is returned.
pub fn load(platform: &mut Platform, slot: usize) -> Result<Option<Credential>> {
    if slot >= NUM_SLOTS {
        return Err(Error::InvalidSlot(slot));
    }
    match kv::get(platform, storage_key(slot).as_bytes(), RECORD_SIZE) {
        Ok((record, _)) => Ok(Credential::from_record(slot, &record)),
        Err(err) if kv::is_missing(&err) => Ok(None),
        Err(Error::StorageFailure(ErrorCode::Size)) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Loads every slot, formatting the ones without a valid record.
///
/// Read errors are not fatal: the slot is treated as blank and a blank record
/// is written back so that subsequent boots find well-formed storage.
pub fn load_all(platform: &mut Platform) -> Restored {
    let mut formatted = Vec::new();
    let credentials = core::array::from_fn(|slot| match load(platform, slot) {
        Ok(Some(credential)) => {
            debug!("slot {} restored (counter {})", slot, credential.counter());
            credential
        }
        outcome => {
            if let Err(err) = outcome {
                error!("reading slot {}: {}", slot, err);
            }
            info!("formatting slot {}", slot);
            let blank = Credential::blank(slot);
            if let Err(err) = save(platform, slot, &blank) {
                error!("could not store blank slot {}: {}", slot, err);
            }
            formatted.push(slot);
            blank
        }
    });
    Restored { credentials, formatted }
}

/// Writes `credential` as the record of `slot`.
pub fn save(platform: &mut Platform, slot: usize, credential: &Credential) -> Result<()> {
    kv::set(platform, storage_key(slot).as_bytes(), &credential.to_record())
}
