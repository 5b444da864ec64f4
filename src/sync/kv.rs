use super::{Scope, UpcallArgs};
use crate::platform::{ErrorCode, Platform};
use crate::{Error, Result};

fn release(platform: &mut Platform) {
    let kv = &mut platform.kv;
    let _ = kv.allow_destination(Vec::new());
    let _ = kv.allow_value(Vec::new());
    let _ = kv.allow_key(Vec::new());
    kv.subscribe(None);
}

fn storage(err: Error) -> Error {
    match err {
        Error::DriverRejected(code) => Error::StorageFailure(code),
        other => other,
    }
}

/// Reads at most `max_len` bytes of the value stored under `key`.
///
/// Returns the bytes read and the full length of the stored value. A value
/// longer than `max_len` is reported as `StorageFailure(Size)`.
pub fn get(platform: &mut Platform, key: &[u8], max_len: usize) -> Result<(Vec<u8>, usize)> {
    let args = UpcallArgs::default();
    let mut scope = Scope::new(platform, release);
    super::await_upcall(&mut scope, |platform, fired| {
        platform.kv.subscribe(Some(fired.recorder(&args)));
        platform.kv.allow_key(key.to_vec())?;
        platform.kv.allow_destination(vec![0; max_len])?;
        platform.kv.get()?;
        Ok(())
    })
    .map_err(storage)?;

    let mut value = scope.kv.allow_destination(Vec::new()).map_err(Error::StorageFailure)?;
    let len = super::completion(args.get()).map_err(Error::StorageFailure)?;
    value.truncate(len);
    Ok((value, len))
}

/// Stores `value` under `key`, replacing any previous value.
pub fn set(platform: &mut Platform, key: &[u8], value: &[u8]) -> Result<()> {
    let args = UpcallArgs::default();
    let mut scope = Scope::new(platform, release);
    super::await_upcall(&mut scope, |platform, fired| {
        platform.kv.subscribe(Some(fired.recorder(&args)));
        platform.kv.allow_key(key.to_vec())?;
        platform.kv.allow_value(value.to_vec())?;
        platform.kv.set()?;
        Ok(())
    })
    .map_err(storage)?;

    super::completion(args.get()).map_err(Error::StorageFailure)?;
    Ok(())
}

/// True if the store refuses the key because it holds nothing under it.
pub fn is_missing(err: &Error) -> bool {
    *err == Error::StorageFailure(ErrorCode::NoSupport)
}
