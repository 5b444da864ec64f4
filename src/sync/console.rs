use super::Scope;
use crate::platform::{ErrorCode, Platform};
use crate::{Error, Result};

fn release(platform: &mut Platform) {
    let _ = platform.console.abort_read();
    let _ = platform.console.allow_read(Vec::new());
    platform.console.subscribe(None);
}

/// Blocks until one character has been received.
pub fn getch(platform: &mut Platform) -> Result<u8> {
    let mut scope = Scope::new(platform, release);
    super::await_upcall(&mut scope, |platform, fired| {
        platform.console.subscribe(Some(fired.upcall()));
        platform.console.allow_read(vec![0; 1])?;
        platform.console.read()?;
        Ok(())
    })?;

    let buffer = scope.console.allow_read(Vec::new())?;
    buffer.first().copied().ok_or(Error::DriverRejected(ErrorCode::Size))
}
