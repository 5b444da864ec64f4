use super::{Scope, UpcallArgs};
use crate::platform::{ErrorCode, Platform};
use crate::Result;

fn release(platform: &mut Platform) {
    if let Some(keyboard) = platform.keyboard.as_mut() {
        let _ = keyboard.allow_send(Vec::new());
        keyboard.subscribe(None);
    }
}

/// Types `text` as emulated keypresses and waits until the last key is up.
pub fn send_string(platform: &mut Platform, text: &str) -> Result<()> {
    let args = UpcallArgs::default();
    let mut scope = Scope::new(platform, release);
    super::await_upcall(&mut scope, |platform, fired| {
        let keyboard = platform.keyboard.as_mut().ok_or(ErrorCode::NoDevice)?;
        keyboard.subscribe(Some(fired.recorder(&args)));
        keyboard.allow_send(text.as_bytes().to_vec())?;
        keyboard.send()?;
        Ok(())
    })?;

    super::completion(args.get())?;
    Ok(())
}
