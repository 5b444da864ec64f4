//! Delivery of codes to the user.

use log::error;

use crate::hotp::Otp;
use crate::platform::Platform;
use crate::sync::keyboard;
use crate::Result;

/// How a code reached the user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Delivery {
    /// Typed as keystrokes on the USB HID keyboard.
    Keyboard,
    /// Printed on the console, there being no keyboard.
    Console,
}

/// Types `otp` if a keyboard is attached, else prints it.
///
/// `counter` is the counter value the code was derived from.
pub fn deliver(platform: &mut Platform, otp: &Otp, counter: u64) -> Result<Delivery> {
    let code = otp.to_string();
    if platform.keyboard.is_none() {
        platform.console.println(format_args!("CODE: {}", code));
        return Ok(Delivery::Console);
    }

    match keyboard::send_string(platform, &code) {
        Ok(()) => {
            platform.console.println(format_args!(
                "Counter: {}. Typed \"{}\" on the USB HID keyboard",
                counter, code
            ));
            Ok(Delivery::Keyboard)
        }
        Err(err) => {
            error!("sending {}-digit code over USB HID: {}", otp.digits(), err);
            Err(err)
        }
    }
}
