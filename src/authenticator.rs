//! The HOTP security key "app".
//!
//! Each button owns a credential slot. A short press emits the next code of
//! that slot, a long press (held past the debounce interval) asks for a new
//! base32 secret on the console and programs it into the slot.
//!
//! Secrets are only ever persisted encrypted by the [`Oracle`]; the counter is
//! advanced and persisted before its code is shown, so a code that has been
//! seen is never produced again, even across power loss.

use log::{debug, error, info, warn};

use crate::credential::{Credential, NUM_SLOTS};
use crate::hotp::{self, Otp};
use crate::input::{self, ButtonEvent, ButtonInput, Press};
use crate::keystore;
use crate::oracle::Oracle;
use crate::output;
use crate::platform::Platform;
use crate::secret;
use crate::{Error, Result};

/// Programmed into slot 0 when storage holds nothing for it.
pub const DEFAULT_SECRET: &str = "test";

const USAGE: &str = "Tock HOTP App Started. Usage:\r\n\
* Press a button to get the next HOTP code for that slot.\r\n\
* Hold a button to enter a new HOTP secret for that slot.";

/// The core "app": owns the platform, the oracle and every credential.
pub struct Authenticator<O>
where
    O: Oracle,
{
    platform: Platform,
    oracle: O,
    credentials: [Credential; NUM_SLOTS],
}

impl<O: Oracle> Authenticator<O> {
    /// Restores credentials from storage, formatting blank slots.
    ///
    /// If slot 0 had no record, it is programmed with [`DEFAULT_SECRET`].
    pub fn new(mut platform: Platform, oracle: O) -> Self {
        let restored = keystore::load_all(&mut platform);
        let mut authenticator = Self { platform, oracle, credentials: restored.credentials };

        if restored.formatted.contains(&0) {
            authenticator.program_default_secret();
        }
        authenticator
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut Platform {
        &mut self.platform
    }

    pub fn credentials(&self) -> &[Credential; NUM_SLOTS] {
        &self.credentials
    }

    pub fn credential(&self, slot: usize) -> Result<&Credential> {
        self.credentials.get(slot).ok_or(Error::InvalidSlot(slot))
    }

    /// Runs the device until no further input can arrive.
    ///
    /// Only a failure to set up the buttons is fatal; errors while handling a
    /// press are reported and the loop carries on.
    pub fn run(&mut self) -> Result<()> {
        self.platform.console.println(USAGE);

        let mut buttons = match ButtonInput::initialize(&mut self.platform) {
            Ok(buttons) => buttons,
            Err(err) => {
                self.platform.console.println("ERROR initializing buttons");
                return Err(err);
            }
        };

        loop {
            let outcome = buttons
                .next_event(&mut self.platform)
                .and_then(|event| self.handle(event));
            match outcome {
                Ok(()) => {}
                Err(Error::Halted) => {
                    info!("no further input");
                    return Ok(());
                }
                Err(err) => self.report(&err),
            }
        }
    }

    /// Dispatches one classified button press.
    pub fn handle(&mut self, event: ButtonEvent) -> Result<()> {
        debug!("handling {:?}", event);
        match event.press {
            Press::Long => self.program_new_secret(event.slot),
            Press::Short => self.emit_code(event.slot).map(drop),
        }
    }

    /// Derives, persists and delivers the next code of `slot`.
    ///
    /// The advanced counter is written to storage before the code is
    /// delivered. A failed write is reported but does not stop delivery, and
    /// a failed delivery does not roll the counter back.
    pub fn emit_code(&mut self, slot: usize) -> Result<Otp> {
        if !self.credential(slot)?.is_configured() {
            return Err(Error::NotConfigured(slot));
        }
        self.with_led(slot, |app| app.next_code(slot))
    }

    fn next_code(&mut self, slot: usize) -> Result<Otp> {
        let credential = &self.credentials[slot];
        let secret = self.oracle.decrypt(credential.iv(), credential.encrypted_secret())?;
        let otp = hotp::generate_code(&mut self.platform, &secret, credential.counter(), credential.digits())?;

        let counter = self.credentials[slot].advance();
        if let Err(err) = keystore::save(&mut self.platform, slot, &self.credentials[slot]) {
            warn!("counter {} of slot {} is not durable", counter + 1, slot);
            self.report(&err);
        }

        output::deliver(&mut self.platform, &otp, counter)?;
        Ok(otp)
    }

    /// Programs `secret` (base32) into `slot`, resetting its counter.
    ///
    /// If the secret cannot be decoded or encrypted, the slot is left
    /// unconfigured in memory and storage is not touched.
    pub fn program_secret(&mut self, slot: usize, secret: &str) -> Result<()> {
        self.credential(slot)?;

        let sealed = secret::decode(secret).and_then(|key| self.oracle.encrypt(&key));
        let installed = sealed.and_then(|sealed| self.credentials[slot].install(&sealed));
        if let Err(err) = installed {
            self.credentials[slot].clear();
            return Err(err);
        }

        keystore::save(&mut self.platform, slot, &self.credentials[slot])?;
        info!("programmed slot {}", slot);
        self.platform.console.println(format_args!("Programmed slot {}", slot));
        Ok(())
    }

    /// Prompts on the console for a new secret for `slot` and programs it.
    ///
    /// An empty line cancels without changing anything.
    pub fn program_new_secret(&mut self, slot: usize) -> Result<()> {
        self.credential(slot)?;
        self.with_led(slot, |app| {
            let console = &mut app.platform.console;
            console.println(format_args!("Program a new key in slot {}", slot));
            console.println("(hit enter without typing to cancel)");

            let secret = input::read_secret(&mut app.platform)?;
            if secret.is_empty() {
                app.platform.console.println("Aborted");
                return Ok(());
            }
            app.program_secret(slot, &secret)
        })
    }

    fn program_default_secret(&mut self) {
        let result = self.with_led(0, |app| app.program_secret(0, DEFAULT_SECRET));
        if let Err(err) = result {
            self.report(&err);
        }
    }

    /// Lights the slot's LED for the duration of `f`.
    fn with_led<T>(&mut self, slot: usize, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if let Err(code) = self.platform.leds.on(slot) {
            debug!("no led for slot {}: {}", slot, code);
        }
        let result = f(self);
        let _ = self.platform.leds.off(slot);
        result
    }

    /// Prints `err` on the console.
    pub fn report(&mut self, err: &Error) {
        error!("{}", err);
        let console = &mut self.platform.console;
        match err {
            Error::NotConfigured(slot) => console.println(format_args!("HOTP slot {} not yet configured.", slot)),
            Error::DecodeFailure => console.println("ERROR cannot base32 decode secret"),
            Error::CryptoFailure => console.println("ERROR cannot encrypt key"),
            _ => match err.code() {
                Some(code) => console.println(format_args!("ERROR({}): {}.", code.code(), code)),
                None => console.println(format_args!("ERROR: {}", err)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ChaChaOracle;
    use crate::sync::tests::platform;

    fn authenticator(script: &str) -> Authenticator<ChaChaOracle> {
        Authenticator::new(platform(script), ChaChaOracle::new([0x11; 32]))
    }

    #[test]
    fn default_secret_lands_in_slot_zero() {
        let app = authenticator("");
        assert!(app.credentials()[0].is_configured());
        assert_eq!(app.credentials()[0].secret_len(), 2);
        assert!(app.credentials()[1..].iter().all(|c| !c.is_configured()));
        assert!(!app.platform().leds.is_on(0));
    }

    #[test]
    fn default_secret_is_not_reprogrammed_over_a_blank_record() {
        let mut app = authenticator("");
        app.emit_code(0).unwrap();
        let mut blank = Credential::blank(0);
        blank.clear();
        keystore::save(app.platform_mut(), 0, &blank).unwrap();

        let platform = std::mem::replace(app.platform_mut(), platform(""));
        let app = Authenticator::new(platform, ChaChaOracle::new([0x11; 32]));
        assert!(!app.credentials()[0].is_configured());
    }

    #[test]
    fn invalid_slots_are_refused() {
        let mut app = authenticator("");
        assert_eq!(app.emit_code(4), Err(Error::InvalidSlot(4)));
        assert_eq!(app.program_secret(7, "ABCDEF"), Err(Error::InvalidSlot(7)));
        assert_eq!(app.program_new_secret(4), Err(Error::InvalidSlot(4)));
    }

    #[test]
    fn reports_carry_return_codes() {
        let mut app = authenticator("");
        app.report(&Error::StorageFailure(crate::platform::ErrorCode::Fail));
        app.report(&Error::NotConfigured(2));
        let transcript = app.platform().console.transcript().unwrap();
        assert!(transcript.contains("ERROR(-1): Unknown Error."));
        assert!(transcript.contains("HOTP slot 2 not yet configured."));
    }
}
