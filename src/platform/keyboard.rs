//! USB HID keyboard emulation: types the shared send buffer as keystrokes.

use log::info;

use super::{Clock, ErrorCode, Ticks, Upcall};

/// Time to press and release one key.
const KEYSTROKE_MS: u64 = 8;

/// How many typed strings [`UsbKeyboard::typed`] remembers.
pub const TYPED_HISTORY: usize = 16;

pub struct UsbKeyboard {
    clock: Clock,
    upcall: Option<Upcall>,
    send_buffer: Vec<u8>,
    due: Option<Ticks>,
    typed: Vec<String>,
}

impl UsbKeyboard {
    pub(crate) fn new(clock: Clock) -> Self {
        Self { clock, upcall: None, send_buffer: Vec::new(), due: None, typed: Vec::new() }
    }

    /// Replaces the send-completion upcall, returning the previous one.
    ///
    /// The upcall receives `(status, keystrokes sent, 0)`.
    pub fn subscribe(&mut self, upcall: Option<Upcall>) -> Option<Upcall> {
        core::mem::replace(&mut self.upcall, upcall)
    }

    pub fn allow_send(&mut self, buffer: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        if self.due.is_some() {
            return Err(ErrorCode::Busy);
        }
        Ok(core::mem::replace(&mut self.send_buffer, buffer))
    }

    pub fn send(&mut self) -> Result<(), ErrorCode> {
        if self.due.is_some() {
            return Err(ErrorCode::Busy);
        }
        if self.send_buffer.is_empty() {
            return Err(ErrorCode::Reserve);
        }
        if !self.send_buffer.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(ErrorCode::Invalid);
        }
        self.due = Some(self.clock.after_ms(KEYSTROKE_MS * self.send_buffer.len() as u64));
        Ok(())
    }

    /// The last [`TYPED_HISTORY`] strings typed, oldest first.
    pub fn typed(&self) -> &[String] {
        &self.typed
    }

    pub(crate) fn deadline(&self) -> Option<Ticks> {
        self.due
    }

    pub(crate) fn service(&mut self) {
        if self.due.take().is_none() {
            return;
        }
        let text = String::from_utf8_lossy(&self.send_buffer).into_owned();
        info!("typed {:?} over USB HID", text);
        let len = text.len() as u32;
        if self.typed.len() == TYPED_HISTORY {
            self.typed.remove(0);
        }
        self.typed.push(text);
        if let Some(upcall) = self.upcall.as_mut() {
            upcall(0, len, 0);
        }
    }
}
