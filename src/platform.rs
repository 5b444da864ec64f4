//! A simulated, single-threaded and cooperatively scheduled kernel for PC.
//!
//! Drivers expose the usual upcall/allow/command surface: an application
//! subscribes an upcall, shares buffers with `allow_*` (which swaps in the new
//! buffer and hands back the previously shared one) and starts operations
//! with commands. Operations never complete inside the command; they complete
//! when the application calls [`Platform::yield_now`], which services the one
//! driver whose operation is due first, advances the virtual clock to that
//! point and invokes the subscribed upcall.
//!
//! Upcalls run "in interrupt context": they are plain closures that may only
//! record small facts (set a flag, store an index). They never get access to
//! the platform itself, so they cannot re-enter application code.

use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

use log::{debug, warn};

pub mod alarm;
pub mod button;
pub mod console;
pub mod hmac;
pub mod keyboard;
pub mod kv;
pub mod led;
pub mod store;

/// Virtual time, in alarm ticks.
pub type Ticks = u64;

/// Completion callback, invoked with three driver-specific arguments.
pub type Upcall = Box<dyn FnMut(u32, u32, u32)>;

/// Driver return codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    Fail = 1,
    Busy = 2,
    Already = 3,
    Off = 4,
    Reserve = 5,
    Invalid = 6,
    Size = 7,
    Cancel = 8,
    NoMem = 9,
    NoSupport = 10,
    NoDevice = 11,
    Uninstalled = 12,
    NoAck = 13,
}

impl ErrorCode {
    /// Decodes the status argument of an upcall; `0` is success.
    pub fn from_status(status: u32) -> Option<Self> {
        use ErrorCode::*;
        Some(match status {
            0 => return None,
            2 => Busy,
            3 => Already,
            4 => Off,
            5 => Reserve,
            6 => Invalid,
            7 => Size,
            8 => Cancel,
            9 => NoMem,
            10 => NoSupport,
            11 => NoDevice,
            12 => Uninstalled,
            13 => NoAck,
            _ => Fail,
        })
    }

    /// Status argument for an upcall reporting this error.
    pub fn status(self) -> u32 {
        self as u32
    }

    /// Negative return code, as printed in error reports.
    pub fn code(self) -> i32 {
        -(self as i32)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorCode::*;
        f.write_str(match self {
            Fail => "Unknown Error",
            Busy => "Underlying system is busy; retry",
            Already => "The state requested is already set",
            Off => "The component is powered down",
            Reserve => "Reservation required before use",
            Invalid => "An invalid parameter was passed",
            Size => "Parameter passed was too large",
            Cancel => "Operation canceled by a call",
            NoMem => "Memory required not available",
            NoSupport => "Operation or command is unsupported",
            NoDevice => "Device does not exist",
            Uninstalled => "Device is not physically installed",
            NoAck => "Packet transmission not acknowledged",
        })
    }
}

/// Shared virtual clock. Only the platform advances it.
#[derive(Clone, Debug, Default)]
pub struct Clock(Rc<Cell<Ticks>>);

impl Clock {
    pub fn now(&self) -> Ticks {
        self.0.get()
    }

    fn advance_to(&self, ticks: Ticks) {
        if ticks > self.0.get() {
            self.0.set(ticks);
        }
    }

    /// Ticks corresponding to `ms` milliseconds at the alarm frequency.
    pub(crate) fn after_ms(&self, ms: u64) -> Ticks {
        self.now() + ms * u64::from(alarm::FREQUENCY) / 1000
    }
}

/// Outcome of a single [`Platform::yield_now`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Yielded {
    /// One driver operation completed (its upcall, if any, has run).
    Serviced,
    /// Nothing is outstanding and no stimulus is left: waiting would never end.
    Idle,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Source {
    Alarm,
    Button,
    Console,
    Hmac,
    Keyboard,
    Kv,
}

/// The board: clock plus every driver the application may talk to.
pub struct Platform {
    clock: Clock,
    pub alarm: alarm::Alarm,
    pub buttons: button::Buttons,
    pub console: console::Console,
    pub hmac: hmac::HmacDriver,
    pub keyboard: Option<keyboard::UsbKeyboard>,
    pub kv: kv::KvDriver,
    pub leds: led::Leds,
}

impl Platform {
    pub fn new(store: store::Store, input: console::Input, output: console::Output, buttons: usize) -> Self {
        let clock = Clock::default();
        Self {
            alarm: alarm::Alarm::new(clock.clone()),
            buttons: button::Buttons::new(clock.clone(), buttons),
            console: console::Console::new(clock.clone(), input, output),
            hmac: hmac::HmacDriver::new(clock.clone()),
            keyboard: None,
            kv: kv::KvDriver::new(clock.clone(), store),
            leds: led::Leds::new(buttons),
            clock,
        }
    }

    /// Attaches the USB keystroke emulation transport.
    pub fn with_keyboard(mut self) -> Self {
        self.keyboard = Some(keyboard::UsbKeyboard::new(self.clock.clone()));
        self
    }

    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Gives control to the kernel until one driver operation has completed.
    ///
    /// If nothing is outstanding, the board is asked for an external stimulus
    /// first: a console byte if a read is pending, otherwise the next button
    /// gesture.
    pub fn yield_now(&mut self) -> Yielded {
        if self.next_due().is_none() && !self.stimulate() {
            return Yielded::Idle;
        }
        let (source, due) = match self.next_due() {
            Some(next) => next,
            None => return Yielded::Idle,
        };

        self.clock.advance_to(due);
        let now = self.clock.now();
        match source {
            Source::Alarm => self.alarm.service(now),
            Source::Button => self.buttons.service(now),
            Source::Console => self.console.service(),
            Source::Hmac => self.hmac.service(),
            Source::Keyboard => {
                if let Some(keyboard) = self.keyboard.as_mut() {
                    keyboard.service();
                }
            }
            Source::Kv => self.kv.service(),
        }
        Yielded::Serviced
    }

    fn next_due(&self) -> Option<(Source, Ticks)> {
        let candidates = [
            (Source::Alarm, self.alarm.deadline()),
            (Source::Button, self.buttons.deadline()),
            (Source::Console, self.console.deadline()),
            (Source::Hmac, self.hmac.deadline()),
            (Source::Keyboard, self.keyboard.as_ref().and_then(|k| k.deadline())),
            (Source::Kv, self.kv.deadline()),
        ];
        candidates
            .iter()
            .filter_map(|&(source, due)| due.map(|due| (source, due)))
            .min_by_key(|&(_, due)| due)
    }

    fn stimulate(&mut self) -> bool {
        if self.console.wants_input() {
            return self.console.feed();
        }
        while let Some(line) = self.console.next_line() {
            match button::Gesture::parse(&line) {
                Some(gesture) => {
                    debug!("gesture {:?}", gesture);
                    self.buttons.perform(gesture);
                    return true;
                }
                None if line.trim().is_empty() || line.trim_start().starts_with('#') => {}
                None => warn!("ignoring unrecognised input {:?}", line.trim()),
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_upcall_arguments() {
        assert_eq!(ErrorCode::from_status(0), None);
        assert_eq!(ErrorCode::from_status(ErrorCode::Size.status()), Some(ErrorCode::Size));
        assert_eq!(ErrorCode::from_status(99), Some(ErrorCode::Fail));
        assert_eq!(ErrorCode::NoSupport.code(), -10);
    }

    #[test]
    fn idle_platform_reports_idle() {
        let mut platform = Platform::new(
            store::Store::in_memory(),
            console::Input::script(""),
            console::Output::captured(),
            4,
        );
        assert_eq!(platform.yield_now(), Yielded::Idle);
        assert_eq!(platform.now(), 0);
    }

    #[test]
    fn gestures_become_button_transitions() {
        let mut platform = Platform::new(
            store::Store::in_memory(),
            console::Input::script("# comment\n\npress 2\n"),
            console::Output::captured(),
            4,
        );
        assert_eq!(platform.yield_now(), Yielded::Serviced);
        assert_eq!(platform.buttons.read(2), Ok(true));
        assert_eq!(platform.yield_now(), Yielded::Serviced);
        assert_eq!(platform.buttons.read(2), Ok(false));
        assert!(platform.now() > 0);
        assert_eq!(platform.yield_now(), Yielded::Idle);
    }
}
