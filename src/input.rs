//! Turning physical input into application events.
//!
//! Button presses are classified with a single re-sample: once a press is
//! reported, wait [`DEBOUNCE_MS`] and look at the button again. Still down
//! means a long press, released means a short one. Bounces within that
//! window are absorbed by the wait.

use core::cell::Cell;
use std::rc::Rc;

use log::{debug, info};

use crate::platform::Platform;
use crate::sync::{self, alarm, console, Flag};
use crate::Result;

/// Delay before a press is re-sampled.
pub const DEBOUNCE_MS: u32 = 500;

/// Longest secret accepted from the console.
pub const MAX_LINE_LEN: usize = 127;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Press {
    /// Released within the debounce interval.
    Short,
    /// Still held after the debounce interval.
    Long,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ButtonEvent {
    pub slot: usize,
    pub press: Press,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Idle,
    PressDetected(usize),
}

/// Button classification, fed by the button upcall.
pub struct ButtonInput {
    pressed: Flag,
    index: Rc<Cell<usize>>,
    state: State,
}

impl ButtonInput {
    /// Subscribes to button changes and enables interrupts on every button.
    pub fn initialize(platform: &mut Platform) -> Result<Self> {
        let pressed = Flag::new();
        let index = Rc::new(Cell::new(0));

        let (flag, last) = (pressed.clone(), index.clone());
        platform.buttons.subscribe(Some(Box::new(move |num, val, _| {
            if val == 1 {
                last.set(num as usize);
                flag.set();
            }
        })));

        let count = platform.buttons.count();
        for button in 0..count {
            platform.buttons.enable_interrupt(button)?;
        }
        info!("listening on {} buttons", count);

        Ok(Self { pressed, index, state: State::Idle })
    }

    /// Blocks until the next press and classifies it.
    ///
    /// Presses that happen while the application is busy elsewhere are not
    /// queued: only a press after this call starts waiting is reported.
    pub fn next_event(&mut self, platform: &mut Platform) -> Result<ButtonEvent> {
        loop {
            match self.state {
                State::Idle => {
                    self.pressed.clear();
                    sync::yield_for(platform, || self.pressed.is_set())?;
                    self.state = State::PressDetected(self.index.get());
                }
                State::PressDetected(slot) => {
                    self.state = State::Idle;
                    alarm::delay_ms(platform, DEBOUNCE_MS)?;
                    let press = match platform.buttons.read(slot)? {
                        true => Press::Long,
                        false => Press::Short,
                    };
                    debug!("button {}: {:?} press", slot, press);
                    return Ok(ButtonEvent { slot, press });
                }
            }
        }
    }
}

/// Reads one line of secret from the console.
///
/// Only ASCII letters and digits are kept (and echoed); enter ends the line.
/// At most [`MAX_LINE_LEN`] characters are read.
pub fn read_secret(platform: &mut Platform) -> Result<String> {
    let mut line = String::new();
    while line.len() < MAX_LINE_LEN {
        let c = console::getch(platform)?;
        if c == b'\n' || c == b'\r' {
            break;
        }
        if c.is_ascii_alphanumeric() {
            line.push(char::from(c));
            platform.console.print(char::from(c).encode_utf8(&mut [0; 4]));
        }
    }
    platform.console.print("\r\n");
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::platform;
    use crate::Error;

    #[test]
    fn short_and_long_presses() {
        let mut platform = platform("press 1\nhold 2\n");
        let mut input = ButtonInput::initialize(&mut platform).unwrap();

        assert_eq!(input.next_event(&mut platform), Ok(ButtonEvent { slot: 1, press: Press::Short }));
        assert_eq!(input.next_event(&mut platform), Ok(ButtonEvent { slot: 2, press: Press::Long }));
        assert_eq!(input.next_event(&mut platform), Err(Error::Halted));
    }

    #[test]
    fn classification_waits_for_the_debounce_interval() {
        let mut platform = platform("press 0\n");
        let mut input = ButtonInput::initialize(&mut platform).unwrap();
        let start = platform.now();
        input.next_event(&mut platform).unwrap();
        assert_eq!(platform.now() - start, 16_384);
    }

    #[test]
    fn secret_line_keeps_alphanumerics() {
        let mut platform = platform("AB-c d1\nrest");
        assert_eq!(read_secret(&mut platform), Ok("ABcd1".to_string()));
        assert_eq!(platform.console.transcript().unwrap(), "ABcd1\r\n");
    }

    #[test]
    fn secret_line_is_bounded() {
        let text = format!("{}\n", "A".repeat(200));
        let mut platform = platform(&text);
        assert_eq!(read_secret(&mut platform).unwrap().len(), MAX_LINE_LEN);
    }

    #[test]
    fn empty_line() {
        let mut platform = platform("\r");
        assert_eq!(read_secret(&mut platform), Ok(String::new()));
    }
}
