//! Push buttons.
//!
//! On PC there are no physical buttons; the board turns each input line of
//! the form `press N` or `hold N` into a press transition now and a release
//! transition after [`PRESS_MS`] or [`HOLD_MS`].

use std::collections::VecDeque;

use log::debug;

use super::{Clock, ErrorCode, Ticks, Upcall};

/// How long a `press` gesture keeps the button down.
pub const PRESS_MS: u64 = 120;
/// How long a `hold` gesture keeps the button down.
pub const HOLD_MS: u64 = 1_500;

/// A scripted physical interaction with one button.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Gesture {
    Press(usize),
    Hold(usize),
}

impl Gesture {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next()?;
        let index = words.next()?.parse().ok()?;
        if words.next().is_some() {
            return None;
        }
        match verb {
            "press" => Some(Gesture::Press(index)),
            "hold" => Some(Gesture::Hold(index)),
            _ => None,
        }
    }
}

pub struct Buttons {
    clock: Clock,
    upcall: Option<Upcall>,
    pressed: Vec<bool>,
    interrupts: Vec<bool>,
    transitions: VecDeque<(Ticks, usize, bool)>,
}

impl Buttons {
    pub(crate) fn new(clock: Clock, count: usize) -> Self {
        Self {
            clock,
            upcall: None,
            pressed: vec![false; count],
            interrupts: vec![false; count],
            transitions: VecDeque::new(),
        }
    }

    /// Replaces the change upcall, returning the previous one.
    ///
    /// The upcall receives `(index, pressed, 0)` with `pressed` being 1 on
    /// press and 0 on release.
    pub fn subscribe(&mut self, upcall: Option<Upcall>) -> Option<Upcall> {
        core::mem::replace(&mut self.upcall, upcall)
    }

    pub fn count(&self) -> usize {
        self.pressed.len()
    }

    pub fn enable_interrupt(&mut self, index: usize) -> Result<(), ErrorCode> {
        *self.interrupts.get_mut(index).ok_or(ErrorCode::Invalid)? = true;
        Ok(())
    }

    pub fn disable_interrupt(&mut self, index: usize) -> Result<(), ErrorCode> {
        *self.interrupts.get_mut(index).ok_or(ErrorCode::Invalid)? = false;
        Ok(())
    }

    /// Current physical state of button `index`.
    pub fn read(&self, index: usize) -> Result<bool, ErrorCode> {
        self.pressed.get(index).copied().ok_or(ErrorCode::Invalid)
    }

    /// Queues the transitions a gesture produces, starting now.
    pub fn perform(&mut self, gesture: Gesture) {
        let (index, held_ms) = match gesture {
            Gesture::Press(index) => (index, PRESS_MS),
            Gesture::Hold(index) => (index, HOLD_MS),
        };
        self.schedule(self.clock.now(), index, true);
        self.schedule(self.clock.after_ms(held_ms), index, false);
    }

    fn schedule(&mut self, at: Ticks, index: usize, pressed: bool) {
        let position = self
            .transitions
            .iter()
            .position(|&(when, _, _)| when > at)
            .unwrap_or(self.transitions.len());
        self.transitions.insert(position, (at, index, pressed));
    }

    pub(crate) fn deadline(&self) -> Option<Ticks> {
        self.transitions.front().map(|&(at, _, _)| at)
    }

    pub(crate) fn service(&mut self, _now: Ticks) {
        let (_, index, pressed) = match self.transitions.pop_front() {
            Some(transition) => transition,
            None => return,
        };
        let state = match self.pressed.get_mut(index) {
            Some(state) => state,
            None => {
                debug!("gesture on missing button {}", index);
                return;
            }
        };
        *state = pressed;
        if self.interrupts[index] {
            if let Some(upcall) = self.upcall.as_mut() {
                upcall(index as u32, pressed as u32, 0);
            }
        }
    }
}
