//! One-shot alarms on the virtual clock.
//!
//! The hardware alarm is multiplexed into virtual alarms, each with its own
//! upcall and expiration. The default one is driven by the plain
//! `subscribe`/`set_relative`/`cancel` commands; callers that must not
//! disturb it (timeouts) [`allocate`](Alarm::allocate) their own.

use log::debug;

use super::{Clock, ErrorCode, Ticks, Upcall};

/// Tick frequency of the alarm, in Hz.
pub const FREQUENCY: u32 = 32_768;

/// Handle to an allocated virtual alarm.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VirtualAlarm(usize);

const DEFAULT: VirtualAlarm = VirtualAlarm(0);

#[derive(Default)]
struct Timer {
    upcall: Option<Upcall>,
    expiration: Option<Ticks>,
}

pub struct Alarm {
    clock: Clock,
    timers: Vec<Option<Timer>>,
}

impl Alarm {
    pub(crate) fn new(clock: Clock) -> Self {
        Self { clock, timers: vec![Some(Timer::default())] }
    }

    pub fn frequency(&self) -> u32 {
        FREQUENCY
    }

    /// Replaces the fire upcall of the default alarm, returning the previous one.
    ///
    /// The upcall receives `(now, expiration, 0)`, both truncated to 32 bits.
    pub fn subscribe(&mut self, upcall: Option<Upcall>) -> Option<Upcall> {
        self.subscribe_virtual(DEFAULT, upcall).unwrap_or(None)
    }

    /// Arms the default alarm `ticks` from now, replacing any armed expiration.
    pub fn set_relative(&mut self, ticks: u32) -> Result<Ticks, ErrorCode> {
        self.set_relative_virtual(DEFAULT, ticks)
    }

    pub fn cancel(&mut self) -> Result<(), ErrorCode> {
        self.cancel_virtual(DEFAULT)
    }

    /// A fresh, disarmed virtual alarm.
    pub fn allocate(&mut self) -> VirtualAlarm {
        match self.timers.iter().position(Option::is_none) {
            Some(index) => {
                self.timers[index] = Some(Timer::default());
                VirtualAlarm(index)
            }
            None => {
                self.timers.push(Some(Timer::default()));
                VirtualAlarm(self.timers.len() - 1)
            }
        }
    }

    /// Disarms and forgets `alarm`. The default alarm cannot be freed.
    pub fn free(&mut self, alarm: VirtualAlarm) {
        if alarm != DEFAULT {
            if let Some(timer) = self.timers.get_mut(alarm.0) {
                *timer = None;
            }
        }
    }

    pub fn subscribe_virtual(&mut self, alarm: VirtualAlarm, upcall: Option<Upcall>) -> Result<Option<Upcall>, ErrorCode> {
        let timer = self.timer(alarm)?;
        Ok(core::mem::replace(&mut timer.upcall, upcall))
    }

    pub fn set_relative_virtual(&mut self, alarm: VirtualAlarm, ticks: u32) -> Result<Ticks, ErrorCode> {
        let expiration = self.clock.now() + Ticks::from(ticks);
        self.timer(alarm)?.expiration = Some(expiration);
        debug!("alarm {} armed for tick {}", alarm.0, expiration);
        Ok(expiration)
    }

    pub fn cancel_virtual(&mut self, alarm: VirtualAlarm) -> Result<(), ErrorCode> {
        match self.timer(alarm)?.expiration.take() {
            Some(expiration) => {
                debug!("alarm {} for tick {} cancelled", alarm.0, expiration);
                Ok(())
            }
            None => Err(ErrorCode::Already),
        }
    }

    /// True while any virtual alarm is armed.
    pub fn is_armed(&self) -> bool {
        self.deadline().is_some()
    }

    fn timer(&mut self, alarm: VirtualAlarm) -> Result<&mut Timer, ErrorCode> {
        self.timers.get_mut(alarm.0).and_then(Option::as_mut).ok_or(ErrorCode::Invalid)
    }

    fn earliest(&self) -> Option<(usize, Ticks)> {
        self.timers
            .iter()
            .enumerate()
            .filter_map(|(index, timer)| Some((index, timer.as_ref()?.expiration?)))
            .min_by_key(|&(_, expiration)| expiration)
    }

    pub(crate) fn deadline(&self) -> Option<Ticks> {
        self.earliest().map(|(_, expiration)| expiration)
    }

    /// Fires the virtual alarm that expires first.
    pub(crate) fn service(&mut self, now: Ticks) {
        let index = match self.earliest() {
            Some((index, _)) => index,
            None => return,
        };
        if let Some(timer) = self.timers[index].as_mut() {
            if let Some(expiration) = timer.expiration.take() {
                if let Some(upcall) = timer.upcall.as_mut() {
                    upcall(now as u32, expiration as u32, 0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn virtual_alarms_fire_independently() {
        let mut alarm = Alarm::new(Clock::default());
        let fired = Rc::new(Cell::new(Vec::new()));

        let log = fired.clone();
        alarm.subscribe(Some(Box::new(move |_, exp, _| {
            let mut seen = log.take();
            seen.push(exp);
            log.set(seen);
        })));
        let timeout = alarm.allocate();
        let log = fired.clone();
        alarm
            .subscribe_virtual(timeout, Some(Box::new(move |_, exp, _| {
                let mut seen = log.take();
                seen.push(exp + 1_000_000);
                log.set(seen);
            })))
            .unwrap();

        alarm.set_relative_virtual(timeout, 50).unwrap();
        alarm.set_relative(20).unwrap();
        assert_eq!(alarm.deadline(), Some(20));

        alarm.service(20);
        assert_eq!(alarm.deadline(), Some(50));
        alarm.service(50);
        assert!(!alarm.is_armed());
        assert_eq!(fired.take(), vec![20, 1_000_050]);
    }

    #[test]
    fn freed_alarms_are_gone() {
        let mut alarm = Alarm::new(Clock::default());
        let timeout = alarm.allocate();
        alarm.set_relative_virtual(timeout, 5).unwrap();
        alarm.free(timeout);
        assert!(!alarm.is_armed());
        assert_eq!(alarm.set_relative_virtual(timeout, 5), Err(ErrorCode::Invalid));
        assert_eq!(alarm.allocate(), timeout);

        alarm.free(DEFAULT);
        assert_eq!(alarm.set_relative(1), Ok(1));
        assert_eq!(alarm.cancel(), Ok(()));
        assert_eq!(alarm.cancel(), Err(ErrorCode::Already));
    }
}
