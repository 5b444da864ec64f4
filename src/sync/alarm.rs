use core::convert::TryFrom;
use core::time::Duration;

use super::{Flag, Scope};
use crate::platform::{ErrorCode, Platform, Yielded};
use crate::{Error, Result};

/// Converts milliseconds to alarm ticks at `frequency` Hz.
///
/// Accurate to within one millisecond; fails if the result does not fit the
/// 32-bit alarm interface.
pub fn ms_to_ticks(frequency: u32, ms: u32) -> Result<u32> {
    let seconds = u64::from(ms / 1000);
    let leftover_millis = u64::from(ms % 1000);
    let frequency = u64::from(frequency);

    let ticks = seconds * frequency + leftover_millis * frequency / 1000;
    u32::try_from(ticks).map_err(|_| Error::DriverRejected(ErrorCode::Size))
}

fn release(platform: &mut Platform) {
    let _ = platform.alarm.cancel();
    platform.alarm.subscribe(None);
}

/// Blocks for `ms` milliseconds.
pub fn delay_ms(platform: &mut Platform, ms: u32) -> Result<()> {
    let ticks = ms_to_ticks(platform.alarm.frequency(), ms)?;
    let mut scope = Scope::new(platform, release);
    super::await_upcall(&mut scope, |platform, fired| {
        platform.alarm.subscribe(Some(fired.upcall()));
        platform.alarm.set_relative(ticks)?;
        Ok(())
    })
}

/// Yields until `condition` holds, for at most `timeout`.
///
/// The wait is bounded by a virtual alarm of its own, so `condition` may
/// itself depend on the default alarm. That virtual alarm is freed before
/// this returns and cannot fire into a later wait.
pub fn yield_for_with_timeout(
    platform: &mut Platform,
    mut condition: impl FnMut() -> bool,
    timeout: Duration,
) -> Result<()> {
    let ms = u32::try_from(timeout.as_millis()).map_err(|_| Error::DriverRejected(ErrorCode::Size))?;
    let ticks = ms_to_ticks(platform.alarm.frequency(), ms)?;

    let expired = Flag::new();
    let timer = platform.alarm.allocate();
    let mut scope = Scope::new(platform, move |platform: &mut Platform| platform.alarm.free(timer));
    scope.alarm.subscribe_virtual(timer, Some(expired.upcall()))?;
    scope.alarm.set_relative_virtual(timer, ticks)?;

    loop {
        if condition() {
            return Ok(());
        }
        if expired.is_set() {
            return Err(Error::Timeout);
        }
        if scope.yield_now() == Yielded::Idle {
            return Err(Error::Halted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::alarm::FREQUENCY;
    use crate::platform::button::Gesture;
    use crate::sync::tests::platform;

    #[test]
    fn converts_milliseconds() {
        assert_eq!(ms_to_ticks(FREQUENCY, 0), Ok(0));
        assert_eq!(ms_to_ticks(FREQUENCY, 500), Ok(16_384));
        assert_eq!(ms_to_ticks(FREQUENCY, 1_000), Ok(32_768));
        assert_eq!(ms_to_ticks(1_000, 1_234), Ok(1_234));
        assert_eq!(ms_to_ticks(FREQUENCY, u32::MAX), Err(Error::DriverRejected(ErrorCode::Size)));
    }

    #[test]
    fn delay_advances_the_clock() {
        let mut platform = platform("");
        delay_ms(&mut platform, 500).unwrap();
        assert_eq!(platform.now(), 16_384);
        assert!(!platform.alarm.is_armed());
    }

    #[test]
    fn times_out_and_cancels() {
        let mut platform = platform("");
        let result = yield_for_with_timeout(&mut platform, || false, Duration::from_millis(250));
        assert_eq!(result, Err(Error::Timeout));
        assert_eq!(platform.now(), 8_192);
        assert!(!platform.alarm.is_armed());
        // nothing left to fire
        assert_eq!(platform.yield_now(), Yielded::Idle);
    }

    #[test]
    fn condition_wins_over_timeout() {
        let mut platform = platform("");
        platform.buttons.enable_interrupt(1).unwrap();
        platform.buttons.perform(Gesture::Press(1));
        let pressed = Flag::new();
        platform.buttons.subscribe(Some(pressed.upcall()));

        let result = yield_for_with_timeout(&mut platform, || pressed.is_set(), Duration::from_secs(5));
        assert_eq!(result, Ok(()));
        assert!(!platform.alarm.is_armed());

        // the release transition is still due; the cancelled alarm is not
        pressed.clear();
        assert_eq!(platform.yield_now(), Yielded::Serviced);
        assert_eq!(platform.buttons.read(1), Ok(false));
        assert_eq!(platform.yield_now(), Yielded::Idle);
    }
}
