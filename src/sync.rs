//! Blocking wrappers around the asynchronous drivers.
//!
//! Every wrapper has the same shape: subscribe an upcall that raises a
//! [`Flag`], share the buffers the operation needs, issue the command, then
//! [`yield_for`] the flag. Yielding hands control to the kernel, which
//! completes outstanding operations and runs their upcalls; the calling
//! context does nothing else until its own operation has finished, so at most
//! one operation per driver is ever outstanding.
//!
//! Buffers and upcalls are registered through a [`Scope`], which revokes them
//! when it goes out of scope, whichever way the wrapper returns.

use core::cell::Cell;
use core::ops::{Deref, DerefMut};
use core::time::Duration;
use std::rc::Rc;

use crate::platform::{ErrorCode, Platform, Upcall, Yielded};
use crate::{Error, Result};

pub mod alarm;
pub mod console;
pub mod keyboard;
pub mod kv;

/// Raised from an upcall, polled by the application.
#[derive(Clone, Debug, Default)]
pub struct Flag(Rc<Cell<bool>>);

/// Arguments of the most recent upcall delivered through [`Flag::recorder`].
pub type UpcallArgs = Rc<Cell<(u32, u32, u32)>>;

impl Flag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.set(true);
    }

    pub fn clear(&self) {
        self.0.set(false);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }

    /// An upcall that raises this flag.
    pub fn upcall(&self) -> Upcall {
        let flag = self.clone();
        Box::new(move |_, _, _| flag.set())
    }

    /// An upcall that stores its arguments in `args`, then raises this flag.
    pub fn recorder(&self, args: &UpcallArgs) -> Upcall {
        let flag = self.clone();
        let args = args.clone();
        Box::new(move |a, b, c| {
            args.set((a, b, c));
            flag.set();
        })
    }
}

/// Interprets `(status, length, _)` completion arguments.
pub fn completion((status, len, _): (u32, u32, u32)) -> Result<usize, ErrorCode> {
    match ErrorCode::from_status(status) {
        Some(code) => Err(code),
        None => Ok(len as usize),
    }
}

/// Yields to the kernel until `condition` holds.
///
/// Returns [`Error::Halted`] if the kernel has nothing left to do, in which
/// case the condition can never become true.
pub fn yield_for(platform: &mut Platform, mut condition: impl FnMut() -> bool) -> Result<()> {
    while !condition() {
        if platform.yield_now() == Yielded::Idle {
            return Err(Error::Halted);
        }
    }
    Ok(())
}

/// Starts an asynchronous operation and blocks until it has completed.
///
/// `register` receives a freshly cleared flag; it must arrange for some
/// upcall to raise it (or for `predicate` to become true) and then start the
/// operation. If `register` fails, its error is returned without waiting.
/// With a `timeout`, the wait is bounded by a virtual alarm separate from
/// the default one `register` may use, and fails with [`Error::Timeout`].
pub fn await_condition<R, P>(
    platform: &mut Platform,
    register: R,
    mut predicate: P,
    timeout: Option<Duration>,
) -> Result<()>
where
    R: FnOnce(&mut Platform, &Flag) -> Result<()>,
    P: FnMut() -> bool,
{
    let fired = Flag::new();
    register(platform, &fired)?;
    let condition = || fired.is_set() || predicate();
    match timeout {
        Some(timeout) => alarm::yield_for_with_timeout(platform, condition, timeout),
        None => yield_for(platform, condition),
    }
}

/// [`await_condition`] for operations that signal completion only by upcall.
pub fn await_upcall<R>(platform: &mut Platform, register: R) -> Result<()>
where
    R: FnOnce(&mut Platform, &Flag) -> Result<()>,
{
    await_condition(platform, register, || false, None)
}

/// Exclusive access to the platform for one blocking call.
///
/// `release` runs when the scope ends, on every exit path, and is where the
/// call unregisters its upcall and takes back its shared buffers.
pub struct Scope<'p, F>
where
    F: FnMut(&mut Platform),
{
    platform: &'p mut Platform,
    release: F,
}

impl<'p, F> Scope<'p, F>
where
    F: FnMut(&mut Platform),
{
    pub fn new(platform: &'p mut Platform, release: F) -> Self {
        Self { platform, release }
    }
}

impl<F> Deref for Scope<'_, F>
where
    F: FnMut(&mut Platform),
{
    type Target = Platform;

    fn deref(&self) -> &Platform {
        self.platform
    }
}

impl<F> DerefMut for Scope<'_, F>
where
    F: FnMut(&mut Platform),
{
    fn deref_mut(&mut self) -> &mut Platform {
        self.platform
    }
}

impl<F> Drop for Scope<'_, F>
where
    F: FnMut(&mut Platform),
{
    fn drop(&mut self) {
        (self.release)(&mut *self.platform);
    }
}
