//! # HOTP security key, for PC.
//!
//! A small hardware security key: a handful of buttons, each owning a slot
//! that holds an HOTP ([RFC 4226][rfc4226]) credential. Pressing a button
//! types the slot's next one-time code on a USB HID keyboard (or prints it),
//! holding it asks for a new base32 secret on the serial console.
//!
//! The firmware runs on a cooperative, single-threaded kernel whose drivers
//! are asynchronous: an operation is started by a command, and its completion
//! is signalled by an upcall that only runs while the application yields.
//! On the PC, [`platform`] simulates such a board in virtual time, and
//! [`sync`] turns its drivers into blocking calls.
//!
//! The pieces, from the bottom up:
//! - [`platform`]: drivers for alarm, buttons, console, HMAC engine,
//!   key-value store, LEDs and the USB keyboard
//! - [`sync`]: waiting for upcalls and conditions, with optional timeout
//! - [`hmac`], [`hotp`]: code generation on top of the HMAC engine
//! - [`secret`], [`oracle`], [`credential`], [`keystore`]: what a slot holds
//!   and how it is kept at rest
//! - [`input`], [`output`]: button classification, secret entry and code
//!   delivery
//! - [`authenticator`]: the application loop
//!
//! Outside of the library are the [`board`] bring-up and the [`cli`].
//!
//! [rfc4226]: https://www.rfc-editor.org/rfc/rfc4226

pub use error::{Error, Result};

pub mod authenticator;
pub mod board;
pub mod cli;
pub mod credential;
mod error;
pub mod hmac;
pub mod hotp;
pub mod input;
pub mod keystore;
pub mod oracle;
pub mod output;
pub mod platform;
pub mod secret;
pub mod sync;
