//! Keyed-hash accelerator.
//!
//! The key and message are shared read-only, the destination read-write.
//! `run` starts a one-shot computation over the currently shared buffers; the
//! digest lands in the destination buffer before the upcall fires.

use hmac::{Hmac, Mac};
use log::debug;
use sha2::Sha256;

use super::{Clock, ErrorCode, Ticks, Upcall};

/// Largest key the accelerator accepts: one SHA-256 block.
pub const MAX_KEY_LEN: usize = 64;
/// Size of a SHA-256 digest.
pub const SHA256_LEN: usize = 32;

const LATENCY_MS: u64 = 2;

/// Algorithm identifiers accepted by [`HmacDriver::set_algorithm`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum HmacAlgorithm {
    Sha256 = 0,
    Sha384 = 1,
    Sha512 = 2,
}

pub struct HmacDriver {
    clock: Clock,
    upcall: Option<Upcall>,
    key: Vec<u8>,
    data: Vec<u8>,
    destination: Vec<u8>,
    algorithm: Option<HmacAlgorithm>,
    due: Option<Ticks>,
    runs: usize,
}

impl HmacDriver {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            upcall: None,
            key: Vec::new(),
            data: Vec::new(),
            destination: Vec::new(),
            algorithm: None,
            due: None,
            runs: 0,
        }
    }

    /// Replaces the completion upcall, returning the previous one.
    ///
    /// The upcall receives `(status, digest length, 0)`.
    pub fn subscribe(&mut self, upcall: Option<Upcall>) -> Option<Upcall> {
        core::mem::replace(&mut self.upcall, upcall)
    }

    pub fn allow_key(&mut self, key: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        self.idle()?;
        Ok(core::mem::replace(&mut self.key, key))
    }

    pub fn allow_data(&mut self, data: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        self.idle()?;
        Ok(core::mem::replace(&mut self.data, data))
    }

    pub fn allow_destination(&mut self, destination: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        self.idle()?;
        Ok(core::mem::replace(&mut self.destination, destination))
    }

    pub fn set_algorithm(&mut self, algorithm: u32) -> Result<(), ErrorCode> {
        self.idle()?;
        self.algorithm = Some(match algorithm {
            0 => HmacAlgorithm::Sha256,
            1 | 2 => return Err(ErrorCode::NoSupport),
            _ => return Err(ErrorCode::Invalid),
        });
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), ErrorCode> {
        self.idle()?;
        if self.algorithm.is_none() {
            return Err(ErrorCode::Invalid);
        }
        if self.key.is_empty() {
            return Err(ErrorCode::Reserve);
        }
        if self.key.len() > MAX_KEY_LEN || self.destination.len() < SHA256_LEN {
            return Err(ErrorCode::Size);
        }
        self.runs += 1;
        self.due = Some(self.clock.after_ms(LATENCY_MS));
        Ok(())
    }

    /// True while any buffer or upcall is still registered with the driver.
    pub fn is_exposed(&self) -> bool {
        self.upcall.is_some() || !self.key.is_empty() || !self.data.is_empty() || !self.destination.is_empty()
    }

    /// Number of computations started since boot.
    pub fn runs(&self) -> usize {
        self.runs
    }

    fn idle(&self) -> Result<(), ErrorCode> {
        match self.due {
            Some(_) => Err(ErrorCode::Busy),
            None => Ok(()),
        }
    }

    pub(crate) fn deadline(&self) -> Option<Ticks> {
        self.due
    }

    pub(crate) fn service(&mut self) {
        if self.due.take().is_none() {
            return;
        }
        let (status, len) = match Hmac::<Sha256>::new_from_slice(&self.key) {
            Ok(mut mac) => {
                mac.update(&self.data);
                let digest = mac.finalize().into_bytes();
                self.destination[..SHA256_LEN].copy_from_slice(&digest);
                (0, SHA256_LEN as u32)
            }
            Err(_) => (ErrorCode::Size.status(), 0),
        };
        debug!("hmac over {} bytes complete (status {})", self.data.len(), status);
        if let Some(upcall) = self.upcall.as_mut() {
            upcall(status, len, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_checks_its_inputs() {
        let mut driver = HmacDriver::new(Clock::default());
        assert_eq!(driver.run(), Err(ErrorCode::Invalid));
        driver.set_algorithm(0).unwrap();
        assert_eq!(driver.run(), Err(ErrorCode::Reserve));
        driver.allow_key(vec![1; 65]).unwrap();
        driver.allow_destination(vec![0; SHA256_LEN]).unwrap();
        assert_eq!(driver.run(), Err(ErrorCode::Size));
        driver.allow_key(vec![1; 16]).unwrap();
        assert_eq!(driver.run(), Ok(()));
        assert_eq!(driver.run(), Err(ErrorCode::Busy));
        assert_eq!(driver.allow_key(Vec::new()), Err(ErrorCode::Busy));
        assert_eq!(driver.runs(), 1);
    }

    #[test]
    fn only_sha256_is_supported() {
        let mut driver = HmacDriver::new(Clock::default());
        assert_eq!(driver.set_algorithm(HmacAlgorithm::Sha512 as u32), Err(ErrorCode::NoSupport));
        assert_eq!(driver.set_algorithm(7), Err(ErrorCode::Invalid));
        assert_eq!(driver.set_algorithm(HmacAlgorithm::Sha256 as u32), Ok(()));
    }
}
