use log::debug;

use super::ErrorCode;

/// One LED per button.
pub struct Leds {
    lit: Vec<bool>,
}

impl Leds {
    pub(crate) fn new(count: usize) -> Self {
        Self { lit: vec![false; count] }
    }

    pub fn count(&self) -> usize {
        self.lit.len()
    }

    pub fn on(&mut self, index: usize) -> Result<(), ErrorCode> {
        self.set(index, true)
    }

    pub fn off(&mut self, index: usize) -> Result<(), ErrorCode> {
        self.set(index, false)
    }

    pub fn is_on(&self, index: usize) -> bool {
        self.lit.get(index).copied().unwrap_or(false)
    }

    fn set(&mut self, index: usize, on: bool) -> Result<(), ErrorCode> {
        let led = self.lit.get_mut(index).ok_or(ErrorCode::Invalid)?;
        *led = on;
        debug!("led {} {}", index, if on { "on" } else { "off" });
        Ok(())
    }
}
