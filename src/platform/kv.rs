//! Asynchronous key-value storage driver over a [`Store`].
//!
//! `get` copies the value of the shared key into the shared destination,
//! truncating to the destination length; the upcall reports the full value
//! length so callers can tell a truncated read apart.

use log::{debug, warn};

use super::store::Store;
use super::{Clock, ErrorCode, Ticks, Upcall};

const GET_LATENCY_MS: u64 = 1;
const SET_LATENCY_MS: u64 = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Operation {
    Get,
    Set,
}

pub struct KvDriver {
    clock: Clock,
    store: Store,
    upcall: Option<Upcall>,
    key: Vec<u8>,
    value: Vec<u8>,
    destination: Vec<u8>,
    pending: Option<(Ticks, Operation)>,
}

impl KvDriver {
    pub(crate) fn new(clock: Clock, store: Store) -> Self {
        Self {
            clock,
            store,
            upcall: None,
            key: Vec::new(),
            value: Vec::new(),
            destination: Vec::new(),
            pending: None,
        }
    }

    /// Replaces the completion upcall, returning the previous one.
    ///
    /// The upcall receives `(status, value length, 0)`.
    pub fn subscribe(&mut self, upcall: Option<Upcall>) -> Option<Upcall> {
        core::mem::replace(&mut self.upcall, upcall)
    }

    pub fn allow_key(&mut self, key: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        self.idle()?;
        Ok(core::mem::replace(&mut self.key, key))
    }

    pub fn allow_value(&mut self, value: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        self.idle()?;
        Ok(core::mem::replace(&mut self.value, value))
    }

    pub fn allow_destination(&mut self, destination: Vec<u8>) -> Result<Vec<u8>, ErrorCode> {
        self.idle()?;
        Ok(core::mem::replace(&mut self.destination, destination))
    }

    pub fn get(&mut self) -> Result<(), ErrorCode> {
        self.start(Operation::Get, GET_LATENCY_MS)
    }

    pub fn set(&mut self) -> Result<(), ErrorCode> {
        self.start(Operation::Set, SET_LATENCY_MS)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    fn idle(&self) -> Result<(), ErrorCode> {
        match self.pending {
            Some(_) => Err(ErrorCode::Busy),
            None => Ok(()),
        }
    }

    fn start(&mut self, operation: Operation, latency_ms: u64) -> Result<(), ErrorCode> {
        self.idle()?;
        if self.key.is_empty() {
            return Err(ErrorCode::Reserve);
        }
        self.pending = Some((self.clock.after_ms(latency_ms), operation));
        Ok(())
    }

    pub(crate) fn deadline(&self) -> Option<Ticks> {
        self.pending.map(|(due, _)| due)
    }

    pub(crate) fn service(&mut self) {
        let operation = match self.pending.take() {
            Some((_, operation)) => operation,
            None => return,
        };
        let (status, len) = match operation {
            Operation::Get => match self.store.get(&self.key) {
                Some(value) => {
                    let copied = value.len().min(self.destination.len());
                    self.destination[..copied].copy_from_slice(&value[..copied]);
                    let status = if copied < value.len() { ErrorCode::Size.status() } else { 0 };
                    (status, value.len() as u32)
                }
                None => (ErrorCode::NoSupport.status(), 0),
            },
            Operation::Set => match self.store.put(&self.key, &self.value) {
                Ok(()) => (0, self.value.len() as u32),
                Err(err) => {
                    warn!("kv set failed: {}", err);
                    (ErrorCode::Fail.status(), 0)
                }
            },
        };
        debug!("kv {:?} {:?} complete (status {})", operation, String::from_utf8_lossy(&self.key), status);
        if let Some(upcall) = self.upcall.as_mut() {
            upcall(status, len, 0);
        }
    }
}
