//! HOTP credentials and their persisted record.
//!
//! A record is a fixed 89-byte layout, identical for every slot:
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 1    | secret length, 0 when not configured   |
//! | 1      | 16   | IV from the encryption oracle          |
//! | 17     | 64   | encrypted secret                       |
//! | 81     | 8    | counter, little endian                 |

use crate::oracle::{Sealed, IV_LEN};
use crate::secret::MAX_SECRET_LEN;
use crate::{Error, Result};

pub const NUM_SLOTS: usize = 4;

/// Code length of each slot.
pub const SLOT_DIGITS: [u32; NUM_SLOTS] = [6, 6, 7, 8];

pub const RECORD_SIZE: usize = 1 + IV_LEN + MAX_SECRET_LEN + 8;

const IV_OFFSET: usize = 1;
const SECRET_OFFSET: usize = IV_OFFSET + IV_LEN;
const COUNTER_OFFSET: usize = SECRET_OFFSET + MAX_SECRET_LEN;

/// Storage key of a slot's record.
pub fn storage_key(slot: usize) -> String {
    format!("hotp-key-{}", slot)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Credential {
    secret_len: u8,
    iv: [u8; IV_LEN],
    encrypted_secret: [u8; MAX_SECRET_LEN],
    counter: u64,
    digits: u32,
}

impl Credential {
    /// An unconfigured credential for `slot`.
    pub fn blank(slot: usize) -> Self {
        Self {
            secret_len: 0,
            iv: [0; IV_LEN],
            encrypted_secret: [0; MAX_SECRET_LEN],
            counter: 0,
            digits: SLOT_DIGITS[slot],
        }
    }

    /// Parses a stored record; `None` unless it is exactly [`RECORD_SIZE`] bytes.
    pub fn from_record(slot: usize, record: &[u8]) -> Option<Self> {
        if record.len() != RECORD_SIZE || usize::from(record[0]) > MAX_SECRET_LEN {
            return None;
        }
        let mut credential = Self::blank(slot);
        credential.secret_len = record[0];
        credential.iv.copy_from_slice(&record[IV_OFFSET..SECRET_OFFSET]);
        credential.encrypted_secret.copy_from_slice(&record[SECRET_OFFSET..COUNTER_OFFSET]);
        let mut counter = [0u8; 8];
        counter.copy_from_slice(&record[COUNTER_OFFSET..]);
        credential.counter = u64::from_le_bytes(counter);
        Some(credential)
    }

    pub fn to_record(&self) -> [u8; RECORD_SIZE] {
        let mut record = [0u8; RECORD_SIZE];
        record[0] = self.secret_len;
        record[IV_OFFSET..SECRET_OFFSET].copy_from_slice(&self.iv);
        record[SECRET_OFFSET..COUNTER_OFFSET].copy_from_slice(&self.encrypted_secret);
        record[COUNTER_OFFSET..].copy_from_slice(&self.counter.to_le_bytes());
        record
    }

    pub fn is_configured(&self) -> bool {
        self.secret_len != 0
    }

    pub fn secret_len(&self) -> usize {
        usize::from(self.secret_len)
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }

    /// The meaningful part of the encrypted secret.
    pub fn encrypted_secret(&self) -> &[u8] {
        &self.encrypted_secret[..self.secret_len()]
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Takes a freshly sealed secret; the counter starts over at zero.
    pub fn install(&mut self, sealed: &Sealed) -> Result<()> {
        let len = sealed.ciphertext.len();
        if len == 0 || len > MAX_SECRET_LEN {
            return Err(Error::CryptoFailure);
        }
        self.secret_len = len as u8;
        self.iv = sealed.iv;
        self.encrypted_secret = [0; MAX_SECRET_LEN];
        self.encrypted_secret[..len].copy_from_slice(&sealed.ciphertext);
        self.counter = 0;
        Ok(())
    }

    /// Marks the credential unconfigured, leaving its counter alone.
    pub fn clear(&mut self) {
        self.secret_len = 0;
    }

    /// Moves to the next counter value, returning the one just used.
    pub fn advance(&mut self) -> u64 {
        let used = self.counter;
        self.counter += 1;
        used
    }
}
