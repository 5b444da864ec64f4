//! The encryption oracle that keeps HOTP secrets encrypted at rest.
//!
//! Credentials only ever store what the oracle hands back, an IV and a
//! ciphertext, and give both back to it unchanged to recover the secret.

use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::{ChaCha20, Key, Nonce};
use log::debug;
use rand_core::{OsRng, RngCore};

use crate::secret::MAX_SECRET_LEN;
use crate::{Error, Result};

pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// Output of [`Oracle::encrypt`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sealed {
    pub iv: [u8; IV_LEN],
    pub ciphertext: Vec<u8>,
}

pub trait Oracle {
    /// Encrypts up to 64 bytes under a fresh IV.
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Sealed>;

    /// Inverts [`Oracle::encrypt`].
    fn decrypt(&mut self, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// ChaCha20 under a device key.
///
/// The IV is the tail of the ChaCha20 input block: a little-endian 32-bit
/// block counter followed by the 96-bit nonce. Fresh IVs start at block 0
/// with a random nonce.
pub struct ChaChaOracle {
    key: [u8; KEY_LEN],
}

impl ChaChaOracle {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// An oracle under a key drawn from the OS.
    pub fn generate() -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        OsRng.try_fill_bytes(&mut key).map_err(|_| Error::CryptoFailure)?;
        Ok(Self::new(key))
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    fn apply(&self, iv: &[u8; IV_LEN], buffer: &mut [u8]) -> Result<()> {
        let mut block = [0u8; 4];
        block.copy_from_slice(&iv[..4]);
        let block = u32::from_le_bytes(block);

        let mut cipher = ChaCha20::new(Key::from_slice(&self.key), Nonce::from_slice(&iv[4..]));
        cipher.try_seek(u64::from(block) * 64).map_err(|_| Error::CryptoFailure)?;
        cipher.try_apply_keystream(buffer).map_err(|_| Error::CryptoFailure)
    }
}

impl Oracle for ChaChaOracle {
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Sealed> {
        if plaintext.len() > MAX_SECRET_LEN {
            return Err(Error::CryptoFailure);
        }
        let mut iv = [0u8; IV_LEN];
        OsRng.try_fill_bytes(&mut iv[4..]).map_err(|_| Error::CryptoFailure)?;

        let mut ciphertext = plaintext.to_vec();
        self.apply(&iv, &mut ciphertext)?;
        debug!("sealed {} bytes", ciphertext.len());
        Ok(Sealed { iv, ciphertext })
    }

    fn decrypt(&mut self, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() > MAX_SECRET_LEN {
            return Err(Error::CryptoFailure);
        }
        let mut plaintext = ciphertext.to_vec();
        self.apply(iv, &mut plaintext)?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_length() {
        let mut oracle = ChaChaOracle::new([7; KEY_LEN]);
        for len in 1..=MAX_SECRET_LEN {
            let secret: Vec<u8> = (0..len as u8).collect();
            let sealed = oracle.encrypt(&secret).unwrap();
            assert_eq!(sealed.ciphertext.len(), len);
            assert_eq!(oracle.decrypt(&sealed.iv, &sealed.ciphertext).unwrap(), secret);
        }
    }

    #[test]
    fn ciphertext_hides_the_secret() {
        let mut oracle = ChaChaOracle::new([7; KEY_LEN]);
        let secret = [0u8; 32];
        let first = oracle.encrypt(&secret).unwrap();
        let second = oracle.encrypt(&secret).unwrap();
        assert_ne!(first.ciphertext, secret);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn wrong_key_does_not_recover() {
        let sealed = ChaChaOracle::new([1; KEY_LEN]).encrypt(b"secret").unwrap();
        let opened = ChaChaOracle::new([2; KEY_LEN]).decrypt(&sealed.iv, &sealed.ciphertext).unwrap();
        assert_ne!(opened, b"secret");
    }

    #[test]
    fn refuses_oversized_secrets() {
        let mut oracle = ChaChaOracle::new([7; KEY_LEN]);
        assert_eq!(oracle.encrypt(&[0; 65]), Err(Error::CryptoFailure));
    }
}
