//! Backing store for the key-value driver.
//!
//! Here, we use a single binary file holding the whole map, serialised with
//! `postcard` and rewritten on every `put`, or a RAM map for tests.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not a valid store: {0}")]
    Format(#[from] postcard::Error),
    #[error("store is read-only")]
    ReadOnly,
}

/// What the state file holds.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
struct State {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

pub struct Store {
    state: State,
    path: Option<PathBuf>,
    read_only: bool,
    writes: usize,
}

impl Store {
    pub fn in_memory() -> Self {
        Self { state: State::default(), path: None, read_only: false, writes: 0 }
    }

    /// Opens the store kept in `state_path`, creating an empty one if missing.
    pub fn open(state_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path: PathBuf = state_path.as_ref().into();
        let state = match fs::read(&path) {
            Ok(bytes) => postcard::from_bytes(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let store = Self { state: State::default(), path: Some(path), read_only: false, writes: 0 };
                store.flush(&store.state)?;
                info!("Created new state file");
                return Ok(store);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Self { state, path: Some(path), read_only: false, writes: 0 })
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.state.entries.get(key).map(Vec::as_slice)
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        // only a durable write becomes visible
        let mut next = self.state.clone();
        next.entries.insert(key.to_vec(), value.to_vec());
        self.flush(&next)?;
        self.state = next;
        self.writes += 1;
        Ok(())
    }

    /// Refuse writes from now on, like write-protected flash.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Number of successful `put`s since the store was opened.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.entries.is_empty()
    }

    fn flush(&self, state: &State) -> Result<(), StoreError> {
        let path = match &self.path {
            Some(path) => path,
            None => return Ok(()),
        };
        let bytes = postcard::to_allocvec(state)?;
        debug!("writing {} bytes to {:?}", bytes.len(), path);
        let mut file = fs::File::create(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }
}
