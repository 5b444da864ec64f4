use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use log::info;

use crate::cli::Config;
use crate::oracle::{ChaChaOracle, KEY_LEN};
use crate::platform::{console, store, Platform};

/// Brings up the board: state file, console on stdin/stdout, buttons and,
/// if configured, the USB keyboard.
pub fn init_board(config: &Config) -> Result<Platform> {
    let store = store::Store::open(&config.state_file)
        .with_context(|| format!("opening {}", config.state_file))?;
    let platform = Platform::new(store, console::Input::stdin(), console::Output::stdout(), config.buttons);

    Ok(match config.usb_keyboard {
        true => platform.with_keyboard(),
        false => platform,
    })
}

/// Loads the device key from `key_path`, generating it on first use.
pub fn init_oracle(key_path: impl AsRef<Path>) -> Result<ChaChaOracle> {
    let key_path = key_path.as_ref();
    match fs::read(key_path) {
        Ok(bytes) => {
            let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
                anyhow!("{} holds {} bytes, expected {}", key_path.display(), bytes.len(), KEY_LEN)
            })?;
            Ok(ChaChaOracle::new(key))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            let oracle = ChaChaOracle::generate()?;
            fs::write(key_path, oracle.key()).with_context(|| format!("writing {}", key_path.display()))?;
            info!("Created new device key in {}", key_path.display());
            Ok(oracle)
        }
        Err(err) => Err(err).with_context(|| format!("reading {}", key_path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_key_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.key");

        let first = init_oracle(&path).unwrap();
        assert_eq!(fs::read(&path).unwrap().len(), KEY_LEN);
        let second = init_oracle(&path).unwrap();
        assert_eq!(first.key(), second.key());
    }

    #[test]
    fn truncated_device_key_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.key");
        fs::write(&path, [7u8; 12]).unwrap();
        assert!(init_oracle(&path).is_err());
    }

    #[test]
    fn board_with_keyboard() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            state_file: dir.path().join("state.bin").display().to_string(),
            key_file: dir.path().join("oracle.key").display().to_string(),
            buttons: 2,
            usb_keyboard: true,
            verbosity: 0,
        };
        let platform = init_board(&config).unwrap();
        assert!(platform.keyboard.is_some());
        assert_eq!(platform.buttons.count(), 2);
    }
}
