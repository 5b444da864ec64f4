use crate::platform::ErrorCode;

/// Everything that can go wrong while handling a credential.
///
/// None of these is fatal to the device: the application loop reports them
/// on the console and goes back to waiting for the next button press.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// A driver refused a command or reported a failed completion.
    #[error("{0}")]
    DriverRejected(ErrorCode),
    /// A bounded wait ran out before its condition held.
    #[error("timed out")]
    Timeout,
    #[error("secret is not valid base32")]
    DecodeFailure,
    /// The encryption oracle could not seal or open a secret.
    #[error("encryption oracle failure")]
    CryptoFailure,
    #[error("{0}")]
    StorageFailure(ErrorCode),
    #[error("slot {0} not yet configured")]
    NotConfigured(usize),
    #[error("no credential slot for button {0}")]
    InvalidSlot(usize),
    #[error("cannot produce {0}-digit codes")]
    InvalidDigits(u32),
    /// Nothing is outstanding and no further stimulus will arrive.
    #[error("platform halted")]
    Halted,
}

impl Error {
    /// The driver return code behind this error, if there is one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::DriverRejected(code) | Error::StorageFailure(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::DriverRejected(code)
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
