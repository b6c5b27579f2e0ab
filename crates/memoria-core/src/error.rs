//! Error types for memoria.

use memoria_crypto::CryptoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using memoria's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for memoria operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Password scored below the configured threshold
    #[error("Weak password: score {score}, required {required}")]
    WeakPassword { score: u8, required: u8 },

    /// Operation needs an unlocked session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Wrong password or tampered data; the two are deliberately not told apart
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Entry not found
    #[error("Entry not found: {0}")]
    EntryNotFound(uuid::Uuid),

    /// Attachment not found
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(uuid::Uuid),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data could not be parsed
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// A master password is already set
    #[error("Master password already set")]
    AlreadyInitialized,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key derivation or encryption failed
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable, structured error classification for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    WeakPassword,
    NotAuthenticated,
    AuthenticationFailed,
    NotFound,
    StorageIoFailure,
    CorruptRecord,
    AlreadyInitialized,
    InvalidInput,
    CryptoFailure,
    Internal,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::WeakPassword { .. } => ErrorKind::WeakPassword,
            Error::NotAuthenticated => ErrorKind::NotAuthenticated,
            Error::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            Error::EntryNotFound(_) | Error::AttachmentNotFound(_) => ErrorKind::NotFound,
            Error::Io(_) => ErrorKind::StorageIoFailure,
            Error::CorruptRecord(_) => ErrorKind::CorruptRecord,
            Error::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::Crypto(_) => ErrorKind::CryptoFailure,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<CryptoError> for Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Authentication => Error::AuthenticationFailed,
            CryptoError::WeakPassword { score, required } => {
                Error::WeakPassword { score, required }
            }
            CryptoError::InvalidMagic
            | CryptoError::UnsupportedVersion(_)
            | CryptoError::InvalidVerifier(_)
            | CryptoError::InvalidFormat(_)
            | CryptoError::Json(_) => Error::CorruptRecord(e.to_string()),
            CryptoError::KeyDerivation(_) | CryptoError::Encryption(_) => {
                Error::Crypto(e.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::CorruptRecord(e.to_string())
    }
}
