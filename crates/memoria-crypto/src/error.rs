//! Error types for cryptographic operations.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Invalid magic bytes - not a sealed blob.
    #[error("Invalid magic bytes - not a sealed blob")]
    InvalidMagic,

    /// Unsupported envelope or KDF version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// Key derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed - wrong key, tampered data or mismatched context.
    ///
    /// Carries no detail so that every cause looks the same to the caller.
    #[error("Authentication failed")]
    Authentication,

    /// Password scored below the required strength.
    #[error("Password too weak (score {score}, required {required})")]
    WeakPassword { score: u8, required: u8 },

    /// Password verifier string could not be parsed or produced.
    #[error("Invalid password verifier: {0}")]
    InvalidVerifier(String),

    /// Invalid format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::InvalidMagic;
        assert!(err.to_string().contains("magic bytes"));
    }

    #[test]
    fn test_unsupported_version_display() {
        let err = CryptoError::UnsupportedVersion(99);
        assert!(err.to_string().contains("99"));
    }

    #[test]
    fn test_authentication_display_has_no_detail() {
        assert_eq!(CryptoError::Authentication.to_string(), "Authentication failed");
    }

    #[test]
    fn test_weak_password_display() {
        let err = CryptoError::WeakPassword {
            score: 35,
            required: 60,
        };
        let msg = err.to_string();
        assert!(msg.contains("35"));
        assert!(msg.contains("60"));
    }

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let crypto_err: CryptoError = json_err.into();
        assert!(matches!(crypto_err, CryptoError::Json(_)));
    }
}
