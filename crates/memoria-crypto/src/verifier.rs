//! Password verifier: a one-way Argon2id fingerprint of the master password.
//!
//! The verifier is an Argon2id PHC string with its own random salt, so it is
//! independent of the encryption key derived from the store salt. Checking a
//! candidate password compares hash outputs in constant time.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::cipher::generate_random;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::KdfParams;

const VERIFIER_SALT_LEN: usize = 16;

/// Hash a password into a PHC-format verifier string.
pub fn hash_password(password: &str, params: &KdfParams) -> CryptoResult<String> {
    let salt_bytes: [u8; VERIFIER_SALT_LEN] = generate_random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| CryptoError::InvalidVerifier(e.to_string()))?;

    let argon2 = params.to_argon2()?;
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a candidate password against a stored verifier.
///
/// Returns `Ok(false)` on mismatch. Errors only when the verifier itself is
/// malformed.
pub fn verify_password(password: &str, verifier: &str) -> CryptoResult<bool> {
    let parsed =
        PasswordHash::new(verifier).map_err(|e| CryptoError::InvalidVerifier(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::InvalidVerifier(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> KdfParams {
        KdfParams::new(1024, 1, 1)
    }

    #[test]
    fn test_verify_correct_password() {
        let verifier = hash_password("Tr0ub4dor&3", &cheap()).unwrap();
        assert!(verify_password("Tr0ub4dor&3", &verifier).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let verifier = hash_password("Tr0ub4dor&3", &cheap()).unwrap();
        assert!(!verify_password("Tr0ub4dor&4", &verifier).unwrap());
        assert!(!verify_password("", &verifier).unwrap());
        assert!(!verify_password("tr0ub4dor&3", &verifier).unwrap());
    }

    #[test]
    fn test_verifier_is_phc_argon2id() {
        let verifier = hash_password("Tr0ub4dor&3", &cheap()).unwrap();
        assert!(verifier.starts_with("$argon2id$"));
        assert!(!verifier.contains("Tr0ub4dor"));
    }

    #[test]
    fn test_same_password_different_verifiers() {
        let a = hash_password("Tr0ub4dor&3", &cheap()).unwrap();
        let b = hash_password("Tr0ub4dor&3", &cheap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_verifier() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(CryptoError::InvalidVerifier(_))));
    }
}
