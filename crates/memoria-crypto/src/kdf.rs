//! Key derivation using Argon2id.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher::{KEY_LEN, SALT_LEN};
use crate::error::{CryptoError, CryptoResult};

/// Current KDF descriptor version written to new keyrings.
pub const KDF_VERSION: u32 = 1;

/// Argon2id parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory in KiB (default: 65536 = 64 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 3).
    pub iterations: u32,
    /// Parallelism degree (default: 4).
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl KdfParams {
    /// Create parameters with explicit costs.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// Create low-memory parameters (for resource-constrained environments).
    pub fn low_memory() -> Self {
        Self {
            memory_kib: 32768, // 32 MiB
            iterations: 4,
            parallelism: 4,
        }
    }

    /// Create high-security parameters (for long-term archives).
    pub fn high_security() -> Self {
        Self {
            memory_kib: 131072, // 128 MiB
            iterations: 4,
            parallelism: 4,
        }
    }

    pub(crate) fn to_argon2(self) -> CryptoResult<Argon2<'static>> {
        let params = Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Key derivation algorithm recorded alongside the salt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KdfAlgorithm {
    Argon2id,
}

/// Versioned description of how a key was derived.
///
/// Persisted next to the salt so stores written with older costs keep
/// opening after the defaults are raised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfDescriptor {
    pub version: u32,
    pub algorithm: KdfAlgorithm,
    pub params: KdfParams,
}

impl KdfDescriptor {
    /// Descriptor for the current KDF version with the given costs.
    pub fn current(params: KdfParams) -> Self {
        Self {
            version: KDF_VERSION,
            algorithm: KdfAlgorithm::Argon2id,
            params,
        }
    }

    /// Derive a key with this descriptor, rejecting unknown versions.
    pub fn derive(&self, password: &[u8], salt: &[u8; SALT_LEN]) -> CryptoResult<DerivedKey> {
        if self.version != KDF_VERSION {
            return Err(CryptoError::UnsupportedVersion(self.version));
        }
        match self.algorithm {
            KdfAlgorithm::Argon2id => derive_key(password, salt, &self.params),
        }
    }
}

/// Key wrapper with automatic zeroization on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_LEN],
}

impl DerivedKey {
    /// Create a new derived key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { key: bytes }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.key
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit key from a password using Argon2id.
///
/// Deterministic for the same password, salt and parameters.
pub fn derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &KdfParams,
) -> CryptoResult<DerivedKey> {
    let argon2 = params.to_argon2()?;

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let derived = DerivedKey::from_bytes(key);
    key.zeroize();
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> KdfParams {
        KdfParams::new(1024, 1, 1)
    }

    #[test]
    fn test_kdf_params_default() {
        let params = KdfParams::default();
        assert_eq!(params.memory_kib, 65536);
        assert_eq!(params.iterations, 3);
        assert_eq!(params.parallelism, 4);
    }

    #[test]
    fn test_kdf_params_presets() {
        assert_eq!(KdfParams::low_memory().memory_kib, 32768);
        assert_eq!(KdfParams::high_security().memory_kib, 131072);
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [42u8; 32];

        let key1 = derive_key(b"Tr0ub4dor&3", &salt, &cheap()).unwrap();
        let key2 = derive_key(b"Tr0ub4dor&3", &salt, &cheap()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_salts() {
        let key1 = derive_key(b"Tr0ub4dor&3", &[1u8; 32], &cheap()).unwrap();
        let key2 = derive_key(b"Tr0ub4dor&3", &[2u8; 32], &cheap()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_different_params() {
        let salt = [7u8; 32];
        let key1 = derive_key(b"Tr0ub4dor&3", &salt, &cheap()).unwrap();
        let key2 = derive_key(b"Tr0ub4dor&3", &salt, &KdfParams::new(2048, 1, 1)).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_derive_key_rejects_invalid_params() {
        let result = derive_key(b"pw", &[0u8; 32], &KdfParams::new(1, 0, 1));
        assert!(matches!(result, Err(CryptoError::KeyDerivation(_))));
    }

    #[test]
    fn test_descriptor_rejects_unknown_version() {
        let mut descriptor = KdfDescriptor::current(cheap());
        descriptor.version = 99;

        let result = descriptor.derive(b"pw", &[0u8; 32]);
        assert!(matches!(result, Err(CryptoError::UnsupportedVersion(99))));
    }

    #[test]
    fn test_descriptor_matches_direct_derivation() {
        let salt = [9u8; 32];
        let via_descriptor = KdfDescriptor::current(cheap())
            .derive(b"Tr0ub4dor&3", &salt)
            .unwrap();
        let direct = derive_key(b"Tr0ub4dor&3", &salt, &cheap()).unwrap();

        assert_eq!(via_descriptor.as_bytes(), direct.as_bytes());
    }

    #[test]
    fn test_derived_key_debug_redacted() {
        let key = DerivedKey::from_bytes([0u8; 32]);
        let debug_str = format!("{:?}", key);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("0"));
    }

    #[test]
    fn test_descriptor_serialization() {
        let descriptor = KdfDescriptor::current(KdfParams::default());
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("\"argon2id\""));
        let parsed: KdfDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(descriptor, parsed);
    }
}
