//! In-memory session holding the derived encryption key.
//!
//! A [`Session`] exists only between a successful password verification and
//! the next lock. Dropping it zeroizes the key.

use crate::cipher::SALT_LEN;
use crate::envelope::Envelope;
use crate::error::CryptoResult;
use crate::kdf::{DerivedKey, KdfDescriptor};

/// Unlocked key material for sealing and opening envelopes.
pub struct Session {
    key: DerivedKey,
    salt: [u8; SALT_LEN],
    kdf: KdfDescriptor,
}

impl Session {
    /// Derive the session key from a password and the stored salt.
    pub fn derive(password: &[u8], salt: &[u8; SALT_LEN], kdf: KdfDescriptor) -> CryptoResult<Self> {
        let key = kdf.derive(password, salt)?;
        Ok(Self::from_key(key, *salt, kdf))
    }

    /// Wrap an already-derived key.
    pub fn from_key(key: DerivedKey, salt: [u8; SALT_LEN], kdf: KdfDescriptor) -> Self {
        Self { key, salt, kdf }
    }

    /// Encrypt `plaintext`, binding `context` into the authentication tag.
    pub fn seal(&self, plaintext: &[u8], context: &[u8]) -> CryptoResult<Envelope> {
        Envelope::seal(
            self.key.as_bytes(),
            self.kdf.version,
            &self.salt,
            plaintext,
            context,
        )
    }

    /// Decrypt an envelope sealed under this session's key.
    pub fn open(&self, envelope: &Envelope, context: &[u8]) -> CryptoResult<Vec<u8>> {
        envelope.open(self.key.as_bytes(), context)
    }

    /// Salt the key was derived from.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// KDF descriptor the key was derived with.
    pub fn kdf(&self) -> &KdfDescriptor {
        &self.kdf
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("kdf", &self.kdf)
            .finish()
    }
}
