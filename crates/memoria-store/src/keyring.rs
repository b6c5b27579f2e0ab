//! Master keyring file (`master.json`).
//!
//! Holds everything needed to check a password and re-derive the session key:
//! the store salt, the KDF descriptor and an Argon2id verifier. Never holds
//! the key itself.

use chrono::{DateTime, Utc};
use memoria_core::{Error, Result};
use memoria_crypto::{
    base64_decode_array, base64_encode, generate_salt, hash_password, verify_password,
    KdfDescriptor, KdfParams, Session, SALT_LEN,
};
use serde::{Deserialize, Serialize};

use crate::backend::StorageBackend;
use crate::paths;

/// Format tag written into every keyring.
pub const KEYRING_FORMAT: &str = "memoria-keyring-v1";

/// Persisted master password material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Keyring {
    pub format: String,
    pub kdf: KdfDescriptor,
    /// Store salt for key derivation (base64, 32 bytes)
    pub salt: String,
    /// Argon2id PHC string with its own salt
    pub verifier: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Keyring {
    /// Build a keyring for `password` and derive its session.
    ///
    /// Runs Argon2id twice; call from a blocking context.
    pub fn create(password: &str, params: KdfParams) -> Result<(Self, Session)> {
        let now = Utc::now();
        let salt = generate_salt();
        let kdf = KdfDescriptor::current(params);

        let verifier = hash_password(password, &params)?;
        let session = Session::derive(password.as_bytes(), &salt, kdf)?;

        let keyring = Self {
            format: KEYRING_FORMAT.to_string(),
            kdf,
            salt: base64_encode(&salt),
            verifier,
            created_at: now,
            updated_at: now,
        };
        Ok((keyring, session))
    }

    /// Replacement keyring for a new password, keeping the creation time.
    pub fn rotate(&self, new_password: &str, params: KdfParams) -> Result<(Self, Session)> {
        let (mut next, session) = Self::create(new_password, params)?;
        next.created_at = self.created_at;
        Ok((next, session))
    }

    /// Constant-time check of `password` against the verifier.
    pub fn verify(&self, password: &str) -> Result<bool> {
        Ok(verify_password(password, &self.verifier)?)
    }

    /// Derive the session for `password` from the stored salt and KDF.
    ///
    /// Does not check the verifier; a wrong password yields a session whose
    /// key fails every open.
    pub fn derive_session(&self, password: &str) -> Result<Session> {
        let salt = self.salt_bytes()?;
        Ok(Session::derive(password.as_bytes(), &salt, self.kdf)?)
    }

    /// Verify then derive. `Ok(None)` when the password is wrong.
    pub fn unlock(&self, password: &str) -> Result<Option<Session>> {
        if !self.verify(password)? {
            return Ok(None);
        }
        self.derive_session(password).map(Some)
    }

    pub fn salt_bytes(&self) -> Result<[u8; SALT_LEN]> {
        Ok(base64_decode_array(&self.salt, "salt")?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        let keyring: Keyring = serde_json::from_slice(data)
            .map_err(|e| Error::CorruptRecord(format!("{}: {}", paths::KEYRING, e)))?;
        if keyring.format != KEYRING_FORMAT {
            return Err(Error::CorruptRecord(format!(
                "{}: unknown format {}",
                paths::KEYRING,
                keyring.format
            )));
        }
        keyring.salt_bytes()?;
        Ok(keyring)
    }

    /// Load the keyring, if one has been written.
    pub async fn load(backend: &dyn StorageBackend) -> Result<Option<Self>> {
        if !backend.exists(paths::KEYRING).await? {
            return Ok(None);
        }
        let data = backend.read(paths::KEYRING).await?;
        Self::from_json(&data).map(Some)
    }

    /// Atomically write the keyring to `path`.
    pub async fn save(&self, backend: &dyn StorageBackend, path: &str) -> Result<()> {
        backend.write(path, &self.to_json()?).await
    }
}
