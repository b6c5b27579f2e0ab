//! Self-describing AES-256-GCM envelopes.
//!
//! An [`Envelope`] carries everything needed to decrypt a secret except the
//! key: format version, algorithm, KDF version, the store salt the key was
//! derived from, a per-call nonce, and the ciphertext with its tag.
//!
//! Every header field is folded into the GCM associated data together with
//! the caller's context bytes, so editing any of them fails authentication.
//!
//! ## Binary framing (MEMENV01)
//!
//! ```text
//! +------------------+
//! | Magic: MEMENV01  | 8 bytes
//! +------------------+
//! | Header Length    | 4 bytes (little-endian)
//! +------------------+
//! | Header (JSON)    | Variable
//! +------------------+
//! | Ciphertext + tag | Variable (>= 16 bytes)
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};

use crate::cipher::{
    aes_gcm_decrypt, aes_gcm_encrypt, generate_nonce, KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN,
};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_decode_array, base64_encode, MAGIC_ENVELOPE};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u32 = 1;

/// Cipher identifier written into every envelope.
pub const ALGORITHM: &str = "aes-256-gcm";

const AAD_DOMAIN: &[u8] = b"memoria-envelope";

/// An encrypted payload plus the metadata needed to open it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeJson", into = "EnvelopeJson")]
pub struct Envelope {
    version: u32,
    kdf_version: u32,
    salt: [u8; SALT_LEN],
    nonce: [u8; NONCE_LEN],
    ciphertext: Vec<u8>,
}

impl Envelope {
    /// Encrypt `plaintext` under `key` with a fresh random nonce.
    pub fn seal(
        key: &[u8; KEY_LEN],
        kdf_version: u32,
        salt: &[u8; SALT_LEN],
        plaintext: &[u8],
        context: &[u8],
    ) -> CryptoResult<Self> {
        let mut envelope = Self {
            version: ENVELOPE_VERSION,
            kdf_version,
            salt: *salt,
            nonce: generate_nonce(),
            ciphertext: Vec::new(),
        };
        let aad = envelope.associated_data(context);
        envelope.ciphertext = aes_gcm_encrypt(key, &envelope.nonce, plaintext, &aad)?;
        Ok(envelope)
    }

    /// Decrypt with `key`, requiring the same `context` used when sealing.
    pub fn open(&self, key: &[u8; KEY_LEN], context: &[u8]) -> CryptoResult<Vec<u8>> {
        let aad = self.associated_data(context);
        aes_gcm_decrypt(key, &self.nonce, &self.ciphertext, &aad)
    }

    /// KDF version of the key that sealed this envelope.
    pub fn kdf_version(&self) -> u32 {
        self.kdf_version
    }

    /// Salt of the key that sealed this envelope.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// Nonce used for this envelope.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }

    /// Ciphertext with the trailing authentication tag.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Mutable access to the raw ciphertext, for corruption tests.
    #[doc(hidden)]
    pub fn ciphertext_mut(&mut self) -> &mut Vec<u8> {
        &mut self.ciphertext
    }

    fn associated_data(&self, context: &[u8]) -> Vec<u8> {
        let mut aad = Vec::with_capacity(
            AAD_DOMAIN.len() + 8 + ALGORITHM.len() + SALT_LEN + NONCE_LEN + 8 + context.len(),
        );
        aad.extend_from_slice(AAD_DOMAIN);
        aad.extend_from_slice(&self.version.to_le_bytes());
        aad.extend_from_slice(ALGORITHM.as_bytes());
        aad.extend_from_slice(&self.kdf_version.to_le_bytes());
        aad.extend_from_slice(&self.salt);
        aad.extend_from_slice(&self.nonce);
        aad.extend_from_slice(&(context.len() as u64).to_le_bytes());
        aad.extend_from_slice(context);
        aad
    }

    /// Serialize to the MEMENV01 binary framing.
    pub fn to_bytes(&self) -> CryptoResult<Vec<u8>> {
        let header = EnvelopeHeader::from(self);
        let header_json = serde_json::to_vec(&header)?;
        let header_len = (header_json.len() as u32).to_le_bytes();

        let mut output =
            Vec::with_capacity(8 + 4 + header_json.len() + self.ciphertext.len());
        output.extend_from_slice(MAGIC_ENVELOPE);
        output.extend_from_slice(&header_len);
        output.extend_from_slice(&header_json);
        output.extend_from_slice(&self.ciphertext);
        Ok(output)
    }

    /// Parse the MEMENV01 binary framing.
    pub fn from_bytes(data: &[u8]) -> CryptoResult<Self> {
        if data.len() < 12 {
            return Err(CryptoError::InvalidFormat("Blob too short".to_string()));
        }
        if &data[0..8] != MAGIC_ENVELOPE {
            return Err(CryptoError::InvalidMagic);
        }

        let header_len = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
        let body_start = 12usize
            .checked_add(header_len)
            .ok_or_else(|| CryptoError::InvalidFormat("Invalid header length".to_string()))?;
        if data.len() < body_start + TAG_LEN {
            return Err(CryptoError::InvalidFormat("Blob truncated".to_string()));
        }

        let header: EnvelopeHeader = serde_json::from_slice(&data[12..body_start])?;
        header.into_envelope(data[body_start..].to_vec())
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Envelope")
            .field("version", &self.version)
            .field("kdf_version", &self.kdf_version)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Header fields shared by both encodings.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeHeader {
    version: u32,
    algorithm: String,
    kdf_version: u32,
    salt: String,
    nonce: String,
}

impl From<&Envelope> for EnvelopeHeader {
    fn from(envelope: &Envelope) -> Self {
        Self {
            version: envelope.version,
            algorithm: ALGORITHM.to_string(),
            kdf_version: envelope.kdf_version,
            salt: base64_encode(&envelope.salt),
            nonce: base64_encode(&envelope.nonce),
        }
    }
}

impl EnvelopeHeader {
    fn into_envelope(self, ciphertext: Vec<u8>) -> CryptoResult<Envelope> {
        if self.version != ENVELOPE_VERSION {
            return Err(CryptoError::UnsupportedVersion(self.version));
        }
        if self.algorithm != ALGORITHM {
            return Err(CryptoError::InvalidFormat(format!(
                "Unsupported algorithm: {}",
                self.algorithm
            )));
        }
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::InvalidFormat(
                "Ciphertext shorter than tag".to_string(),
            ));
        }
        Ok(Envelope {
            version: self.version,
            kdf_version: self.kdf_version,
            salt: base64_decode_array(&self.salt, "salt")?,
            nonce: base64_decode_array(&self.nonce, "nonce")?,
            ciphertext,
        })
    }
}

/// JSON encoding used inside entry records.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeJson {
    #[serde(flatten)]
    header: EnvelopeHeader,
    ciphertext: String,
}

impl From<Envelope> for EnvelopeJson {
    fn from(envelope: Envelope) -> Self {
        Self {
            header: EnvelopeHeader::from(&envelope),
            ciphertext: base64_encode(&envelope.ciphertext),
        }
    }
}

impl TryFrom<EnvelopeJson> for Envelope {
    type Error = CryptoError;

    fn try_from(json: EnvelopeJson) -> CryptoResult<Self> {
        let ciphertext = base64_decode(&json.ciphertext)?;
        json.header.into_envelope(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [42u8; 32];
    const SALT: [u8; 32] = [7u8; 32];

    fn sealed(plaintext: &[u8], context: &[u8]) -> Envelope {
        Envelope::seal(&KEY, 1, &SALT, plaintext, context).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let envelope = sealed(b"Body", b"entry:1");
        assert_eq!(envelope.open(&KEY, b"entry:1").unwrap(), b"Body");
    }

    #[test]
    fn test_fresh_nonce_per_seal() {
        let a = sealed(b"same", b"ctx");
        let b = sealed(b"same", b"ctx");
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
    }

    #[test]
    fn test_wrong_key_fails_authentication() {
        let envelope = sealed(b"Body", b"ctx");
        let result = envelope.open(&[1u8; 32], b"ctx");
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_context_swap_fails_authentication() {
        let envelope = sealed(b"Body", b"entry:a");
        let result = envelope.open(&KEY, b"entry:b");
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_every_ciphertext_bit_flip_detected() {
        let envelope = sealed(b"short secret", b"ctx");
        for byte in 0..envelope.ciphertext().len() {
            for bit in 0..8 {
                let mut tampered = envelope.clone();
                tampered.ciphertext_mut()[byte] ^= 1 << bit;
                let result = tampered.open(&KEY, b"ctx");
                assert!(
                    matches!(result, Err(CryptoError::Authentication)),
                    "flip at byte {byte} bit {bit} was not detected"
                );
            }
        }
    }

    #[test]
    fn test_nonce_and_salt_bit_flips_detected() {
        let envelope = sealed(b"secret", b"ctx");
        for byte in 0..NONCE_LEN {
            let mut tampered = envelope.clone();
            tampered.nonce[byte] ^= 0x01;
            assert!(matches!(
                tampered.open(&KEY, b"ctx"),
                Err(CryptoError::Authentication)
            ));
        }
        for byte in 0..SALT_LEN {
            let mut tampered = envelope.clone();
            tampered.salt[byte] ^= 0x80;
            assert!(matches!(
                tampered.open(&KEY, b"ctx"),
                Err(CryptoError::Authentication)
            ));
        }
    }

    #[test]
    fn test_kdf_version_edit_detected() {
        let mut envelope = sealed(b"secret", b"ctx");
        envelope.kdf_version ^= 1;
        assert!(matches!(
            envelope.open(&KEY, b"ctx"),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_context_bit_flips_detected() {
        let context = b"memoria:entry:abc:content".to_vec();
        let envelope = sealed(b"secret", &context);
        for byte in 0..context.len() {
            let mut altered = context.clone();
            altered[byte] ^= 0x01;
            assert!(matches!(
                envelope.open(&KEY, &altered),
                Err(CryptoError::Authentication)
            ));
        }
    }

    #[test]
    fn test_json_roundtrip_preserves_envelope() {
        let envelope = sealed(b"json body", b"ctx");
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"aes-256-gcm\""));

        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
        assert_eq!(parsed.open(&KEY, b"ctx").unwrap(), b"json body");
    }

    #[test]
    fn test_json_rejects_bad_nonce_length() {
        let envelope = sealed(b"x", b"ctx");
        let mut value = serde_json::to_value(&envelope).unwrap();
        value["nonce"] = serde_json::Value::String(base64_encode(&[0u8; 8]));

        let result = serde_json::from_value::<Envelope>(value);
        assert!(result.is_err());
    }

    #[test]
    fn test_json_rejects_unknown_algorithm() {
        let envelope = sealed(b"x", b"ctx");
        let mut value = serde_json::to_value(&envelope).unwrap();
        value["algorithm"] = serde_json::Value::String("rot13".into());

        assert!(serde_json::from_value::<Envelope>(value).is_err());
    }

    #[test]
    fn test_binary_framing_roundtrip() {
        let envelope = sealed(b"attachment bytes", b"ctx");
        let bytes = envelope.to_bytes().unwrap();
        assert_eq!(&bytes[0..8], MAGIC_ENVELOPE);

        let parsed = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.open(&KEY, b"ctx").unwrap(), b"attachment bytes");
    }

    #[test]
    fn test_binary_framing_tampered_tail() {
        let envelope = sealed(b"attachment bytes", b"ctx");
        let mut bytes = envelope.to_bytes().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let parsed = Envelope::from_bytes(&bytes).unwrap();
        assert!(matches!(
            parsed.open(&KEY, b"ctx"),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn test_binary_framing_invalid_magic() {
        let mut data = vec![0u8; 64];
        data[0..8].copy_from_slice(b"INVALID!");
        assert!(matches!(
            Envelope::from_bytes(&data),
            Err(CryptoError::InvalidMagic)
        ));
    }

    #[test]
    fn test_binary_framing_truncated() {
        let envelope = sealed(b"attachment bytes", b"ctx");
        let bytes = envelope.to_bytes().unwrap();
        let header_len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;

        let result = Envelope::from_bytes(&bytes[..12 + header_len + 4]);
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_debug_hides_ciphertext() {
        let envelope = sealed(b"Body", b"ctx");
        let debug = format!("{:?}", envelope);
        assert!(debug.contains("ciphertext_len"));
    }
}
