//! Shared format utilities.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Magic bytes for the binary sealed-blob framing.
pub const MAGIC_ENVELOPE: &[u8; 8] = b"MEMENV01";

/// Blob format type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobFormat {
    /// Sealed envelope (MEMENV01).
    Sealed,
    /// Plain bytes.
    Plain,
}

/// Encode bytes as base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64: {}", e)))
}

/// Decode a base64 string into a fixed-size array.
pub fn base64_decode_array<const N: usize>(data: &str, what: &str) -> CryptoResult<[u8; N]> {
    let bytes = base64_decode(data)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CryptoError::InvalidFormat(format!(
            "Invalid {} length: expected {}, got {}",
            what,
            N,
            bytes.len()
        ))
    })
}
