//! Format detection for stored blobs.
//!
//! Attachment blobs are either raw bytes or a sealed envelope (MEMENV01).

use crate::format::{BlobFormat, MAGIC_ENVELOPE};

/// Detect the format of a blob from its bytes.
pub fn detect_format(data: &[u8]) -> BlobFormat {
    if data.len() >= MAGIC_ENVELOPE.len() && &data[..MAGIC_ENVELOPE.len()] == MAGIC_ENVELOPE {
        BlobFormat::Sealed
    } else {
        BlobFormat::Plain
    }
}

/// Check if a blob is a sealed envelope.
pub fn is_sealed(data: &[u8]) -> bool {
    matches!(detect_format(data), BlobFormat::Sealed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_plain() {
        let data = b"Just plain text data";

        assert_eq!(detect_format(data), BlobFormat::Plain);
        assert!(!is_sealed(data));
    }

    #[test]
    fn test_detect_sealed_magic() {
        let mut data = MAGIC_ENVELOPE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0]);

        assert_eq!(detect_format(&data), BlobFormat::Sealed);
        assert!(is_sealed(&data));
    }

    #[test]
    fn test_detect_partial_magic() {
        assert_eq!(detect_format(b"MEMENV0"), BlobFormat::Plain);
    }

    #[test]
    fn test_detect_empty() {
        let data: &[u8] = &[];
        assert_eq!(detect_format(data), BlobFormat::Plain);
    }
}
