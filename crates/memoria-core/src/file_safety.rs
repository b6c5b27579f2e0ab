//! Attachment input validation.

use crate::defaults;
use crate::error::{Error, Result};

const MAX_FILE_NAME_LEN: usize = 255;
const FALLBACK_MIME: &str = "application/octet-stream";

/// Validate MIME type format (`type/subtype`, token characters only).
pub fn is_valid_mime_type(mime: &str) -> bool {
    let Some((media_type, subtype)) = mime.split_once('/') else {
        return false;
    };
    if media_type.is_empty() || subtype.is_empty() || subtype.contains('/') {
        return false;
    }
    let is_token_char = |c: char| -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '!' | '#' | '$' | '&' | '-' | '^' | '_' | '.' | '+')
    };
    media_type.chars().all(is_token_char) && subtype.chars().all(is_token_char)
}

/// Normalize a claimed MIME type, falling back to `application/octet-stream`.
pub fn normalize_mime_type(mime: &str) -> String {
    let mime = mime.trim().to_ascii_lowercase();
    if is_valid_mime_type(&mime) {
        mime
    } else {
        FALLBACK_MIME.to_string()
    }
}

/// Strip path components and unsafe characters from a file name.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return "unnamed_file".to_string();
    }

    if sanitized.len() <= MAX_FILE_NAME_LEN {
        return sanitized.to_string();
    }

    // Truncate on a char boundary, keeping a short extension
    let (stem, ext) = match sanitized.rfind('.') {
        Some(dot) if sanitized.len() - dot <= 16 => sanitized.split_at(dot),
        _ => (sanitized, ""),
    };
    let mut cut = MAX_FILE_NAME_LEN - ext.len();
    while !stem.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &stem[..cut], ext)
}

/// Reject attachments over the size limit.
pub fn check_attachment_size(len: usize) -> Result<()> {
    if len > defaults::MAX_ATTACHMENT_BYTES {
        return Err(Error::InvalidInput(format!(
            "attachment is {} bytes, limit is {}",
            len,
            defaults::MAX_ATTACHMENT_BYTES
        )));
    }
    Ok(())
}
