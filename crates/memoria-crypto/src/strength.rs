//! Password strength scoring and generation.

use rand::Rng;

use crate::error::{CryptoError, CryptoResult};

/// Characters used by [`generate_secure_password`].
const PASSWORD_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Score a password on a 0-100 scale.
///
/// Length contributes up to 50 points (8, 12 and 16 characters), each
/// character class (lowercase, uppercase, digit) 10 points, and any
/// non-alphanumeric character 20 points.
pub fn password_strength(password: &str) -> u8 {
    if password.is_empty() {
        return 0;
    }

    let length = password.chars().count();
    let mut score = 0u8;

    if length >= 8 {
        score += 25;
    }
    if length >= 12 {
        score += 15;
    }
    if length >= 16 {
        score += 10;
    }

    if password.chars().any(|c| c.is_ascii_lowercase()) {
        score += 10;
    }
    if password.chars().any(|c| c.is_ascii_uppercase()) {
        score += 10;
    }
    if password.chars().any(|c| c.is_ascii_digit()) {
        score += 10;
    }
    if password.chars().any(|c| !c.is_alphanumeric()) {
        score += 20;
    }

    score.min(100)
}

/// Reject passwords scoring below `required`, returning the score otherwise.
pub fn check_strength(password: &str, required: u8) -> CryptoResult<u8> {
    let score = password_strength(password);
    if score < required {
        return Err(CryptoError::WeakPassword { score, required });
    }
    Ok(score)
}

/// Generate a random password from a mixed-class alphabet.
pub fn generate_secure_password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| PASSWORD_CHARSET[rng.gen_range(0..PASSWORD_CHARSET.len())] as char)
        .collect()
}
