//! Centralized default constants for memoria.
//!
//! Every crate references these instead of defining its own magic numbers.

// =============================================================================
// PASSWORDS
// =============================================================================

/// Minimum strength score (0-100) accepted for a master password.
pub const MIN_PASSWORD_SCORE: u8 = 60;

/// Length of passwords produced by the generator when none is given.
pub const GENERATED_PASSWORD_LENGTH: usize = 20;

// =============================================================================
// RECALL
// =============================================================================

/// Number of recently recalled entries kept out of the candidate pool.
pub const RECALL_HISTORY_CAPACITY: usize = 10;

// =============================================================================
// METADATA
// =============================================================================

/// Characters per minute used for the reading-time estimate.
pub const READING_CHARS_PER_MINUTE: u32 = 200;

// =============================================================================
// STORAGE
// =============================================================================

/// Directory name used under the platform data directory.
pub const DATA_DIR_NAME: &str = "memoria";

/// Largest attachment accepted, in bytes (64 MiB).
pub const MAX_ATTACHMENT_BYTES: usize = 64 * 1024 * 1024;
