//! Structured logging field name constants for memoria.
//!
//! All crates use these names so log output can be filtered consistently.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Store cannot be opened or a commit failed |
//! | WARN  | Recovery action taken, failed unlock attempt |
//! | INFO  | Lifecycle events (open, unlock, lock, re-key) |
//! | DEBUG | Decision points, per-operation completions |
//! | TRACE | Per-record iteration |
//!
//! Plaintext content, passwords and key material are never logged.

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "store", "crypto", "recall", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "create", "update", "delete", "rekey", "recover"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Entry UUID being operated on.
pub const ENTRY_ID: &str = "entry_id";

/// Attachment UUID being operated on.
pub const ATTACHMENT_ID: &str = "attachment_id";

/// Whether the entry payload is sealed.
pub const ENCRYPTED: &str = "encrypted";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entries loaded, returned or processed.
pub const ENTRY_COUNT: &str = "entry_count";

/// Byte length of a blob written or read.
pub const BYTE_LEN: &str = "byte_len";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_are_snake_case_and_unique() {
        let fields = [
            SUBSYSTEM,
            OPERATION,
            ENTRY_ID,
            ATTACHMENT_ID,
            ENCRYPTED,
            DURATION_MS,
            ENTRY_COUNT,
            BYTE_LEN,
            SUCCESS,
            ERROR_MSG,
        ];
        for field in fields {
            assert!(field
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        let unique: std::collections::HashSet<_> = fields.iter().collect();
        assert_eq!(unique.len(), fields.len());
    }
}
