//! # memoria-core
//!
//! Core types, errors and recall logic for memoria journals.
//!
//! This crate holds the data model shared by the store and its front ends,
//! the error taxonomy, configuration, and the Dream Echo recall selector.

pub mod config;
pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod recall;
pub mod response;
pub mod search;
pub mod stats;

// Re-export commonly used types at crate root
pub use config::JournalConfig;
pub use error::{Error, ErrorKind, Result};
pub use file_safety::{check_attachment_size, normalize_mime_type, sanitize_filename};
pub use models::*;
pub use recall::{select_next, RecallHistory};
pub use response::{ApiResponse, AttachmentView, EntryView, ErrorBody, MetadataView};
