//! # memoria-store
//!
//! Durable, crash-safe storage for memoria journals.
//!
//! - [`FilesystemBackend`]: atomic temp-file + rename writes
//! - [`EntryRepository`]: records, in-memory index, attachments, backup
//! - [`Journal`]: session handling and the operations front ends call
//!
//! ## Example
//!
//! ```rust,no_run
//! use memoria_core::{JournalConfig, MemoryType, NewEntry};
//! use memoria_store::Journal;
//!
//! # async fn demo() -> memoria_core::Result<()> {
//! let journal = Journal::open(JournalConfig::from_env()).await?;
//! if !journal.has_master_password().await {
//!     journal.set_master_password("Tr0ub4dor&3").await?;
//! }
//! journal.verify_master_password("Tr0ub4dor&3").await?;
//!
//! let entry = journal
//!     .create_entry(NewEntry::new("Title", "Body", MemoryType::Text), true)
//!     .await?;
//! journal.lock_session().await;
//! # let _ = entry;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod journal;
pub mod keyring;
pub mod paths;
pub mod record;
pub mod recovery;
pub mod rekey;
pub mod repository;

// Re-export commonly used types
pub use backend::{FilesystemBackend, StorageBackend};
pub use journal::{generate_secure_password, password_strength, Journal};
pub use keyring::Keyring;
pub use recovery::{RecoveryReport, RekeyRecovery};
pub use repository::{BackupReport, EntryRepository};
