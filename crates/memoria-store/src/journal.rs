//! The `Journal` facade: the request/response surface front ends call.
//!
//! Owns the session slot and the recall history; delegates persistence to
//! the [`EntryRepository`] behind a read/write lock. Mutations hold the write
//! lock through their durable write, so overlapping mutations queue and no
//! reader observes a half-applied change.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use memoria_core::{
    select_next, Attachment, EntryPatch, Error, JournalConfig, MemoryEntry, MemoryStats, NewEntry,
    RecallHistory, Result, SearchFilter,
};
use memoria_crypto::{check_strength, Session};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{FilesystemBackend, StorageBackend};
use crate::keyring::Keyring;
use crate::recovery::RecoveryReport;
use crate::repository::{BackupReport, EntryRepository};

pub use memoria_crypto::{generate_secure_password, password_strength};

/// An open journal.
pub struct Journal {
    config: JournalConfig,
    repo: RwLock<EntryRepository>,
    session: RwLock<Option<Arc<Session>>>,
    history: Mutex<RecallHistory<Uuid>>,
}

/// Run Argon2 work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("key derivation task failed: {e}")))?
}

impl Journal {
    /// Open (initialize) the journal in `config.data_dir`.
    pub async fn open(config: JournalConfig) -> Result<Self> {
        let backend = FilesystemBackend::new(&config.data_dir);
        backend.validate().await?;
        Self::open_with_backend(config, Arc::new(backend)).await
    }

    /// Open over an explicit storage backend.
    pub async fn open_with_backend(
        config: JournalConfig,
        backend: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let repo = EntryRepository::open(backend).await?;
        info!(
            subsystem = "store",
            op = "open",
            data_dir = %config.data_dir.display(),
            entry_count = repo.len(),
            "Journal opened"
        );
        Ok(Self {
            history: Mutex::new(RecallHistory::new(config.recall_history)),
            config,
            repo: RwLock::new(repo),
            session: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// What startup recovery repaired when this journal was opened.
    pub async fn recovery_report(&self) -> RecoveryReport {
        self.repo.read().await.recovery_report().clone()
    }

    async fn current_session(&self) -> Option<Arc<Session>> {
        self.session.read().await.clone()
    }

    // =========================================================================
    // MASTER PASSWORD & SESSION
    // =========================================================================

    /// Whether a master password has been set.
    pub async fn has_master_password(&self) -> bool {
        self.repo.read().await.keyring().is_some()
    }

    /// Set the first master password and unlock.
    pub async fn set_master_password(&self, password: &str) -> Result<()> {
        check_strength(password, self.config.min_password_score)?;

        let mut repo = self.repo.write().await;
        if repo.keyring().is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let password = password.to_string();
        let params = self.config.kdf_params;
        let (keyring, session) = blocking(move || Keyring::create(&password, params)).await?;

        repo.init_keyring(keyring).await?;
        *self.session.write().await = Some(Arc::new(session));

        info!(subsystem = "store", op = "set_password", "Master password set");
        Ok(())
    }

    /// Check `password`; on success derive and install the session.
    ///
    /// Returns `false` when no password is set or it does not match.
    pub async fn verify_master_password(&self, password: &str) -> Result<bool> {
        let start = Instant::now();
        // Held until the session is installed so a concurrent password change
        // cannot swap the keyring underneath a stale session.
        let repo = self.repo.read().await;
        let Some(keyring) = repo.keyring().cloned() else {
            return Ok(false);
        };

        let password = password.to_string();
        let unlocked = blocking(move || keyring.unlock(&password)).await?;

        match unlocked {
            Some(session) => {
                *self.session.write().await = Some(Arc::new(session));
                drop(repo);
                info!(
                    subsystem = "store",
                    op = "unlock",
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Journal unlocked"
                );
                Ok(true)
            }
            None => {
                warn!(subsystem = "store", op = "unlock", success = false, "Master password rejected");
                Ok(false)
            }
        }
    }

    /// Whether a session is held.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Drop the session. The key is zeroized once in-flight operations finish.
    pub async fn lock_session(&self) {
        if self.session.write().await.take().is_some() {
            info!(subsystem = "store", op = "lock", "Journal locked");
        }
    }

    /// Change the master password, re-encrypting everything sealed.
    ///
    /// All-or-nothing: on failure the old password still opens the store.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        check_strength(new_password, self.config.min_password_score)?;

        let mut repo = self.repo.write().await;
        let keyring = repo.keyring().cloned().ok_or(Error::NotAuthenticated)?;

        let old_password = old_password.to_string();
        let new_password = new_password.to_string();
        let params = self.config.kdf_params;
        let (old_session, new_keyring, new_session) = blocking(move || {
            let old_session = keyring
                .unlock(&old_password)?
                .ok_or(Error::AuthenticationFailed)?;
            let (new_keyring, new_session) = keyring.rotate(&new_password, params)?;
            Ok((old_session, new_keyring, new_session))
        })
        .await?;

        let result = repo
            .rekey(&old_session, &new_session, new_keyring.clone())
            .await;

        // Past the commit marker the new key is authoritative even if moving
        // staged files failed; the next write or open finishes the move.
        if repo.keyring() == Some(&new_keyring) {
            *self.session.write().await = Some(Arc::new(new_session));
            info!(subsystem = "store", op = "change_password", "Master password changed");
        }
        result
    }

    // =========================================================================
    // ENTRIES
    // =========================================================================

    /// Create an entry. Encrypted entries need an unlocked journal.
    pub async fn create_entry(&self, new: NewEntry, encrypt: bool) -> Result<MemoryEntry> {
        let mut repo = self.repo.write().await;
        let session = self.current_session().await;
        repo.create(new, encrypt, session.as_deref()).await
    }

    pub async fn update_entry(&self, id: &Uuid, patch: EntryPatch) -> Result<MemoryEntry> {
        let mut repo = self.repo.write().await;
        let session = self.current_session().await;
        repo.update(id, patch, session.as_deref()).await
    }

    pub async fn delete_entry(&self, id: &Uuid) -> Result<()> {
        self.repo.write().await.delete(id).await
    }

    pub async fn get_entry(&self, id: &Uuid) -> Result<MemoryEntry> {
        let repo = self.repo.read().await;
        let session = self.current_session().await;
        repo.get(id, session.as_deref())
    }

    /// Every entry in insertion order. Fails whole when locked with sealed entries.
    pub async fn get_all_entries(&self) -> Result<Vec<MemoryEntry>> {
        let repo = self.repo.read().await;
        let session = self.current_session().await;
        let entries = repo.get_all(session.as_deref())?;
        debug!(subsystem = "store", op = "get_all", entry_count = entries.len(), "Entries loaded");
        Ok(entries)
    }

    /// Unlock with `password`, then return every entry.
    pub async fn get_all_entries_with_password(&self, password: &str) -> Result<Vec<MemoryEntry>> {
        if !self.verify_master_password(password).await? {
            return Err(Error::AuthenticationFailed);
        }
        self.get_all_entries().await
    }

    pub async fn search_entries(&self, filter: &SearchFilter) -> Result<Vec<MemoryEntry>> {
        let repo = self.repo.read().await;
        let session = self.current_session().await;
        repo.search(filter, session.as_deref())
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        Ok(self.repo.read().await.stats(Utc::now().date_naive()))
    }

    /// Dream Echo: resurface a past entry, avoiding recent repeats.
    ///
    /// Locked journals draw only from unencrypted entries. `None` when the
    /// pool is empty.
    pub async fn get_random_entry(&self) -> Result<Option<MemoryEntry>> {
        let repo = self.repo.read().await;
        let session = self.current_session().await;
        let ids = repo.ids(session.is_some());

        let mut history = self.history.lock().await;
        let (selected, next) = {
            let mut rng = rand::thread_rng();
            select_next(ids.as_slice(), &*history, &mut rng)
        };
        *history = next;
        drop(history);

        match selected {
            Some(id) => {
                debug!(subsystem = "recall", entry_id = %id, entry_count = ids.len(), "Recalled entry");
                repo.get(&id, session.as_deref()).map(Some)
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // ATTACHMENTS
    // =========================================================================

    pub async fn add_attachment(
        &self,
        entry_id: &Uuid,
        file_name: &str,
        file_type: &str,
        data: &[u8],
    ) -> Result<Attachment> {
        let mut repo = self.repo.write().await;
        let session = self.current_session().await;
        repo.add_attachment(entry_id, file_name, file_type, data, session.as_deref())
            .await
    }

    pub async fn read_attachment(
        &self,
        entry_id: &Uuid,
        attachment_id: &Uuid,
    ) -> Result<(Attachment, Vec<u8>)> {
        let repo = self.repo.read().await;
        let session = self.current_session().await;
        repo.read_attachment(entry_id, attachment_id, session.as_deref())
            .await
    }

    pub async fn remove_attachment(&self, entry_id: &Uuid, attachment_id: &Uuid) -> Result<()> {
        self.repo
            .write()
            .await
            .remove_attachment(entry_id, attachment_id)
            .await
    }

    // =========================================================================
    // BACKUP
    // =========================================================================

    /// Copy the sealed store into `dest`, which must not already hold a journal.
    pub async fn backup(&self, dest: impl AsRef<Path>) -> Result<BackupReport> {
        let dest = dest.as_ref();
        if dest == self.config.data_dir.as_path() {
            return Err(Error::InvalidInput(
                "backup destination is the journal itself".to_string(),
            ));
        }
        let mut repo = self.repo.write().await;
        repo.settle_rekey().await?;
        repo.backup(&FilesystemBackend::new(dest)).await
    }
}
