//! Whole-store re-encryption for a password change.
//!
//! Every sealed body and sealed attachment is re-sealed under the new key
//! into `rekey/` staging, together with the new keyring. Writing the
//! `rekey.commit` marker is the commit point: before it the live store is
//! untouched, after it the staged files are moved into place, on this run or
//! on the next open.

use std::collections::HashMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use memoria_core::{Error, Result};
use memoria_crypto::{Envelope, Session};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::keyring::Keyring;
use crate::paths;
use crate::record::{attachment_context, RecordBody, StoredRecord};
use crate::repository::EntryRepository;

/// Contents of the commit marker: every live path with a staged replacement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RekeyManifest {
    pub paths: Vec<String>,
    pub committed_at: DateTime<Utc>,
}

impl RekeyManifest {
    pub async fn load(backend: &dyn StorageBackend) -> Result<Option<Self>> {
        if !backend.exists(paths::REKEY_MARKER).await? {
            return Ok(None);
        }
        let data = backend.read(paths::REKEY_MARKER).await?;
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| Error::CorruptRecord(format!("{}: {}", paths::REKEY_MARKER, e)))
    }
}

/// Move staged files over their live paths, then clear staging and the marker.
///
/// Idempotent: paths already moved by an earlier attempt are skipped.
pub async fn roll_forward(backend: &dyn StorageBackend, manifest: &RekeyManifest) -> Result<usize> {
    let mut moved = 0;
    for path in &manifest.paths {
        let staged = paths::staged(path);
        if backend.exists(&staged).await? {
            backend.rename(&staged, path).await?;
            moved += 1;
        }
    }
    backend.remove_dir(paths::REKEY_DIR).await?;
    backend.delete(paths::REKEY_MARKER).await?;
    Ok(moved)
}

struct StagedRekey {
    paths: Vec<String>,
    records: HashMap<Uuid, StoredRecord>,
}

impl EntryRepository {
    /// Re-seal the whole store from `old` to `new` and install `keyring`.
    ///
    /// All-or-nothing: a failure before the commit marker leaves the store
    /// exactly as it was. Callers hold exclusive access for the duration.
    pub async fn rekey(&mut self, old: &Session, new: &Session, keyring: Keyring) -> Result<()> {
        self.settle_rekey().await?;
        let start = Instant::now();
        let backend = self.backend();

        backend.remove_dir(paths::REKEY_DIR).await?;

        let staged = match self.stage_rekey(old, new, &keyring).await {
            Ok(staged) => staged,
            Err(e) => {
                warn!(subsystem = "store", op = "rekey", error = %e, "Re-key staging failed, discarding");
                discard_staging(backend.as_ref()).await;
                return Err(e);
            }
        };

        let manifest = RekeyManifest {
            paths: staged.paths,
            committed_at: Utc::now(),
        };
        let marker = serde_json::to_vec_pretty(&manifest)?;
        if let Err(e) = backend.write(paths::REKEY_MARKER, &marker).await {
            warn!(subsystem = "store", op = "rekey", error = %e, "Re-key commit failed, discarding");
            discard_staging(backend.as_ref()).await;
            return Err(e);
        }

        // Committed: the staged state is now authoritative
        let record_count = staged.records.len();
        self.install_rekeyed(staged.records, keyring, manifest);
        self.settle_rekey().await?;

        info!(
            subsystem = "store",
            op = "rekey",
            entry_count = record_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Store re-keyed"
        );
        Ok(())
    }

    async fn stage_rekey(
        &self,
        old: &Session,
        new: &Session,
        keyring: &Keyring,
    ) -> Result<StagedRekey> {
        let backend = self.backend();
        let mut staged_paths = Vec::new();
        let mut records = HashMap::new();

        for record in self.records() {
            for attachment in record.attachments.iter().filter(|a| a.is_encrypted) {
                let path = paths::attachment_blob(&record.id, &attachment.id, true);
                let context = attachment_context(&record.id, &attachment.id);

                let blob = backend.read(&path).await?;
                let plaintext = old.open(&Envelope::from_bytes(&blob)?, &context)?;
                let resealed = new.seal(&plaintext, &context)?.to_bytes()?;

                backend.write(&paths::staged(&path), &resealed).await?;
                staged_paths.push(path);
            }

            if record.is_sealed() {
                let fields = record.body.open(&record.id, Some(old))?;
                let mut next = record.clone();
                next.body = RecordBody::seal(&fields, &record.id, new)?;

                let path = paths::entry_record(&record.id);
                backend.write(&paths::staged(&path), &next.to_json()?).await?;
                staged_paths.push(path);
                records.insert(next.id, next);
            }
        }

        keyring.save(backend.as_ref(), &paths::staged(paths::KEYRING)).await?;
        staged_paths.push(paths::KEYRING.to_string());

        Ok(StagedRekey {
            paths: staged_paths,
            records,
        })
    }
}

async fn discard_staging(backend: &dyn StorageBackend) {
    if let Err(e) = backend.remove_dir(paths::REKEY_DIR).await {
        warn!(subsystem = "store", op = "rekey", error = %e, "Could not remove re-key staging");
    }
}
