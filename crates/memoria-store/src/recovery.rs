//! Startup recovery after an unclean shutdown.
//!
//! Runs before the index is built and again after it for orphan cleanup.
//! Every step is idempotent, so a crash during recovery is itself recovered
//! on the next open.

use std::collections::HashMap;

use memoria_core::Result;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{StorageBackend, TEMP_SUFFIX};
use crate::paths;
use crate::record::StoredRecord;
use crate::rekey::{roll_forward, RekeyManifest};

/// Outcome of an interrupted password change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RekeyRecovery {
    /// No re-key was in progress.
    #[default]
    None,
    /// The commit marker was present; staged files were moved into place.
    RolledForward,
    /// Staging existed without a marker and was removed.
    Discarded,
}

/// What recovery found and fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    pub rekey: RekeyRecovery,
    pub temp_files_removed: usize,
    pub orphan_dirs_removed: usize,
    pub orphan_blobs_removed: usize,
}

impl RecoveryReport {
    pub fn is_clean(&self) -> bool {
        *self == RecoveryReport::default()
    }
}

/// Resolve interrupted re-keys and remove torn temp files.
pub async fn recover_files(backend: &dyn StorageBackend) -> Result<RecoveryReport> {
    let mut report = RecoveryReport {
        rekey: recover_rekey(backend).await?,
        ..Default::default()
    };

    report.temp_files_removed += remove_temp_files(backend, "").await?;
    report.temp_files_removed += remove_temp_files(backend, paths::ENTRIES_DIR).await?;
    for dir in backend.list_dirs(paths::ATTACHMENTS_DIR).await? {
        let dir = format!("{}/{}", paths::ATTACHMENTS_DIR, dir);
        report.temp_files_removed += remove_temp_files(backend, &dir).await?;
    }

    Ok(report)
}

async fn recover_rekey(backend: &dyn StorageBackend) -> Result<RekeyRecovery> {
    if let Some(manifest) = RekeyManifest::load(backend).await? {
        let moved = roll_forward(backend, &manifest).await?;
        info!(
            subsystem = "store",
            op = "recover",
            moved,
            "Completed interrupted password change"
        );
        return Ok(RekeyRecovery::RolledForward);
    }

    if backend.exists(paths::REKEY_DIR).await? {
        backend.remove_dir(paths::REKEY_DIR).await?;
        warn!(
            subsystem = "store",
            op = "recover",
            "Discarded uncommitted password change"
        );
        return Ok(RekeyRecovery::Discarded);
    }

    Ok(RekeyRecovery::None)
}

async fn remove_temp_files(backend: &dyn StorageBackend, dir: &str) -> Result<usize> {
    let mut removed = 0;
    for name in backend.list_files(dir).await? {
        if !name.ends_with(TEMP_SUFFIX) {
            continue;
        }
        let path = if dir.is_empty() {
            name
        } else {
            format!("{dir}/{name}")
        };
        backend.delete(&path).await?;
        warn!(subsystem = "store", op = "recover", storage_path = %path, "Removed torn temp file");
        removed += 1;
    }
    Ok(removed)
}

/// Remove attachment directories and blobs no record references.
///
/// A blob can outlive its reference when a crash lands between committing a
/// record and deleting the blob it dropped.
pub async fn remove_orphans(
    backend: &dyn StorageBackend,
    records: &HashMap<Uuid, StoredRecord>,
    report: &mut RecoveryReport,
) -> Result<()> {
    for dir_name in backend.list_dirs(paths::ATTACHMENTS_DIR).await? {
        let dir = format!("{}/{}", paths::ATTACHMENTS_DIR, dir_name);
        let Some(record) = Uuid::parse_str(&dir_name).ok().and_then(|id| records.get(&id)) else {
            backend.remove_dir(&dir).await?;
            warn!(subsystem = "store", op = "recover", storage_path = %dir, "Removed orphan attachment directory");
            report.orphan_dirs_removed += 1;
            continue;
        };

        for file_name in backend.list_files(&dir).await? {
            let referenced = paths::parse_blob_name(&file_name).is_some_and(|(id, sealed)| {
                record
                    .find_attachment(&id)
                    .is_some_and(|a| a.is_encrypted == sealed)
            });
            if !referenced {
                let path = format!("{dir}/{file_name}");
                backend.delete(&path).await?;
                warn!(subsystem = "store", op = "recover", storage_path = %path, "Removed orphan attachment blob");
                report.orphan_blobs_removed += 1;
            }
        }
    }
    Ok(())
}
