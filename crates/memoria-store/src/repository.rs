//! Entry repository: on-disk records plus the in-memory index.
//!
//! The repository never holds a key. Operations that touch sealed data take
//! the caller's session, and fail with `NotAuthenticated` when it is absent
//! rather than falling back to plaintext.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use memoria_core::{
    check_attachment_size, normalize_mime_type, normalize_tags, sanitize_filename, Attachment,
    EntryPatch, Error, MemoryEntry, MemoryMetadata, MemoryStats, NewEntry, Result, SearchFilter,
};
use memoria_crypto::{is_sealed, Envelope, Session};
use serde::Serialize;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::backend::StorageBackend;
use crate::keyring::Keyring;
use crate::paths;
use crate::record::{attachment_context, BodyFields, RecordBody, StoredRecord, RECORD_FORMAT};
use crate::recovery::{self, RecoveryReport};
use crate::rekey::{roll_forward, RekeyManifest};

/// Summary of a completed backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub entry_count: usize,
    pub attachment_count: usize,
    pub byte_len: u64,
}

/// Durable store of journal entries.
pub struct EntryRepository {
    backend: Arc<dyn StorageBackend>,
    keyring: Option<Keyring>,
    records: HashMap<Uuid, StoredRecord>,
    next_seq: u64,
    recovery: RecoveryReport,
    /// Committed re-key whose staged files are not all moved into place yet
    pending_rekey: Option<RekeyManifest>,
}

impl EntryRepository {
    /// Open a store: create directories, recover, then load every record.
    ///
    /// Records are indexed without decrypting. An unparsable record fails the
    /// open with `CorruptRecord` naming the file.
    pub async fn open(backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let start = Instant::now();

        backend.create_dir(paths::ENTRIES_DIR).await?;
        backend.create_dir(paths::ATTACHMENTS_DIR).await?;

        let mut recovery = recovery::recover_files(backend.as_ref()).await?;
        let keyring = Keyring::load(backend.as_ref()).await?;

        let mut records = HashMap::new();
        for name in backend.list_files(paths::ENTRIES_DIR).await? {
            let Some(id) = paths::parse_record_name(&name) else {
                continue;
            };
            let source = format!("{}/{}", paths::ENTRIES_DIR, name);
            let record = StoredRecord::from_json(&backend.read(&source).await?, &source)?;
            if record.id != id {
                return Err(Error::CorruptRecord(format!(
                    "{source}: id does not match file name"
                )));
            }
            trace!(subsystem = "store", entry_id = %id, seq = record.seq, "Indexed record");
            records.insert(id, record);
        }

        recovery::remove_orphans(backend.as_ref(), &records, &mut recovery).await?;

        let next_seq = records.values().map(|r| r.seq).max().map_or(1, |s| s + 1);

        info!(
            subsystem = "store",
            op = "open",
            entry_count = records.len(),
            has_keyring = keyring.is_some(),
            recovered = !recovery.is_clean(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Entry repository opened"
        );

        Ok(Self {
            backend,
            keyring,
            records,
            next_seq,
            recovery,
            pending_rekey: None,
        })
    }

    pub(crate) fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = &StoredRecord> {
        self.records.values()
    }

    /// Swap in re-sealed records and the new keyring after a re-key commit.
    ///
    /// Until [`settle_rekey`](Self::settle_rekey) succeeds the live files
    /// still hold the old key, so mutations are refused.
    pub(crate) fn install_rekeyed(
        &mut self,
        records: HashMap<Uuid, StoredRecord>,
        keyring: Keyring,
        manifest: RekeyManifest,
    ) {
        self.records.extend(records);
        self.keyring = Some(keyring);
        self.pending_rekey = Some(manifest);
    }

    /// Finish moving a committed re-key into place. No-op when none is pending.
    pub async fn settle_rekey(&mut self) -> Result<()> {
        let Some(manifest) = &self.pending_rekey else {
            return Ok(());
        };
        let moved = roll_forward(self.backend.as_ref(), manifest).await?;
        self.pending_rekey = None;
        info!(subsystem = "store", op = "rekey", moved, "Re-key moved into place");
        Ok(())
    }

    fn ensure_settled(&self) -> Result<()> {
        if self.pending_rekey.is_some() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "password change is not fully written; retry once storage is writable",
            )));
        }
        Ok(())
    }

    /// What startup recovery did.
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }

    pub fn keyring(&self) -> Option<&Keyring> {
        self.keyring.as_ref()
    }

    /// Persist the first keyring. Fails if one already exists.
    pub async fn init_keyring(&mut self, keyring: Keyring) -> Result<()> {
        if self.keyring.is_some() || self.backend.exists(paths::KEYRING).await? {
            return Err(Error::AlreadyInitialized);
        }
        keyring.save(self.backend.as_ref(), paths::KEYRING).await?;
        self.keyring = Some(keyring);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.records.contains_key(id)
    }

    /// Entry ids in insertion order, optionally skipping sealed entries.
    pub fn ids(&self, include_sealed: bool) -> Vec<Uuid> {
        self.ordered()
            .into_iter()
            .filter(|r| include_sealed || !r.is_sealed())
            .map(|r| r.id)
            .collect()
    }

    fn ordered(&self) -> Vec<&StoredRecord> {
        let mut records: Vec<&StoredRecord> = self.records.values().collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    fn record(&self, id: &Uuid) -> Result<&StoredRecord> {
        self.records.get(id).ok_or(Error::EntryNotFound(*id))
    }

    async fn persist(&self, record: &StoredRecord) -> Result<()> {
        self.backend
            .write(&paths::entry_record(&record.id), &record.to_json()?)
            .await
    }

    // =========================================================================
    // ENTRIES
    // =========================================================================

    /// Create an entry, sealing it when `encrypt` is set.
    pub async fn create(
        &mut self,
        new: NewEntry,
        encrypt: bool,
        session: Option<&Session>,
    ) -> Result<MemoryEntry> {
        self.settle_rekey().await?;
        let id = Uuid::now_v7();
        let now = Utc::now();

        let fields = BodyFields {
            title: new.title,
            content: new.content,
        };
        let mut metadata = MemoryMetadata::for_content(&fields.content);
        metadata.tags = new.tags;

        let body = seal_or_plain(fields, &id, encrypt, session)?;
        let record = StoredRecord {
            format: RECORD_FORMAT,
            id,
            seq: self.next_seq,
            memory_type: new.memory_type,
            emotion_tags: normalize_tags(new.emotion_tags),
            created_at: now,
            updated_at: now,
            attachments: Vec::new(),
            metadata: Some(metadata),
            body,
        };

        let entry = record.to_entry(session)?;
        self.persist(&record).await?;
        self.next_seq += 1;
        self.records.insert(id, record);

        debug!(subsystem = "store", op = "create", entry_id = %id, encrypted = encrypt, "Entry created");
        Ok(entry)
    }

    /// Apply a partial update.
    ///
    /// Updating a sealed entry, or sealing a plain one, needs the session.
    pub async fn update(
        &mut self,
        id: &Uuid,
        patch: EntryPatch,
        session: Option<&Session>,
    ) -> Result<MemoryEntry> {
        self.settle_rekey().await?;
        let current = self.record(id)?;
        if current.is_sealed() && session.is_none() {
            return Err(Error::NotAuthenticated);
        }
        if patch.is_empty() {
            return current.to_entry(session);
        }

        let mut next = current.clone();
        let was_sealed = current.is_sealed();
        let seal = patch.encrypt.unwrap_or(was_sealed);
        let body_changed = patch.title.is_some() || patch.content.is_some() || seal != was_sealed;

        if body_changed {
            let mut fields = current.body.open(id, session)?;
            if let Some(title) = patch.title {
                fields.title = title;
            }
            if let Some(content) = patch.content {
                next.metadata
                    .get_or_insert_with(MemoryMetadata::default)
                    .refresh_counts(&content);
                fields.content = content;
            }
            next.body = seal_or_plain(fields, id, seal, session)?;
        }

        if let Some(memory_type) = patch.memory_type {
            next.memory_type = memory_type;
        }
        if let Some(tags) = patch.emotion_tags {
            next.emotion_tags = normalize_tags(tags);
        }
        if let Some(tags) = patch.tags {
            next.metadata.get_or_insert_with(MemoryMetadata::default).tags = Some(tags);
        }
        next.updated_at = Utc::now().max(next.created_at);

        // Attachments follow the entry's encryption state
        let mut stale_blobs = Vec::new();
        if seal != was_sealed {
            for attachment in next.attachments.iter_mut() {
                if attachment.is_encrypted == seal {
                    continue;
                }
                let old_path = paths::attachment_blob(id, &attachment.id, attachment.is_encrypted);
                let data = self.read_blob(id, attachment, session).await?;
                self.write_blob(id, &attachment.id, &data, seal, session).await?;
                attachment.is_encrypted = seal;
                stale_blobs.push(old_path);
            }
        }

        let entry = next.to_entry(session)?;
        self.persist(&next).await?;
        self.records.insert(*id, next);
        for path in stale_blobs {
            self.backend.delete(&path).await?;
        }

        debug!(subsystem = "store", op = "update", entry_id = %id, encrypted = seal, "Entry updated");
        Ok(entry)
    }

    /// Delete an entry and its attachments.
    pub async fn delete(&mut self, id: &Uuid) -> Result<()> {
        self.settle_rekey().await?;
        self.record(id)?;

        // Record removal is the commit point; blobs go after
        self.backend.delete(&paths::entry_record(id)).await?;
        self.records.remove(id);
        self.backend.remove_dir(&paths::attachment_dir(id)).await?;

        debug!(subsystem = "store", op = "delete", entry_id = %id, "Entry deleted");
        Ok(())
    }

    /// Fetch one entry, decrypting if sealed.
    pub fn get(&self, id: &Uuid, session: Option<&Session>) -> Result<MemoryEntry> {
        self.record(id)?.to_entry(session)
    }

    /// Every entry in insertion order.
    ///
    /// Fails with `NotAuthenticated` if any entry is sealed and there is no
    /// session; never returns a partial list.
    pub fn get_all(&self, session: Option<&Session>) -> Result<Vec<MemoryEntry>> {
        let ordered = self.ordered();
        if session.is_none() && ordered.iter().any(|r| r.is_sealed()) {
            return Err(Error::NotAuthenticated);
        }
        ordered.into_iter().map(|r| r.to_entry(session)).collect()
    }

    /// Entries matching `filter`, in insertion order.
    pub fn search(&self, filter: &SearchFilter, session: Option<&Session>) -> Result<Vec<MemoryEntry>> {
        let entries = self.get_all(session)?;
        let found = filter.apply(entries);
        debug!(subsystem = "store", op = "search", entry_count = found.len(), "Search complete");
        Ok(found)
    }

    /// Aggregate statistics. Reads only unsealed outer fields, so works locked.
    pub fn stats(&self, today: NaiveDate) -> MemoryStats {
        let outer: Vec<MemoryEntry> = self
            .ordered()
            .into_iter()
            .map(|r| MemoryEntry {
                id: r.id,
                title: String::new(),
                content: String::new(),
                memory_type: r.memory_type,
                emotion_tags: r.emotion_tags.clone(),
                created_at: r.created_at,
                updated_at: r.updated_at,
                is_encrypted: r.is_sealed(),
                attachments: Vec::new(),
                metadata: r.metadata.clone(),
            })
            .collect();
        MemoryStats::from_entries(&outer, today)
    }

    // =========================================================================
    // ATTACHMENTS
    // =========================================================================

    /// Store a file with an entry. Sealed iff the entry is sealed.
    pub async fn add_attachment(
        &mut self,
        entry_id: &Uuid,
        file_name: &str,
        file_type: &str,
        data: &[u8],
        session: Option<&Session>,
    ) -> Result<Attachment> {
        self.settle_rekey().await?;
        check_attachment_size(data.len())?;
        let current = self.record(entry_id)?;
        let seal = current.is_sealed();

        let attachment = Attachment {
            id: Uuid::now_v7(),
            file_name: sanitize_filename(file_name),
            file_type: normalize_mime_type(file_type),
            file_size: data.len() as u64,
            is_encrypted: seal,
            created_at: Utc::now(),
        };

        let mut next = current.clone();
        next.attachments.push(attachment.clone());
        next.updated_at = Utc::now().max(next.created_at);

        // Blob first; the record referencing it is the commit point
        self.write_blob(entry_id, &attachment.id, data, seal, session)
            .await?;
        self.persist(&next).await?;
        self.records.insert(*entry_id, next);

        debug!(
            subsystem = "store",
            op = "add_attachment",
            entry_id = %entry_id,
            attachment_id = %attachment.id,
            encrypted = seal,
            byte_len = data.len(),
            "Attachment stored"
        );
        Ok(attachment)
    }

    /// Read an attachment's metadata and plaintext bytes.
    pub async fn read_attachment(
        &self,
        entry_id: &Uuid,
        attachment_id: &Uuid,
        session: Option<&Session>,
    ) -> Result<(Attachment, Vec<u8>)> {
        let record = self.record(entry_id)?;
        let attachment = record
            .find_attachment(attachment_id)
            .ok_or(Error::AttachmentNotFound(*attachment_id))?;
        let data = self.read_blob(entry_id, attachment, session).await?;
        Ok((attachment.clone(), data))
    }

    /// Remove an attachment from an entry.
    pub async fn remove_attachment(&mut self, entry_id: &Uuid, attachment_id: &Uuid) -> Result<()> {
        self.settle_rekey().await?;
        let current = self.record(entry_id)?;
        let attachment = current
            .find_attachment(attachment_id)
            .ok_or(Error::AttachmentNotFound(*attachment_id))?;
        let blob = paths::attachment_blob(entry_id, attachment_id, attachment.is_encrypted);

        let mut next = current.clone();
        next.attachments.retain(|a| a.id != *attachment_id);
        next.updated_at = Utc::now().max(next.created_at);

        self.persist(&next).await?;
        self.records.insert(*entry_id, next);
        self.backend.delete(&blob).await?;

        debug!(
            subsystem = "store",
            op = "remove_attachment",
            entry_id = %entry_id,
            attachment_id = %attachment_id,
            "Attachment removed"
        );
        Ok(())
    }

    async fn write_blob(
        &self,
        entry_id: &Uuid,
        attachment_id: &Uuid,
        data: &[u8],
        seal: bool,
        session: Option<&Session>,
    ) -> Result<()> {
        let path = paths::attachment_blob(entry_id, attachment_id, seal);
        if seal {
            let session = session.ok_or(Error::NotAuthenticated)?;
            let envelope = session.seal(data, &attachment_context(entry_id, attachment_id))?;
            self.backend.write(&path, &envelope.to_bytes()?).await
        } else {
            self.backend.write(&path, data).await
        }
    }

    async fn read_blob(
        &self,
        entry_id: &Uuid,
        attachment: &Attachment,
        session: Option<&Session>,
    ) -> Result<Vec<u8>> {
        if attachment.is_encrypted && session.is_none() {
            return Err(Error::NotAuthenticated);
        }
        let path = paths::attachment_blob(entry_id, &attachment.id, attachment.is_encrypted);
        let data = self.backend.read(&self.current_path(&path).await?).await?;
        match session.filter(|_| attachment.is_encrypted) {
            Some(session) => {
                if !is_sealed(&data) {
                    return Err(Error::CorruptRecord(format!("{path}: not a sealed envelope")));
                }
                let envelope = Envelope::from_bytes(&data)?;
                Ok(session.open(&envelope, &attachment_context(entry_id, &attachment.id))?)
            }
            None => Ok(data),
        }
    }

    /// Where the current bytes for `path` live: the staged copy while a
    /// committed re-key has not moved it yet, otherwise `path` itself.
    async fn current_path(&self, path: &str) -> Result<String> {
        if let Some(manifest) = &self.pending_rekey {
            let staged = paths::staged(path);
            if manifest.paths.iter().any(|p| p == path) && self.backend.exists(&staged).await? {
                return Ok(staged);
            }
        }
        Ok(path.to_string())
    }

    // =========================================================================
    // BACKUP
    // =========================================================================

    /// Copy keyring, records and blobs, still sealed, into `dest`.
    ///
    /// Refused while a committed re-key is pending; call
    /// [`settle_rekey`](Self::settle_rekey) first.
    pub async fn backup(&self, dest: &dyn StorageBackend) -> Result<BackupReport> {
        self.ensure_settled()?;
        if dest.exists(paths::KEYRING).await? || !dest.list_files(paths::ENTRIES_DIR).await?.is_empty() {
            return Err(Error::InvalidInput(
                "backup destination already holds a journal".to_string(),
            ));
        }

        let mut report = BackupReport {
            entry_count: 0,
            attachment_count: 0,
            byte_len: 0,
        };

        if self.keyring.is_some() {
            let data = self.backend.read(paths::KEYRING).await?;
            dest.write(paths::KEYRING, &data).await?;
            report.byte_len += data.len() as u64;
        }

        for record in self.ordered() {
            let path = paths::entry_record(&record.id);
            let data = self.backend.read(&path).await?;
            dest.write(&path, &data).await?;
            report.byte_len += data.len() as u64;
            report.entry_count += 1;

            for attachment in &record.attachments {
                let path = paths::attachment_blob(&record.id, &attachment.id, attachment.is_encrypted);
                let data = self.backend.read(&path).await?;
                dest.write(&path, &data).await?;
                report.byte_len += data.len() as u64;
                report.attachment_count += 1;
            }
        }

        info!(
            subsystem = "store",
            op = "backup",
            entry_count = report.entry_count,
            byte_len = report.byte_len,
            "Backup written"
        );
        Ok(report)
    }
}

fn seal_or_plain(
    fields: BodyFields,
    id: &Uuid,
    seal: bool,
    session: Option<&Session>,
) -> Result<RecordBody> {
    if seal {
        let session = session.ok_or(Error::NotAuthenticated)?;
        RecordBody::seal(&fields, id, session)
    } else {
        Ok(RecordBody::Plain {
            title: fields.title,
            content: fields.content,
        })
    }
}
