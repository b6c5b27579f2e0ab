//! On-disk entry record format.
//!
//! A record keeps the searchable outer fields in the clear and puts the
//! title and content in the body. Sealed bodies are AES-256-GCM envelopes
//! bound to the entry id, so a body cannot be moved to another record.

use chrono::{DateTime, Utc};
use memoria_core::{
    Attachment, EmotionTag, Error, MemoryEntry, MemoryMetadata, MemoryType, Result,
};
use memoria_crypto::{Envelope, Session};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record format version.
pub const RECORD_FORMAT: u32 = 1;

/// Associated data for an entry body.
pub fn content_context(entry_id: &Uuid) -> Vec<u8> {
    format!("memoria:entry:{entry_id}:content").into_bytes()
}

/// Associated data for an attachment blob.
pub fn attachment_context(entry_id: &Uuid, attachment_id: &Uuid) -> Vec<u8> {
    format!("memoria:entry:{entry_id}:attachment:{attachment_id}").into_bytes()
}

/// Plaintext carried inside a sealed body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BodyFields {
    pub title: String,
    pub content: String,
}

/// Record body, in the clear or sealed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordBody {
    Plain {
        title: String,
        content: String,
    },
    Sealed {
        envelope: Envelope,
    },
}

impl RecordBody {
    pub fn is_sealed(&self) -> bool {
        matches!(self, RecordBody::Sealed { .. })
    }

    /// Seal `fields` for `entry_id`.
    pub fn seal(fields: &BodyFields, entry_id: &Uuid, session: &Session) -> Result<Self> {
        let plaintext = serde_json::to_vec(fields)?;
        let envelope = session.seal(&plaintext, &content_context(entry_id))?;
        Ok(RecordBody::Sealed { envelope })
    }

    /// Recover the title and content, opening the envelope if sealed.
    pub fn open(&self, entry_id: &Uuid, session: Option<&Session>) -> Result<BodyFields> {
        match self {
            RecordBody::Plain { title, content } => Ok(BodyFields {
                title: title.clone(),
                content: content.clone(),
            }),
            RecordBody::Sealed { envelope } => {
                let session = session.ok_or(Error::NotAuthenticated)?;
                let plaintext = session.open(envelope, &content_context(entry_id))?;
                serde_json::from_slice(&plaintext).map_err(|e| {
                    Error::CorruptRecord(format!("entry {entry_id}: sealed body: {e}"))
                })
            }
        }
    }
}

/// One persisted entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub format: u32,
    pub id: Uuid,
    /// Monotonic insertion sequence
    pub seq: u64,
    pub memory_type: MemoryType,
    pub emotion_tags: Vec<EmotionTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    pub metadata: Option<MemoryMetadata>,
    pub body: RecordBody,
}

impl StoredRecord {
    pub fn is_sealed(&self) -> bool {
        self.body.is_sealed()
    }

    /// Decrypt into the caller-facing entry.
    pub fn to_entry(&self, session: Option<&Session>) -> Result<MemoryEntry> {
        let fields = self.body.open(&self.id, session)?;
        Ok(MemoryEntry {
            id: self.id,
            title: fields.title,
            content: fields.content,
            memory_type: self.memory_type,
            emotion_tags: self.emotion_tags.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_encrypted: self.is_sealed(),
            attachments: self.attachments.clone(),
            metadata: self.metadata.clone(),
        })
    }

    pub fn find_attachment(&self, attachment_id: &Uuid) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.id == *attachment_id)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a record read from `source`, naming it in any error.
    pub fn from_json(data: &[u8], source: &str) -> Result<Self> {
        let record: StoredRecord = serde_json::from_slice(data)
            .map_err(|e| Error::CorruptRecord(format!("{source}: {e}")))?;
        if record.format != RECORD_FORMAT {
            return Err(Error::CorruptRecord(format!(
                "{source}: unsupported record format {}",
                record.format
            )));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memoria_core::ErrorKind;
    use memoria_crypto::{generate_salt, KdfDescriptor, KdfParams};

    fn session() -> Session {
        Session::derive(
            b"Tr0ub4dor&3",
            &generate_salt(),
            KdfDescriptor::current(KdfParams::new(1024, 1, 1)),
        )
        .unwrap()
    }

    fn record(body: RecordBody, id: Uuid) -> StoredRecord {
        let now = Utc::now();
        StoredRecord {
            format: RECORD_FORMAT,
            id,
            seq: 1,
            memory_type: MemoryType::Text,
            emotion_tags: vec![EmotionTag::Joy],
            created_at: now,
            updated_at: now,
            attachments: Vec::new(),
            metadata: Some(MemoryMetadata::for_content("Body")),
            body,
        }
    }

    fn fields() -> BodyFields {
        BodyFields {
            title: "Title".to_string(),
            content: "Body".to_string(),
        }
    }

    #[test]
    fn test_sealed_record_hides_title_and_content() {
        let session = session();
        let id = Uuid::now_v7();
        let rec = record(RecordBody::seal(&fields(), &id, &session).unwrap(), id);

        let json = String::from_utf8(rec.to_json().unwrap()).unwrap();
        assert!(!json.contains("Title"));
        assert!(!json.contains("Body"));
        assert!(json.contains("\"sealed\""));

        let entry = rec.to_entry(Some(&session)).unwrap();
        assert_eq!(entry.title, "Title");
        assert_eq!(entry.content, "Body");
        assert!(entry.is_encrypted);
    }

    #[test]
    fn test_sealed_record_requires_session() {
        let session = session();
        let id = Uuid::now_v7();
        let rec = record(RecordBody::seal(&fields(), &id, &session).unwrap(), id);

        let err = rec.to_entry(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    }

    #[test]
    fn test_sealed_body_bound_to_entry_id() {
        let session = session();
        let id = Uuid::now_v7();
        let body = RecordBody::seal(&fields(), &id, &session).unwrap();

        // Same body moved onto another record
        let moved = record(body, Uuid::now_v7());
        let err = moved.to_entry(Some(&session)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    }

    #[test]
    fn test_plain_record_opens_without_session() {
        let id = Uuid::now_v7();
        let rec = record(
            RecordBody::Plain {
                title: "Title".into(),
                content: "Body".into(),
            },
            id,
        );
        let entry = rec.to_entry(None).unwrap();
        assert_eq!(entry.content, "Body");
        assert!(!entry.is_encrypted);
    }

    #[test]
    fn test_json_roundtrip_and_corruption() {
        let id = Uuid::now_v7();
        let rec = record(
            RecordBody::Plain {
                title: "Title".into(),
                content: "Body".into(),
            },
            id,
        );
        let data = rec.to_json().unwrap();
        let parsed = StoredRecord::from_json(&data, "entries/x.json").unwrap();
        assert_eq!(parsed.id, id);
        assert_eq!(parsed.seq, 1);

        let err = StoredRecord::from_json(&data[..data.len() / 2], "entries/x.json").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptRecord);
        assert!(err.to_string().contains("entries/x.json"));
    }

    #[test]
    fn test_contexts_differ_per_field() {
        let id = Uuid::now_v7();
        let att = Uuid::now_v7();
        assert_ne!(content_context(&id), attachment_context(&id, &att));
    }
}
