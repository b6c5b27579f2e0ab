//! Request/response adapter for the UI boundary.
//!
//! The UI speaks camelCase JSON. Everything inside the workspace stays
//! snake_case; the views here are the one place the casing changes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, ErrorKind};
use crate::models::{Attachment, EmotionTag, MemoryEntry, MemoryMetadata, MemoryType};

/// Error body carried in a failed response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Uniform `{ success, data, error }` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody::from(err)),
        }
    }

    /// Convert a core result into a response.
    pub fn from_result(result: crate::Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(err) => Self::err(&err),
        }
    }

    /// Convert a result, mapping the success value into a view first.
    pub fn from_result_with<U>(result: crate::Result<U>, view: impl FnOnce(U) -> T) -> Self {
        Self::from_result(result.map(view))
    }
}

/// camelCase view of an attachment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub is_encrypted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Attachment> for AttachmentView {
    fn from(a: &Attachment) -> Self {
        Self {
            id: a.id,
            file_name: a.file_name.clone(),
            file_type: a.file_type.clone(),
            file_size: a.file_size,
            is_encrypted: a.is_encrypted,
            created_at: a.created_at,
        }
    }
}

/// camelCase view of entry metadata.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl From<&MemoryMetadata> for MetadataView {
    fn from(m: &MemoryMetadata) -> Self {
        Self {
            word_count: m.word_count,
            reading_time: m.reading_time,
            location: m.location.clone(),
            weather: m.weather.clone(),
            mood: m.mood.clone(),
            tags: m.tags.clone(),
        }
    }
}

/// camelCase view of a decrypted entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub emotion_tags: Vec<EmotionTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_encrypted: bool,
    pub attachments: Vec<AttachmentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataView>,
}

impl From<&MemoryEntry> for EntryView {
    fn from(e: &MemoryEntry) -> Self {
        Self {
            id: e.id,
            title: e.title.clone(),
            content: e.content.clone(),
            memory_type: e.memory_type,
            emotion_tags: e.emotion_tags.clone(),
            created_at: e.created_at,
            updated_at: e.updated_at,
            is_encrypted: e.is_encrypted,
            attachments: e.attachments.iter().map(AttachmentView::from).collect(),
            metadata: e.metadata.as_ref().map(MetadataView::from),
        }
    }
}

impl From<MemoryEntry> for EntryView {
    fn from(e: MemoryEntry) -> Self {
        EntryView::from(&e)
    }
}
