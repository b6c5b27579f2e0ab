//! Canonical data model for journal entries.
//!
//! Field names are snake_case everywhere inside the workspace. The only
//! translation to another casing happens in [`crate::response`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

// =============================================================================
// ENUMERATIONS
// =============================================================================

/// Kind of memory captured by an entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Text,
    Image,
    Audio,
    Mixed,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Text => "text",
            MemoryType::Image => "image",
            MemoryType::Audio => "audio",
            MemoryType::Mixed => "mixed",
        }
    }
}

impl std::str::FromStr for MemoryType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(MemoryType::Text),
            "image" => Ok(MemoryType::Image),
            "audio" => Ok(MemoryType::Audio),
            "mixed" => Ok(MemoryType::Mixed),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown memory type: {}",
                other
            ))),
        }
    }
}

/// Fixed vocabulary of emotion tags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EmotionTag {
    Joy,
    Sadness,
    Nostalgia,
    Hope,
    Regret,
    Attachment,
    Persistence,
}

impl EmotionTag {
    pub const ALL: [EmotionTag; 7] = [
        EmotionTag::Joy,
        EmotionTag::Sadness,
        EmotionTag::Nostalgia,
        EmotionTag::Hope,
        EmotionTag::Regret,
        EmotionTag::Attachment,
        EmotionTag::Persistence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionTag::Joy => "joy",
            EmotionTag::Sadness => "sadness",
            EmotionTag::Nostalgia => "nostalgia",
            EmotionTag::Hope => "hope",
            EmotionTag::Regret => "regret",
            EmotionTag::Attachment => "attachment",
            EmotionTag::Persistence => "persistence",
        }
    }
}

impl std::str::FromStr for EmotionTag {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let lowered = s.to_ascii_lowercase();
        EmotionTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == lowered)
            .ok_or_else(|| crate::Error::InvalidInput(format!("unknown emotion tag: {}", s)))
    }
}

/// Deduplicate tags while keeping first-seen order.
pub fn normalize_tags(tags: impl IntoIterator<Item = EmotionTag>) -> Vec<EmotionTag> {
    let mut out: Vec<EmotionTag> = Vec::new();
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

// =============================================================================
// ENTRY TYPES
// =============================================================================

/// Reference to a file stored alongside an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub id: Uuid,
    pub file_name: String,
    /// MIME type
    pub file_type: String,
    /// Plaintext size in bytes
    pub file_size: u64,
    pub is_encrypted: bool,
    pub created_at: DateTime<Utc>,
}

/// Derived, non-authoritative entry metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryMetadata {
    pub word_count: Option<u32>,
    /// Estimated reading time in minutes
    pub reading_time: Option<u32>,
    pub location: Option<String>,
    pub weather: Option<String>,
    pub mood: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MemoryMetadata {
    /// Recompute the counters derived from `content`.
    ///
    /// Counts characters rather than whitespace-separated words so CJK text
    /// gets a meaningful figure.
    pub fn refresh_counts(&mut self, content: &str) {
        let word_count = content.chars().count() as u32;
        self.word_count = Some(word_count);
        self.reading_time = Some((word_count / defaults::READING_CHARS_PER_MINUTE).max(1));
    }

    pub fn for_content(content: &str) -> Self {
        let mut metadata = Self::default();
        metadata.refresh_counts(content);
        metadata
    }
}

/// A journal entry with plaintext content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub emotion_tags: Vec<EmotionTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_encrypted: bool,
    pub attachments: Vec<Attachment>,
    pub metadata: Option<MemoryMetadata>,
}

/// Request for creating a new entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub title: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub emotion_tags: Vec<EmotionTag>,
    /// Free-form tags stored in metadata
    pub tags: Option<Vec<String>>,
}

impl NewEntry {
    pub fn new(title: impl Into<String>, content: impl Into<String>, memory_type: MemoryType) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            memory_type,
            emotion_tags: Vec::new(),
            tags: None,
        }
    }

    pub fn with_emotion_tags(mut self, tags: impl IntoIterator<Item = EmotionTag>) -> Self {
        self.emotion_tags = normalize_tags(tags);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }
}

/// Partial update for an existing entry. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub emotion_tags: Option<Vec<EmotionTag>>,
    pub tags: Option<Vec<String>>,
    /// Switch encryption on or off
    pub encrypt: Option<bool>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.memory_type.is_none()
            && self.emotion_tags.is_none()
            && self.tags.is_none()
            && self.encrypt.is_none()
    }
}

// =============================================================================
// SEARCH & STATS
// =============================================================================

/// Inclusive creation-time range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Entry search filter. All present criteria must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Case-insensitive substring of title or content
    pub keyword: Option<String>,
    pub memory_type: Option<MemoryType>,
    /// Matches when the entry has any of these
    pub emotion_tags: Option<Vec<EmotionTag>>,
    pub date_range: Option<DateRange>,
    /// Matches when metadata tags contain any of these
    pub tags: Option<Vec<String>>,
}

/// Aggregate journal statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryStats {
    pub total_entries: u32,
    pub total_words: u32,
    pub average_words_per_entry: f32,
    pub entries_by_type: std::collections::BTreeMap<MemoryType, u32>,
    pub entries_by_emotion: std::collections::BTreeMap<EmotionTag, u32>,
    /// Keyed by `YYYY-MM`
    pub entries_by_month: std::collections::BTreeMap<String, u32>,
    /// Longest run of consecutive days with at least one entry
    pub longest_streak: u32,
    /// Run of consecutive days ending today (or yesterday)
    pub current_streak: u32,
}
