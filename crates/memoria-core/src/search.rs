//! In-memory entry filtering.

use crate::models::{MemoryEntry, SearchFilter};

impl SearchFilter {
    /// Filter matching entries whose title or content contains `keyword`.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.keyword.as_deref().map_or(true, |k| k.trim().is_empty())
            && self.memory_type.is_none()
            && self.emotion_tags.as_ref().map_or(true, |t| t.is_empty())
            && self.date_range.is_none()
            && self.tags.as_ref().map_or(true, |t| t.is_empty())
    }

    /// Check every present criterion against a decrypted entry.
    pub fn matches(&self, entry: &MemoryEntry) -> bool {
        if let Some(keyword) = self.keyword.as_deref().map(str::trim) {
            if !keyword.is_empty() {
                let needle = keyword.to_lowercase();
                if !entry.title.to_lowercase().contains(&needle)
                    && !entry.content.to_lowercase().contains(&needle)
                {
                    return false;
                }
            }
        }

        if let Some(memory_type) = self.memory_type {
            if entry.memory_type != memory_type {
                return false;
            }
        }

        if let Some(wanted) = self.emotion_tags.as_ref().filter(|t| !t.is_empty()) {
            if !wanted.iter().any(|tag| entry.emotion_tags.contains(tag)) {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            if entry.created_at < range.start || entry.created_at > range.end {
                return false;
            }
        }

        if let Some(wanted) = self.tags.as_ref().filter(|t| !t.is_empty()) {
            let entry_tags = entry
                .metadata
                .as_ref()
                .and_then(|m| m.tags.as_ref())
                .map(Vec::as_slice)
                .unwrap_or_default();
            if !wanted
                .iter()
                .any(|w| entry_tags.iter().any(|t| t.eq_ignore_ascii_case(w)))
            {
                return false;
            }
        }

        true
    }

    /// Apply the filter, preserving input order.
    pub fn apply(&self, entries: Vec<MemoryEntry>) -> Vec<MemoryEntry> {
        entries.into_iter().filter(|e| self.matches(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, EmotionTag, MemoryMetadata, MemoryType};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn entry(title: &str, content: &str) -> MemoryEntry {
        let at = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        MemoryEntry {
            id: Uuid::now_v7(),
            title: title.to_string(),
            content: content.to_string(),
            memory_type: MemoryType::Text,
            emotion_tags: vec![EmotionTag::Nostalgia],
            created_at: at,
            updated_at: at,
            is_encrypted: false,
            attachments: Vec::new(),
            metadata: Some(MemoryMetadata {
                tags: Some(vec!["Travel".to_string()]),
                ..MemoryMetadata::for_content(content)
            }),
        }
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = SearchFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&entry("a", "b")));
    }

    #[test]
    fn test_keyword_case_insensitive_title_or_content() {
        let e = entry("Summer at the Lake", "We swam until dusk");
        assert!(SearchFilter::keyword("lake").matches(&e));
        assert!(SearchFilter::keyword("DUSK").matches(&e));
        assert!(!SearchFilter::keyword("winter").matches(&e));
    }

    #[test]
    fn test_blank_keyword_ignored() {
        assert!(SearchFilter::keyword("   ").matches(&entry("a", "b")));
    }

    #[test]
    fn test_memory_type_filter() {
        let filter = SearchFilter {
            memory_type: Some(MemoryType::Audio),
            ..Default::default()
        };
        assert!(!filter.matches(&entry("a", "b")));
    }

    #[test]
    fn test_emotion_tags_any_match() {
        let filter = SearchFilter {
            emotion_tags: Some(vec![EmotionTag::Joy, EmotionTag::Nostalgia]),
            ..Default::default()
        };
        assert!(filter.matches(&entry("a", "b")));

        let filter = SearchFilter {
            emotion_tags: Some(vec![EmotionTag::Regret]),
            ..Default::default()
        };
        assert!(!filter.matches(&entry("a", "b")));
    }

    #[test]
    fn test_date_range_inclusive() {
        let e = entry("a", "b");
        let filter = SearchFilter {
            date_range: Some(DateRange {
                start: e.created_at,
                end: e.created_at,
            }),
            ..Default::default()
        };
        assert!(filter.matches(&e));

        let filter = SearchFilter {
            date_range: Some(DateRange {
                start: e.created_at + Duration::seconds(1),
                end: e.created_at + Duration::days(1),
            }),
            ..Default::default()
        };
        assert!(!filter.matches(&e));
    }

    #[test]
    fn test_metadata_tags_filter() {
        let filter = SearchFilter {
            tags: Some(vec!["travel".to_string()]),
            ..Default::default()
        };
        assert!(filter.matches(&entry("a", "b")));

        let mut untagged = entry("a", "b");
        untagged.metadata = None;
        assert!(!filter.matches(&untagged));
    }

    #[test]
    fn test_apply_keeps_order() {
        let entries = vec![entry("lake one", ""), entry("city", ""), entry("lake two", "")];
        let found = SearchFilter::keyword("lake").apply(entries);
        let titles: Vec<_> = found.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["lake one", "lake two"]);
    }
}
