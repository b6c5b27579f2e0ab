//! Journal statistics.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::models::{MemoryEntry, MemoryStats};

impl MemoryStats {
    /// Aggregate over decrypted entries. `today` anchors the current streak.
    pub fn from_entries(entries: &[MemoryEntry], today: NaiveDate) -> Self {
        let mut stats = MemoryStats {
            total_entries: entries.len() as u32,
            ..Default::default()
        };

        let mut days = BTreeSet::new();
        for entry in entries {
            let words = entry
                .metadata
                .as_ref()
                .and_then(|m| m.word_count)
                .unwrap_or_else(|| entry.content.chars().count() as u32);
            stats.total_words += words;

            *stats.entries_by_type.entry(entry.memory_type).or_insert(0) += 1;
            for tag in &entry.emotion_tags {
                *stats.entries_by_emotion.entry(*tag).or_insert(0) += 1;
            }
            let month = entry.created_at.format("%Y-%m").to_string();
            *stats.entries_by_month.entry(month).or_insert(0) += 1;

            days.insert(entry.created_at.date_naive());
        }

        if stats.total_entries > 0 {
            stats.average_words_per_entry = stats.total_words as f32 / stats.total_entries as f32;
        }
        stats.longest_streak = longest_streak(&days);
        stats.current_streak = current_streak(&days, today);
        stats
    }
}

fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(p) if *day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(*day);
    }
    longest
}

/// Consecutive days ending today, or yesterday when nothing is written yet today.
fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut cursor = if days.contains(&today) {
        today
    } else {
        today - Duration::days(1)
    };
    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}
