//! Dream Echo recall selection.
//!
//! Picks a past entry uniformly at random while keeping the most recently
//! recalled ids out of the candidate pool. The selector knows nothing about
//! time windows or quotas; callers decide when to ask.

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Bounded FIFO of recently recalled ids. Oldest ids are evicted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallHistory<T> {
    capacity: usize,
    recent: VecDeque<T>,
}

impl<T: Clone + PartialEq> RecallHistory<T> {
    /// Empty history holding at most `capacity` ids (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            recent: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    pub fn contains(&self, id: &T) -> bool {
        self.recent.contains(id)
    }

    /// Ids from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.recent.iter()
    }

    /// Most recently recalled id.
    pub fn last(&self) -> Option<&T> {
        self.recent.back()
    }

    /// Record `id` as the newest entry, evicting the oldest past capacity.
    pub fn push(&mut self, id: T) {
        self.recent.retain(|existing| existing != &id);
        self.recent.push_back(id);
        while self.recent.len() > self.capacity {
            self.recent.pop_front();
        }
    }

    /// Drop ids that are no longer in the journal.
    pub fn retain_known(&mut self, known: &[T]) {
        self.recent.retain(|id| known.contains(id));
    }

    /// Evict oldest ids until at most `len` remain.
    fn trim_to(&mut self, len: usize) {
        while self.recent.len() > len {
            self.recent.pop_front();
        }
    }
}

/// Choose the next id to recall.
///
/// Candidates are `all_ids` minus the history. When the history covers the
/// whole set it is cut back to the most recent id, which stays excluded, so
/// the id just shown is never picked again right away. A single id is always
/// selected. An empty `all_ids` yields `None`.
pub fn select_next<T, R>(
    all_ids: &[T],
    history: &RecallHistory<T>,
    rng: &mut R,
) -> (Option<T>, RecallHistory<T>)
where
    T: Clone + PartialEq,
    R: Rng + ?Sized,
{
    let mut next = history.clone();
    next.retain_known(all_ids);

    if all_ids.is_empty() {
        return (None, next);
    }

    let mut candidates: Vec<&T> = all_ids.iter().filter(|id| !next.contains(id)).collect();
    if candidates.is_empty() {
        debug!(
            subsystem = "recall",
            entry_count = all_ids.len(),
            "Recall history covers every entry, resetting pool"
        );
        next.trim_to(1);
        candidates = all_ids.iter().filter(|id| !next.contains(id)).collect();
        if candidates.is_empty() {
            candidates = all_ids.iter().collect();
        }
    }

    let selected = candidates.choose(rng).map(|id| (*id).clone());
    if let Some(id) = &selected {
        next.push(id.clone());
    }
    (selected, next)
}
