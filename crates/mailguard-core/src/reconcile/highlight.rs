//! Short-lived highlight marks for records that just arrived by push.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::model::EmailId;

/// How long a pushed record stays highlighted.
pub const DEFAULT_HIGHLIGHT_TTL: Duration = Duration::from_millis(600);

/// Ids with individual expiry deadlines.
///
/// Every id expires on its own deadline; later insertions never extend or
/// shorten another id's lifetime.
#[derive(Debug, Clone)]
pub struct HighlightSet {
    ttl: Duration,
    deadlines: HashMap<EmailId, Instant>,
}

impl Default for HighlightSet {
    fn default() -> Self {
        Self::new(DEFAULT_HIGHLIGHT_TTL)
    }
}

impl HighlightSet {
    /// Creates an empty set with the given lifetime per entry.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            deadlines: HashMap::new(),
        }
    }

    /// Lifetime applied to new entries.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Marks `id` until `now + ttl`. An id that is already marked keeps its
    /// original deadline. Returns the deadline in effect.
    pub fn insert(&mut self, id: EmailId, now: Instant) -> Instant {
        *self.deadlines.entry(id).or_insert(now + self.ttl)
    }

    /// Whether `id` is currently marked.
    #[must_use]
    pub fn contains(&self, id: EmailId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Removes and returns every id whose deadline is at or before `now`,
    /// in ascending id order.
    pub fn expire(&mut self, now: Instant) -> Vec<EmailId> {
        let mut expired: Vec<EmailId> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            self.deadlines.remove(id);
        }
        expired.sort_unstable();
        expired
    }

    /// Keeps only the ids for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(EmailId) -> bool) {
        self.deadlines.retain(|id, _| keep(*id));
    }

    /// Earliest pending deadline, for scheduling the next expiry.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Number of marked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Drops every mark.
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }
}
