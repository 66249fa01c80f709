//! Notices shown under the list until their deadline passes.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use mailguard_core::Notice;

/// How long a notice stays on screen.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Notices kept at once; the oldest is dropped first.
const MAX_NOTICES: usize = 5;

/// Bounded queue of notices, each with its own expiry deadline.
#[derive(Debug)]
pub struct Notices {
    items: VecDeque<(Notice, Instant)>,
    ttl: Duration,
}

impl Notices {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::with_capacity(MAX_NOTICES),
            ttl,
        }
    }

    /// Adds a notice that expires `ttl` after `now`.
    pub fn push(&mut self, notice: Notice, now: Instant) {
        if self.items.len() == MAX_NOTICES {
            self.items.pop_front();
        }
        self.items.push_back((notice, now + self.ttl));
    }

    /// Drops notices whose deadline is at or before `now`. Returns how many.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        self.items.retain(|(_, deadline)| *deadline > now);
        before - self.items.len()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.items.iter().map(|(_, deadline)| *deadline).min()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter().map(|(notice, _)| notice)
    }
}
