//! Merges authoritative snapshots and pushed records into one list.

use std::collections::HashSet;
use std::fmt::Display;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::highlight::HighlightSet;
use crate::model::{EmailId, EmailPage, EmailRecord, ProcessingStatus};
use crate::notice::Notice;
use crate::view::{EmailQuery, Identity, MailView, ViewState};

/// Identifies one snapshot load. Results carrying an older ticket than the
/// latest issued one are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct LoadTicket {
    generation: u64,
}

/// What [`Reconciler::apply_snapshot`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The held list was replaced.
    Applied {
        /// Records now held.
        held: usize,
        /// Pushed records the snapshot did not contain yet and that were kept.
        carried_over: usize,
    },
    /// A newer load superseded this one; nothing changed.
    Stale,
}

/// What [`Reconciler::merge_push`] did with a pushed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Prepended and highlighted.
    Inserted,
    /// Already held; nothing changed.
    Duplicate,
    /// Outside the current view (membership, filters or page).
    NotMember,
    /// Blocked record in an end-user mail view.
    Suppressed,
}

/// Client-side message list for one view.
///
/// Owns the held records (display order, newest first), their id set, the
/// view state and the highlight marks. Every mutation is a single method
/// call, so a snapshot load and a push merge never observe each other's
/// partial state.
#[derive(Debug)]
pub struct Reconciler {
    identity: Option<Identity>,
    state: ViewState,
    emails: Vec<EmailRecord>,
    held: HashSet<EmailId>,
    highlights: HighlightSet,
    generation: u64,
    loading: bool,
    pushed_since_load: Vec<EmailRecord>,
}

impl Reconciler {
    /// Creates an empty reconciler for `state`.
    #[must_use]
    pub fn new(state: ViewState, identity: Option<Identity>, highlight_ttl: Duration) -> Self {
        Self {
            identity,
            state,
            emails: Vec::new(),
            held: HashSet::new(),
            highlights: HighlightSet::new(highlight_ttl),
            generation: 0,
            loading: false,
            pushed_since_load: Vec::new(),
        }
    }

    /// Held records in display order.
    #[must_use]
    pub fn emails(&self) -> &[EmailRecord] {
        &self.emails
    }

    /// Looks up a held record.
    #[must_use]
    pub fn get(&self, id: EmailId) -> Option<&EmailRecord> {
        self.emails.iter().find(|e| e.id == id)
    }

    /// Whether `id` is held.
    #[must_use]
    pub fn contains(&self, id: EmailId) -> bool {
        self.held.contains(&id)
    }

    /// View and filter state.
    #[must_use]
    pub const fn view_state(&self) -> &ViewState {
        &self.state
    }

    /// Active identity.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Whether the latest issued load has not completed.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether `id` is highlighted as freshly pushed.
    #[must_use]
    pub fn is_highlighted(&self, id: EmailId) -> bool {
        self.highlights.contains(id)
    }

    /// Earliest highlight deadline, if any.
    #[must_use]
    pub fn next_highlight_deadline(&self) -> Option<Instant> {
        self.highlights.next_deadline()
    }

    /// Drops expired highlights and returns their ids.
    pub fn expire_highlights(&mut self, now: Instant) -> Vec<EmailId> {
        self.highlights.expire(now)
    }

    /// Starts a snapshot load for the current state.
    ///
    /// Any load still in flight becomes stale.
    pub fn begin_load(&mut self) -> (LoadTicket, EmailQuery) {
        self.generation += 1;
        self.loading = true;
        self.pushed_since_load.clear();
        debug!(
            generation = self.generation,
            view = self.state.view().as_str(),
            "Starting snapshot load"
        );
        (
            LoadTicket {
                generation: self.generation,
            },
            self.state.query(),
        )
    }

    /// Replaces the held list with a snapshot.
    ///
    /// Mail views keep only members of the view and drop blocked records.
    /// Records pushed after the load began that the snapshot lacks are kept
    /// at the front, so either arrival order converges on the same list.
    pub fn apply_snapshot(&mut self, ticket: LoadTicket, page: EmailPage) -> SnapshotOutcome {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale snapshot"
            );
            return SnapshotOutcome::Stale;
        }

        self.state.apply_page_metadata(&page);

        let mut emails = Vec::with_capacity(page.emails.len());
        let mut held = HashSet::with_capacity(page.emails.len());
        for record in page.emails {
            if self.admits_snapshot_record(&record) && held.insert(record.id) {
                emails.push(record);
            }
        }

        let mut carried: Vec<EmailRecord> = std::mem::take(&mut self.pushed_since_load)
            .into_iter()
            .filter(|record| held.insert(record.id))
            .collect();
        let carried_over = carried.len();
        carried.extend(emails);

        self.emails = carried;
        self.held = held;
        self.loading = false;
        self.highlights.retain(|id| self.held.contains(&id));

        info!(
            view = self.state.view().as_str(),
            held = self.emails.len(),
            carried_over,
            "Applied snapshot"
        );
        SnapshotOutcome::Applied {
            held: self.emails.len(),
            carried_over,
        }
    }

    /// Records a failed load. The last known list is kept.
    ///
    /// Returns the notice to show, or `None` when the load was already stale.
    pub fn apply_failure(&mut self, ticket: LoadTicket, error: impl Display) -> Option<Notice> {
        if ticket.generation != self.generation {
            return None;
        }
        self.loading = false;
        Some(Notice::error(format!("Error loading emails: {error}")))
    }

    /// Merges one pushed record.
    ///
    /// The record must belong to the view and must not be a blocked record
    /// in a mail view. A record whose id is already held is ignored, so
    /// repeated delivery of the same event is harmless.
    pub fn merge_push(&mut self, record: EmailRecord, now: Instant) -> MergeOutcome {
        let view = self.state.view();
        if !self.admits_push_membership(&record) {
            debug!(id = %record.id, view = view.as_str(), "Pushed record outside view");
            return MergeOutcome::NotMember;
        }
        if view.suppresses(&record) {
            debug!(id = %record.id, "Suppressing blocked record");
            return MergeOutcome::Suppressed;
        }
        if !self.held.insert(record.id) {
            debug!(id = %record.id, "Duplicate push ignored");
            return MergeOutcome::Duplicate;
        }

        self.highlights.insert(record.id, now);
        if self.loading {
            self.pushed_since_load.push(record.clone());
        }
        info!(id = %record.id, view = view.as_str(), "Merged pushed record");
        self.emails.insert(0, record);
        MergeOutcome::Inserted
    }

    /// Switches view. The held list is cleared because it belongs to the
    /// previous view; returns whether the view changed.
    pub fn set_view(&mut self, view: MailView) -> bool {
        if !self.state.set_view(view) {
            return false;
        }
        self.clear_held();
        self.state.reset_pagination();
        true
    }

    /// Replaces the identity, clearing everything held for the previous one.
    pub fn set_identity(&mut self, identity: Identity) -> bool {
        if self.identity.as_ref() == Some(&identity) {
            return false;
        }
        info!(identity = identity.as_str(), "Identity changed");
        self.identity = Some(identity);
        self.clear_held();
        self.state.reset_pagination();
        true
    }

    /// Replaces the flagged and status filters. A change resets the page and
    /// invalidates loads in flight.
    pub fn set_filters(&mut self, flagged_only: bool, status: Option<ProcessingStatus>) -> bool {
        let changed = self.state.set_filters(flagged_only, status);
        if changed {
            self.invalidate_loads();
        }
        changed
    }

    /// Flips the flagged-only filter.
    pub fn toggle_flagged(&mut self) {
        let status = self.state.status_filter();
        self.set_filters(!self.state.flagged_only(), status);
    }

    /// Moves to `page`; rejected outside `[1, total_pages]`.
    pub fn set_page(&mut self, page: u32) -> bool {
        let moved = self.state.set_page(page);
        if moved {
            self.invalidate_loads();
        }
        moved
    }

    /// Moves by `delta` pages; rejected outside `[1, total_pages]`.
    pub fn step_page(&mut self, delta: i64) -> bool {
        let moved = self.state.step_page(delta);
        if moved {
            self.invalidate_loads();
        }
        moved
    }

    /// Drops held records and highlights, e.g. on teardown.
    pub fn clear(&mut self) {
        self.clear_held();
    }

    fn clear_held(&mut self) {
        self.emails.clear();
        self.held.clear();
        self.highlights.clear();
        self.invalidate_loads();
    }

    fn invalidate_loads(&mut self) {
        self.generation += 1;
        self.loading = false;
        self.pushed_since_load.clear();
    }

    fn admits_snapshot_record(&self, record: &EmailRecord) -> bool {
        let view = self.state.view();
        match (&self.identity, view) {
            (_, MailView::Admin) => true,
            (Some(identity), _) => view.is_member(record, identity) && !view.suppresses(record),
            (None, _) => false,
        }
    }

    fn admits_push_membership(&self, record: &EmailRecord) -> bool {
        let view = self.state.view();
        match (&self.identity, view) {
            // Newest records belong on page 1 and must match the server-side filters.
            (_, MailView::Admin) => {
                self.state.pagination().page() == 1 && self.state.filters_accept(record)
            }
            (Some(identity), _) => view.is_member(record, identity),
            (None, _) => false,
        }
    }
}
