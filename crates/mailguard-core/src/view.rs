//! View membership rules, pagination and filter state.
//!
//! The mail views (inbox, sent) select records client-side by matching the
//! active identity against recipients or sender. The admin view selects
//! nothing locally: its flagged and status filters travel to the server as
//! query parameters.

use crate::model::{EmailPage, EmailRecord, ProcessingStatus};
use crate::{Error, Result};

/// The active user identity, matched case-insensitively by substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    raw: String,
    lower: String,
}

impl Identity {
    /// Creates an identity from user input.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] when the input is blank. A blank
    /// identity would be a substring of every address.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into().trim().to_string();
        if raw.is_empty() {
            return Err(Error::InvalidIdentity(raw));
        }
        let lower = raw.to_lowercase();
        Ok(Self { raw, lower })
    }

    /// The identity as entered (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether `address` contains this identity, ignoring case.
    #[must_use]
    pub fn matches(&self, address: &str) -> bool {
        address.to_lowercase().contains(&self.lower)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Which list is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MailView {
    /// Records addressed to the identity.
    #[default]
    Inbox,
    /// Records sent by the identity.
    Sent,
    /// Every record, filtered server-side.
    Admin,
}

impl MailView {
    /// Heading shown above the list.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Sent => "Sent",
            Self::Admin => "All Emails",
        }
    }

    /// Lowercase name used in empty-state text and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inbox => "inbox",
            Self::Sent => "sent",
            Self::Admin => "admin",
        }
    }

    /// Value of the `view` query parameter.
    #[must_use]
    pub const fn query_value(self) -> &'static str {
        match self {
            Self::Inbox | Self::Sent => "smtp_client",
            Self::Admin => "admin",
        }
    }

    /// Whether this is an end-user mail view.
    #[must_use]
    pub const fn is_mail_view(self) -> bool {
        matches!(self, Self::Inbox | Self::Sent)
    }

    /// View membership predicate.
    ///
    /// Inbox: some recipient contains the identity. Sent: the sender contains
    /// it. Admin: always a member.
    #[must_use]
    pub fn is_member(self, record: &EmailRecord, identity: &Identity) -> bool {
        match self {
            Self::Inbox => record.recipients.iter().any(|r| identity.matches(r)),
            Self::Sent => identity.matches(&record.sender),
            Self::Admin => true,
        }
    }

    /// Blocked records never surface in the mail views.
    #[must_use]
    pub fn suppresses(self, record: &EmailRecord) -> bool {
        self.is_mail_view() && record.status == ProcessingStatus::Blocked
    }
}

/// Page cursor with navigation bounded by `[1, total_pages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    total_pages: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
        }
    }
}

impl Pagination {
    /// Current 1-based page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Number of pages, at least one.
    #[must_use]
    pub const fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Moves to `page`. Out-of-range requests are rejected and leave the
    /// cursor unchanged.
    pub const fn set(&mut self, page: u32) -> bool {
        if page >= 1 && page <= self.total_pages {
            self.page = page;
            true
        } else {
            false
        }
    }

    /// Moves by `delta` pages, with the same bounds as [`Pagination::set`].
    pub fn step(&mut self, delta: i64) -> bool {
        let target = i64::from(self.page) + delta;
        u32::try_from(target).is_ok_and(|page| self.set(page))
    }

    /// Back to page 1.
    pub const fn reset(&mut self) {
        self.page = 1;
    }

    /// Adopts the page metadata a snapshot reported.
    pub fn update_from(&mut self, page: &EmailPage) {
        self.total_pages = page.page_count();
        self.page = page.current_page().min(self.total_pages);
    }
}

/// Query parameters for `GET /api/emails`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailQuery {
    /// 1-based page.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
    /// Only flagged records.
    pub flagged_only: bool,
    /// Only records with this status.
    pub status: Option<ProcessingStatus>,
    /// Client view.
    pub view: MailView,
}

impl EmailQuery {
    /// Query parameter pairs in request order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("flagged", self.flagged_only.to_string()),
        ];
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_string()));
        }
        pairs.push(("view", self.view.query_value().to_string()));
        pairs
    }
}

/// Presentation state for one list: view, filters and page cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    view: MailView,
    pagination: Pagination,
    flagged_only: bool,
    status_filter: Option<ProcessingStatus>,
    per_page: u32,
}

impl ViewState {
    /// Creates state for `view` with the given page size.
    #[must_use]
    pub fn new(view: MailView, per_page: u32) -> Self {
        Self {
            view,
            pagination: Pagination::default(),
            flagged_only: false,
            status_filter: None,
            per_page: per_page.max(1),
        }
    }

    /// Current view.
    #[must_use]
    pub const fn view(&self) -> MailView {
        self.view
    }

    /// Page cursor.
    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Flagged-only toggle.
    #[must_use]
    pub const fn flagged_only(&self) -> bool {
        self.flagged_only
    }

    /// Status filter.
    #[must_use]
    pub const fn status_filter(&self) -> Option<ProcessingStatus> {
        self.status_filter
    }

    /// Page size.
    #[must_use]
    pub const fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Switches view. Returns whether anything changed; a change resets the
    /// page to 1.
    pub fn set_view(&mut self, view: MailView) -> bool {
        if self.view == view {
            return false;
        }
        self.view = view;
        self.pagination.reset();
        true
    }

    /// Replaces both filters. Returns whether anything changed; a change
    /// resets the page to 1.
    pub fn set_filters(&mut self, flagged_only: bool, status: Option<ProcessingStatus>) -> bool {
        if self.flagged_only == flagged_only && self.status_filter == status {
            return false;
        }
        self.flagged_only = flagged_only;
        self.status_filter = status;
        self.pagination.reset();
        true
    }

    /// Flips the flagged-only toggle and resets the page.
    pub fn toggle_flagged(&mut self) {
        let status = self.status_filter;
        self.set_filters(!self.flagged_only, status);
    }

    /// Moves to an absolute page; rejected outside `[1, total_pages]`.
    pub const fn set_page(&mut self, page: u32) -> bool {
        self.pagination.set(page)
    }

    /// Moves by `delta` pages; rejected outside `[1, total_pages]`.
    pub fn step_page(&mut self, delta: i64) -> bool {
        self.pagination.step(delta)
    }

    /// Adopts snapshot pagination metadata.
    pub fn apply_page_metadata(&mut self, page: &EmailPage) {
        self.pagination.update_from(page);
    }

    /// Resets the cursor to a single page at page 1.
    pub fn reset_pagination(&mut self) {
        self.pagination = Pagination::default();
    }

    /// Whether a record satisfies the explicit flagged and status filters.
    #[must_use]
    pub fn filters_accept(&self, record: &EmailRecord) -> bool {
        (!self.flagged_only || record.flagged)
            && self.status_filter.is_none_or(|status| record.status == status)
    }

    /// Query for the current state.
    #[must_use]
    pub const fn query(&self) -> EmailQuery {
        EmailQuery {
            page: self.pagination.page,
            per_page: self.per_page,
            flagged_only: self.flagged_only,
            status: self.status_filter,
            view: self.view,
        }
    }
}
