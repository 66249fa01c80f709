//! # mailguard-core
//!
//! Client-side state for `MailGuard` mail views and the admin dashboard.
//!
//! This crate provides:
//! - Domain models for intercepted email records, stats and pages
//! - View membership rules (inbox, sent, admin) and pagination state
//! - The **live-update reconciler**: merges authoritative snapshots with
//!   pushed records into one deduplicated, newest-first list
//! - Transient highlight tracking for freshly pushed records
//! - Push-event decoding and a kind-keyed dispatch table
//! - User-visible notices for recoverable failures
//!
//! Nothing here performs I/O. Network access lives in `mailguard-client`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod event;
pub mod model;
pub mod notice;
pub mod reconcile;
pub mod view;

pub use error::{Error, Result};
pub use event::{Dispatcher, EventKind, Handler, PushEvent, decode_event, decode_sse_data};
pub use model::{
    AttachmentRef, Badge, DetectionResult, EmailId, EmailPage, EmailRecord, OutgoingAttachment,
    OutgoingEmail, PolicyApplied, ProcessingStatus, Stats,
};
pub use notice::{Notice, NoticeLevel};
pub use reconcile::{
    DEFAULT_HIGHLIGHT_TTL, HighlightSet, LoadTicket, MergeOutcome, Reconciler, SnapshotOutcome,
};
pub use view::{EmailQuery, Identity, MailView, Pagination, ViewState};
