//! Live-update reconciliation.
//!
//! A [`Reconciler`] keeps the displayed list consistent with periodically or
//! on-demand fetched snapshots and with individually pushed records, under the
//! membership rule of the active view.

mod highlight;
mod reconciler;

pub use highlight::{DEFAULT_HIGHLIGHT_TTL, HighlightSet};
pub use reconciler::{LoadTicket, MergeOutcome, Reconciler, SnapshotOutcome};
