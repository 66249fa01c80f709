//! Domain models shared by the mail views and the admin dashboard.

mod email;
mod outgoing;
mod page;
mod stats;

pub use email::{
    AttachmentRef, Badge, DetectionResult, EmailId, EmailRecord, PolicyApplied, ProcessingStatus,
};
pub use outgoing::{OutgoingAttachment, OutgoingEmail};
pub use page::EmailPage;
pub use stats::Stats;
