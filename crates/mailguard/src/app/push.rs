//! Push event handlers, one per event kind.

use std::time::Instant;

use mailguard_core::{Dispatcher, EventKind, MergeOutcome, Notice, PushEvent};
use tracing::{info, warn};

use super::Session;

/// Handler table for the session.
pub fn dispatcher() -> Dispatcher<Session> {
    Dispatcher::new()
        .on(EventKind::Connected, on_connected)
        .on(EventKind::NewEmail, on_new_email)
        .on(EventKind::Error, on_error)
        .on(EventKind::Disconnect, on_disconnect)
}

fn on_connected(session: &mut Session, event: PushEvent) {
    if let PushEvent::Connected { client_id } = event {
        info!(client_id = client_id.as_deref().unwrap_or("-"), "Live updates connected");
        session.notify(Notice::info("Live updates connected"));
    }
}

fn on_new_email(session: &mut Session, event: PushEvent) {
    let PushEvent::NewEmail(record) = event else {
        return;
    };
    let sender = record.sender.clone();
    let subject = record.display_subject().to_string();
    if session.reconciler.merge_push(*record, Instant::now()) != MergeOutcome::Inserted {
        return;
    }
    if !session.reconciler.view_state().view().is_mail_view() {
        session.load_stats();
    }
    if session.config.desktop_notifications {
        desktop_notification(format!("New email from {sender}"), subject);
    }
}

fn on_error(session: &mut Session, event: PushEvent) {
    if let PushEvent::Error { message } = event {
        session.notify(Notice::error(format!("Server error: {message}")));
    }
}

fn on_disconnect(session: &mut Session, event: PushEvent) {
    if let PushEvent::Disconnect { reason } = event {
        let text = reason.map_or_else(
            || "Live updates disconnected".to_string(),
            |reason| format!("Live updates disconnected: {reason}"),
        );
        session.notify(Notice::info(text));
    }
}

fn desktop_notification(summary: String, body: String) {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = notify_rust::Notification::new()
            .appname("MailGuard")
            .summary(&summary)
            .body(&body)
            .show()
        {
            warn!(error = %e, "Desktop notification failed");
        }
    });
}
