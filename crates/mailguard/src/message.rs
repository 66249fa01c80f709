//! Message types for session events.
//!
//! In the Elm architecture, Messages are events that trigger state changes.
//! Background tasks report back with a `Message`; the session loop is the
//! only place state changes.

use std::path::PathBuf;

use crossterm::event::Event;
use mailguard_client::ChannelEvent;
use mailguard_core::{EmailId, EmailPage, EmailRecord, LoadTicket, MailView, ProcessingStatus, Stats};

/// Session messages (events).
#[derive(Debug)]
pub enum Message {
    /// A snapshot load finished.
    EmailsLoaded {
        /// Ticket issued when the load started.
        ticket: LoadTicket,
        /// Page or error text.
        result: Result<EmailPage, String>,
    },
    /// Stats finished loading.
    StatsLoaded(Result<Stats, String>),
    /// Detail of one email finished loading.
    DetailLoaded(Result<EmailRecord, String>),
    /// An attachment was saved to disk.
    AttachmentSaved(Result<PathBuf, String>),
    /// The new identity was persisted.
    IdentitySaved(Result<(), String>),
    /// Something happened on the push channel.
    Push(ChannelEvent),
    /// Key press or resize from the terminal.
    Terminal(Event),
    /// The earliest highlight or notice deadline passed.
    Expire,
    /// Periodic refresh.
    Refresh,
}

/// Interactive commands, from a key binding or the command prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reload the current view.
    Refresh,
    /// Show one email.
    Open(EmailId),
    /// Close the detail pane.
    Back,
    /// Switch between inbox and sent.
    SwitchView(MailView),
    /// Change the active identity.
    SetIdentity(String),
    /// Next page.
    NextPage,
    /// Previous page.
    PrevPage,
    /// Toggle the flagged-only filter.
    ToggleFlagged,
    /// Set or clear the status filter.
    StatusFilter(Option<ProcessingStatus>),
    /// Download an attachment.
    Download(i64),
    /// Leave the session.
    Quit,
}

impl Command {
    /// Parses one prompt line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the text to show for an unknown command or a bad argument.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();

        let command = match verb.to_ascii_lowercase().as_str() {
            "r" | "refresh" => Self::Refresh,
            "o" | "open" => Self::Open(EmailId(number(arg, "o <email-id>")?)),
            "b" | "back" => Self::Back,
            "v" | "view" => match arg.map(str::to_ascii_lowercase).as_deref() {
                Some("inbox") => Self::SwitchView(MailView::Inbox),
                Some("sent") => Self::SwitchView(MailView::Sent),
                _ => return Err("Usage: v inbox|sent".to_string()),
            },
            "i" | "identity" => match arg {
                Some(email) => Self::SetIdentity(email.to_string()),
                None => return Err("Usage: i <email>".to_string()),
            },
            "n" | "next" => Self::NextPage,
            "p" | "prev" | "previous" => Self::PrevPage,
            "f" | "flagged" => Self::ToggleFlagged,
            "s" | "status" => match arg {
                None => return Err("Usage: s <status|all>".to_string()),
                Some(value) if value.eq_ignore_ascii_case("all") => Self::StatusFilter(None),
                Some(value) => match ProcessingStatus::parse(value) {
                    Some(status) => Self::StatusFilter(Some(status)),
                    None => return Err(format!("Unknown status: {value}")),
                },
            },
            "d" | "download" => Self::Download(number(arg, "d <attachment-id>")?),
            "q" | "quit" | "exit" => Self::Quit,
            other => return Err(format!("Unknown command: {other}")),
        };
        Ok(Some(command))
    }
}

fn number(arg: Option<&str>, usage: &str) -> Result<i64, String> {
    arg.and_then(|a| a.trim_start_matches('#').parse().ok())
        .ok_or_else(|| format!("Usage: {usage}"))
}
