//! Outgoing email composed by the user.

use crate::{Error, Result};

/// A file attached to an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    /// Filename presented to the server.
    pub filename: String,
    /// Raw file content.
    pub content: Vec<u8>,
}

impl OutgoingAttachment {
    /// Creates an attachment from a name and its bytes.
    #[must_use]
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }

    /// Size in KiB, for the compose summary.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_kib(&self) -> f64 {
        self.content.len() as f64 / 1024.0
    }
}

/// An email to submit through the server's send endpoint.
#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    /// Sender address (the active identity).
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Plain text body.
    pub body: String,
    /// Attachments, sent as `attachment_0`, `attachment_1`, ...
    pub attachments: Vec<OutgoingAttachment>,
}

impl OutgoingEmail {
    /// Creates a new outgoing email.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: Vec::new(),
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Adds a recipient.
    #[must_use]
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn attach(mut self, attachment: OutgoingAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Removes the attachment at `index`, if any.
    pub fn remove_attachment(&mut self, index: usize) -> Option<OutgoingAttachment> {
        (index < self.attachments.len()).then(|| self.attachments.remove(index))
    }

    /// Recipients joined for the `to` form field, blanks dropped.
    #[must_use]
    pub fn to_field(&self) -> String {
        self.to
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Checks that the email can be submitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the sender or every recipient is blank.
    pub fn validate(&self) -> Result<()> {
        if self.from.trim().is_empty() {
            return Err(Error::Validation("Sender address is required".into()));
        }
        if self.to_field().is_empty() {
            return Err(Error::Validation(
                "Please enter a recipient email address".into(),
            ));
        }
        Ok(())
    }
}
