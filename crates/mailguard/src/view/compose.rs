//! Compose summary and send result.

use mailguard_client::{Error, SendReceipt};
use mailguard_core::{Notice, OutgoingEmail};

/// What is about to be sent.
pub fn summary(email: &OutgoingEmail) -> String {
    let mut out = format!(
        "From: {}\nTo: {}\nSubject: {}\n",
        email.from,
        email.to_field(),
        email.subject
    );
    if !email.attachments.is_empty() {
        out.push_str(&format!("Attachments ({}):\n", email.attachments.len()));
        for attachment in &email.attachments {
            out.push_str(&format!(
                "  {} ({:.1} KB)\n",
                attachment.filename,
                attachment.size_kib()
            ));
        }
    }
    out
}

/// Notice for the outcome of a send.
pub fn result_notice(result: &Result<SendReceipt, Error>) -> Notice {
    match result {
        Ok(receipt) if receipt.success => Notice::success("Email sent successfully!"),
        Ok(receipt) => Notice::error(
            receipt
                .message
                .clone()
                .unwrap_or_else(|| "Failed to send email".to_string()),
        ),
        Err(e) => Notice::error(e.to_string()),
    }
}
