//! Single email detail.

use mailguard_core::{EmailRecord, PolicyApplied, ProcessingStatus};
use ratatui::{
    Frame,
    layout::Rect,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::date;

const RULE: &str = "----------------------------------------";

/// Headers, status, detections, body and attachments of one record.
pub fn render(record: &EmailRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", record.display_subject()));
    out.push_str(&format!("From: {}\n", or_unknown(&record.sender)));
    let to = record.recipients.join(", ");
    out.push_str(&format!("To: {}\n", or_unknown(&to)));
    out.push_str(&format!("Date: {}\n", date::full(record.timestamp)));

    let mut status = format!("Status: {}", record.status);
    if record.policy_applied != PolicyApplied::None {
        status.push_str(&format!("   Policy: {}", record.policy_applied.as_str()));
    }
    if let Some(ms) = record.processing_time_ms {
        status.push_str(&format!("   Time: {ms:.2} ms"));
    }
    out.push_str(&status);
    out.push('\n');
    if record.status == ProcessingStatus::Error {
        if let Some(message) = &record.error_message {
            out.push_str(&format!("Error: {message}\n"));
        }
    }

    if !record.detection_results.is_empty() {
        out.push_str("Detections:\n");
        for detection in &record.detection_results {
            out.push_str(&format!("  - {}", detection.pattern_type));
            if let Some(confidence) = detection.confidence {
                out.push_str(&format!(" ({:.0}%)", confidence * 100.0));
            }
            if let Some(text) = &detection.matched_text {
                out.push_str(&format!(": {text}"));
            }
            out.push('\n');
        }
    }

    out.push_str(RULE);
    out.push('\n');
    match record.body_text.as_deref() {
        Some(body) if !body.trim().is_empty() => out.push_str(body.trim_end()),
        _ => out.push_str("(no content)"),
    }
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');

    let attachments = record.attachment_list();
    if !attachments.is_empty() {
        out.push_str(&format!("Attachments ({}):\n", attachments.len()));
        for attachment in attachments {
            match attachment.id {
                Some(id) => out.push_str(&format!(
                    "  [{id}] {}   (mailguard download {id})\n",
                    attachment.filename
                )),
                None => out.push_str(&format!("  {}   (not downloadable)\n", attachment.filename)),
            }
        }
    }
    out
}

/// Detail pane of the live session.
pub fn draw(frame: &mut Frame, area: Rect, record: &EmailRecord) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Email #{}", record.id));
    let paragraph = Paragraph::new(render(record))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() { "Unknown" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailguard_core::{AttachmentRef, DetectionResult};

    #[test]
    fn test_full_record() {
        let mut record = EmailRecord::new(9, "b@y.com", vec!["a@x.com".into(), "c@z.com".into()])
            .with_subject("Card numbers")
            .with_status(ProcessingStatus::Flagged);
        record.policy_applied = PolicyApplied::Tag;
        record.body_text = Some("4111 1111 1111 1111\n".into());
        record.processing_time_ms = Some(3.5);
        let mut detection = DetectionResult::new("credit_card");
        detection.confidence = Some(0.95);
        record.detection_results = vec![detection];
        record.attachments = vec![
            AttachmentRef {
                id: Some(7),
                filename: "cards.csv".into(),
                file_path: None,
            },
        ];

        let out = render(&record);
        assert!(out.starts_with("Card numbers\nFrom: b@y.com\nTo: a@x.com, c@z.com\nDate: Unknown\n"));
        assert!(out.contains("Status: flagged   Policy: tag   Time: 3.50 ms\n"));
        assert!(out.contains("  - credit_card (95%)\n"));
        assert!(out.contains("\n4111 1111 1111 1111\n"));
        assert!(out.contains("  [7] cards.csv   (mailguard download 7)\n"));
    }

    #[test]
    fn test_sparse_record() {
        let mut record = EmailRecord::new(1, "", Vec::new());
        record.attachment_names = vec!["old.pdf".into()];
        record.status = ProcessingStatus::Error;
        record.error_message = Some("scanner crashed".into());

        let out = render(&record);
        assert!(out.starts_with("(no subject)\nFrom: Unknown\nTo: Unknown\n"));
        assert!(out.contains("Error: scanner crashed\n"));
        assert!(out.contains("(no content)"));
        assert!(out.contains("  old.pdf   (not downloadable)\n"));
        assert!(!out.contains("Detections"));
    }

    #[test]
    fn test_draw_pane() {
        let record = EmailRecord::new(4, "b@y.com", vec!["a@x.com".into()]).with_subject("Hello");
        let lines = crate::view::render_lines(60, 12, |frame| {
            let area = frame.area();
            draw(frame, area, &record);
        });
        assert!(lines[0].starts_with("┌Email #4─"));
        assert!(lines[1].starts_with("│Hello"));
        assert!(lines[2].starts_with("│From: b@y.com"));
    }
}
