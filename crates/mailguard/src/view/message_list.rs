//! Inbox and sent lists.

use chrono::{DateTime, Utc};
use mailguard_core::{Badge, EmailRecord, MailView, Reconciler};
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
};

use super::date;

/// Marker for rows still highlighted as freshly pushed.
pub const NEW_MARKER: char = '*';

const WIDTHS: [Constraint; 6] = [
    Constraint::Length(1),
    Constraint::Length(6),
    Constraint::Length(28),
    Constraint::Min(20),
    Constraint::Length(14),
    Constraint::Length(20),
];

/// "Inbox - a@x.com (2 emails)".
pub fn title(reconciler: &Reconciler) -> String {
    let who = reconciler
        .identity()
        .map_or_else(String::new, |identity| format!(" - {identity}"));
    let count = match reconciler.emails().len() {
        1 => "1 email".to_string(),
        n => format!("{n} emails"),
    };
    format!("{}{who} ({count})", reconciler.view_state().view().title())
}

/// Draws the held list of a mail view.
pub fn draw(
    frame: &mut Frame,
    area: Rect,
    reconciler: &Reconciler,
    now: DateTime<Utc>,
    selected: &mut TableState,
) {
    let view = reconciler.view_state().view();
    let block = Block::default().borders(Borders::ALL).title(title(reconciler));
    let emails = reconciler.emails();

    if emails.is_empty() {
        let text = if reconciler.is_loading() {
            "Loading emails...".to_string()
        } else {
            format!("No emails in {}", view.as_str())
        };
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let rows = emails.iter().map(|record| {
        let highlighted = reconciler.is_highlighted(record.id);
        let style = if highlighted {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(cells(record, view, highlighted, now)).style(style)
    });
    let table = Table::new(rows, WIDTHS)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(table, area, selected);
}

/// Cells of one row: marker, id, counterpart, subject, age, extras.
pub fn cells(
    record: &EmailRecord,
    view: MailView,
    highlighted: bool,
    now: DateTime<Utc>,
) -> [String; 6] {
    let counterpart = match view {
        MailView::Sent => format!(
            "To: {}",
            record.recipients.first().map_or("Unknown", String::as_str)
        ),
        _ => record.sender.clone(),
    };
    let mut extras = Vec::new();
    if record.attachment_count > 0 {
        extras.push(format!("📎 {}", record.attachment_count));
    }
    let badge = record.badge();
    if badge != Badge::Plain {
        extras.push(format!("[{}]", badge.as_str()));
    }
    [
        if highlighted { NEW_MARKER.to_string() } else { String::new() },
        format!("#{}", record.id),
        counterpart,
        record.display_subject().to_string(),
        date::relative(record.timestamp, now),
        extras.join(" "),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::render_lines;
    use chrono::{Duration, TimeZone};
    use mailguard_core::{EmailPage, Identity, ProcessingStatus, ViewState};
    use std::time::Instant;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).single().unwrap_or_default()
    }

    fn reconciler(view: MailView) -> Reconciler {
        let identity = Identity::new("a@x.com").ok();
        Reconciler::new(
            ViewState::new(view, 100),
            identity,
            std::time::Duration::from_secs(3),
        )
    }

    fn page(emails: Vec<EmailRecord>) -> EmailPage {
        EmailPage {
            total: emails.len() as u64,
            emails,
            page: 1,
            per_page: 100,
            pages: 1,
        }
    }

    fn lines(reconciler: &Reconciler) -> Vec<String> {
        render_lines(110, 8, |frame| {
            let area = frame.area();
            draw(frame, area, reconciler, now(), &mut TableState::default());
        })
    }

    #[test]
    fn test_empty_states() {
        let mut inbox = reconciler(MailView::Inbox);
        let (ticket, _) = inbox.begin_load();
        assert!(lines(&inbox)[1].starts_with("│Loading emails...  "));

        inbox.apply_snapshot(ticket, page(Vec::new()));
        let out = lines(&inbox);
        assert!(out[0].starts_with("┌Inbox - a@x.com (0 emails)─"));
        assert!(out[1].starts_with("│No emails in inbox  "));
    }

    #[test]
    fn test_rows_and_highlight() {
        let mut inbox = reconciler(MailView::Inbox);
        let (ticket, _) = inbox.begin_load();
        let mut old = EmailRecord::new(1, "b@y.com", vec!["a@x.com".into()])
            .with_subject("Quarterly report");
        old.timestamp = Some(now() - Duration::minutes(5));
        old.attachment_count = 2;
        inbox.apply_snapshot(ticket, page(vec![old]));

        let mut pushed = EmailRecord::new(2, "c@z.com", vec!["a@x.com".into()])
            .with_status(ProcessingStatus::Flagged);
        pushed.timestamp = Some(now());
        inbox.merge_push(pushed, Instant::now());

        let out = lines(&inbox);
        assert!(out[0].starts_with("┌Inbox - a@x.com (2 emails)─"));
        assert!(out[1].starts_with("│* #2"));
        assert!(out[1].contains("(no subject)"));
        assert!(out[1].contains("just now"));
        assert!(out[1].contains("[flagged]"));
        assert!(out[2].starts_with("│  #1"));
        assert!(out[2].contains("Quarterly report"));
        assert!(out[2].contains("5 mins ago"));
        assert!(out[2].contains("📎"));
    }

    #[test]
    fn test_sent_row_shows_recipient() {
        let record = EmailRecord::new(3, "a@x.com", vec!["d@w.com".into(), "e@v.com".into()]);
        let row = cells(&record, MailView::Sent, false, now());
        assert_eq!(row[2], "To: d@w.com");

        let nobody = EmailRecord::new(4, "a@x.com", Vec::new());
        assert_eq!(cells(&nobody, MailView::Sent, false, now())[2], "To: Unknown");
    }
}
