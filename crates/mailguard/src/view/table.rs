//! Admin dashboard table.

use mailguard_core::{EmailRecord, Pagination, PolicyApplied, Reconciler, ViewState};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
};

use super::date;

const COLUMNS: [(&str, Constraint); 10] = [
    ("", Constraint::Length(1)),
    ("Timestamp", Constraint::Length(19)),
    ("From", Constraint::Length(22)),
    ("To", Constraint::Length(24)),
    ("Subject", Constraint::Min(16)),
    ("Status", Constraint::Length(11)),
    ("Policy", Constraint::Length(10)),
    ("Detections", Constraint::Length(18)),
    ("Att", Constraint::Length(3)),
    ("Time (ms)", Constraint::Length(9)),
];

/// Filter line, table and pagination footer.
pub fn draw(frame: &mut Frame, area: Rect, reconciler: &Reconciler, selected: &mut TableState) {
    let state = reconciler.view_state();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(Paragraph::new(filters(state)), chunks[0]);
    frame.render_widget(Paragraph::new(footer(&state.pagination())), chunks[2]);

    let block = Block::default().borders(Borders::ALL).title("Emails");
    let emails = reconciler.emails();
    if emails.is_empty() {
        let text = if reconciler.is_loading() {
            "Loading emails..."
        } else {
            "No emails found"
        };
        frame.render_widget(Paragraph::new(text).block(block), chunks[1]);
        return;
    }

    let header = Row::new(COLUMNS.map(|(title, _)| title))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = emails.iter().map(|record| {
        let highlighted = reconciler.is_highlighted(record.id);
        let style = if highlighted {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Row::new(cells(record, highlighted)).style(style)
    });
    let table = Table::new(rows, COLUMNS.map(|(_, width)| width))
        .header(header)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    frame.render_stateful_widget(table, chunks[1], selected);
}

/// Active filters.
pub fn filters(state: &ViewState) -> String {
    let flagged = if state.flagged_only() { "[x]" } else { "[ ]" };
    let status = state.status_filter().map_or("All", |s| s.as_str());
    format!("Flagged only {flagged}   Status: {status}")
}

/// Cells of one table row, with `-` for missing values.
pub fn cells(record: &EmailRecord, highlighted: bool) -> [String; 10] {
    let to = if record.recipients.is_empty() {
        "-".to_string()
    } else {
        let mut to = record
            .recipients
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if record.recipients.len() > 2 {
            to.push_str("...");
        }
        to
    };
    let detections = record.unique_detection_types();
    let detections = if detections.is_empty() {
        "-".to_string()
    } else {
        detections.join(", ")
    };
    let policy = match record.policy_applied {
        PolicyApplied::None => "-",
        other => other.as_str(),
    };
    let attachments = if record.attachment_count > 0 {
        record.attachment_count.to_string()
    } else {
        "-".to_string()
    };
    let time = record
        .processing_time_ms
        .map_or_else(|| "-".to_string(), |ms| format!("{ms:.2}"));

    [
        if highlighted { "*" } else { "" }.to_string(),
        date::short(record.timestamp),
        record.sender.clone(),
        to,
        record.display_subject().to_string(),
        record.status.as_str().to_string(),
        policy.to_string(),
        detections,
        attachments,
        time,
    ]
}

/// "Page X of Y" with the navigation keys that currently apply.
pub fn footer(pagination: &Pagination) -> String {
    let mut out = format!("Page {} of {}", pagination.page(), pagination.total_pages());
    if pagination.has_prev() {
        out.push_str("   [p] Previous");
    }
    if pagination.has_next() {
        out.push_str("   [n] Next");
    }
    out
}
