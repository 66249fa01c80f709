//! Screen rendering.
//!
//! The live session draws ratatui widgets from borrowed state; nothing here
//! mutates the session. One-shot commands use the plain-text renderers in
//! [`compose`], [`message_view`] and [`stats`].

pub mod compose;
pub mod date;
pub mod message_list;
pub mod message_view;
pub mod stats;
pub mod table;

use chrono::{DateTime, Utc};
use mailguard_core::{EmailRecord, Notice, NoticeLevel, Reconciler, Stats};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, TableState},
};

const MAIL_HELP: &str =
    "↑/↓ select | Enter open | Esc back | Tab inbox/sent | i identity | d download | r refresh | : command | q quit";
const DASHBOARD_HELP: &str =
    "↑/↓ select | Enter open | Esc back | n/p page | f flagged | s status | d download | r refresh | q quit";

/// Everything one frame shows.
pub struct Screen<'a> {
    pub reconciler: &'a Reconciler,
    pub stats: Option<&'a Stats>,
    pub detail: Option<&'a EmailRecord>,
    pub notices: Vec<&'a Notice>,
    /// Prompt text while the `:` prompt is open.
    pub prompt: Option<&'a str>,
    pub now: DateTime<Utc>,
}

/// Draws the whole screen.
pub fn draw(frame: &mut Frame, screen: &Screen<'_>, selected: &mut TableState) {
    let notice_rows = if screen.notices.is_empty() {
        0
    } else {
        u16::try_from(screen.notices.len()).unwrap_or(u16::MAX).saturating_add(2)
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(notice_rows),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let view = screen.reconciler.view_state().view();
    if let Some(detail) = screen.detail {
        message_view::draw(frame, chunks[0], detail);
    } else if view.is_mail_view() {
        message_list::draw(frame, chunks[0], screen.reconciler, screen.now, selected);
    } else {
        let dashboard = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(chunks[0]);
        stats::draw(frame, dashboard[0], screen.stats);
        table::draw(frame, dashboard[1], screen.reconciler, selected);
    }

    if notice_rows > 0 {
        draw_notices(frame, chunks[1], &screen.notices);
    }

    let status = match screen.prompt {
        Some(text) => Paragraph::new(format!(":{text}_")),
        None => Paragraph::new(if view.is_mail_view() {
            MAIL_HELP
        } else {
            DASHBOARD_HELP
        })
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(status, chunks[2]);
}

fn draw_notices(frame: &mut Frame, area: Rect, notices: &[&Notice]) {
    let items: Vec<ListItem> = notices
        .iter()
        .map(|notice| {
            let color = match notice.level {
                NoticeLevel::Info => Color::Cyan,
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            ListItem::new(Line::from(Span::styled(
                notice.to_string(),
                Style::default().fg(color),
            )))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Notices"));
    frame.render_widget(list, area);
}

/// Renders into an in-memory terminal and returns its rows, right-trimmed.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub fn render_lines(width: u16, height: u16, render: impl FnOnce(&mut Frame)) -> Vec<String> {
    use ratatui::{Terminal, backend::TestBackend, buffer::Cell};

    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(render).unwrap();
    terminal
        .backend()
        .buffer()
        .content
        .chunks(usize::from(width))
        .map(|row| row.iter().map(Cell::symbol).collect::<String>().trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailguard_core::{MailView, ViewState};
    use std::time::Duration;

    #[test]
    fn test_notices_and_help_line() {
        let reconciler = Reconciler::new(
            ViewState::new(MailView::Admin, 50),
            None,
            Duration::from_secs(3),
        );
        let ok = Notice::success("Email sent successfully!");
        let err = Notice::error("Error loading emails: timed out");
        let screen = Screen {
            reconciler: &reconciler,
            stats: None,
            detail: None,
            notices: vec![&ok, &err],
            prompt: None,
            now: Utc::now(),
        };
        let lines = render_lines(120, 24, |frame| {
            draw(frame, &screen, &mut TableState::default());
        });
        let text = lines.join("\n");
        assert!(text.contains("Loading stats..."));
        assert!(text.contains("│[ok] Email sent successfully!"));
        assert!(text.contains("│[error] Error loading emails: timed out"));
        assert!(lines[23].starts_with("↑/↓ select | Enter open | Esc back | n/p page"));
    }

    #[test]
    fn test_prompt_replaces_help_line() {
        let reconciler = Reconciler::new(
            ViewState::new(MailView::Inbox, 50),
            None,
            Duration::from_secs(3),
        );
        let screen = Screen {
            reconciler: &reconciler,
            stats: None,
            detail: None,
            notices: Vec::new(),
            prompt: Some("i c@z"),
            now: Utc::now(),
        };
        let lines = render_lines(80, 10, |frame| {
            draw(frame, &screen, &mut TableState::default());
        });
        assert_eq!(lines[9], ":i c@z_");
    }
}
