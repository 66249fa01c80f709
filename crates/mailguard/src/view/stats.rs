//! Stats grid.

use mailguard_core::Stats;
use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph, Row, Table},
};

const LABELS: [&str; 5] = [
    "Total Emails",
    "Flagged",
    "Blocked",
    "Quarantined",
    "Avg Processing (ms)",
];

fn values(stats: &Stats) -> [String; 5] {
    [
        stats.total.to_string(),
        stats.flagged.to_string(),
        stats.blocked.to_string(),
        stats.quarantined.to_string(),
        format!("{:.2}", stats.avg_processing_time_ms),
    ]
}

/// Column width fitting both the label and the value.
fn width(label: &str, value: &str) -> usize {
    label.len().max(value.len())
}

/// Two-row grid for printing: labels, then values.
pub fn grid(stats: &Stats) -> String {
    let mut labels = String::new();
    let mut cells = String::new();
    for (label, value) in LABELS.iter().zip(&values(stats)) {
        let width = width(label, value) + 3;
        labels.push_str(&format!("{label:<width$}"));
        cells.push_str(&format!("{value:<width$}"));
    }
    format!("{}\n{}\n", labels.trim_end(), cells.trim_end())
}

/// Dashboard header with the grid, or a loading line until stats arrive.
pub fn draw(frame: &mut Frame, area: Rect, stats: Option<&Stats>) {
    let block = Block::default().borders(Borders::ALL).title("MailGuard Dashboard");
    let Some(stats) = stats else {
        frame.render_widget(Paragraph::new("Loading stats...").block(block), area);
        return;
    };
    let values = values(stats);
    let widths = LABELS.iter().zip(&values).map(|(label, value)| {
        Constraint::Length(u16::try_from(width(label, value)).unwrap_or(u16::MAX))
    });
    let table = Table::new([Row::new(values.clone())], widths)
        .header(Row::new(LABELS).style(Style::default().add_modifier(Modifier::BOLD)))
        .column_spacing(3)
        .block(block);
    frame.render_widget(table, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::render_lines;

    fn sample() -> Stats {
        Stats {
            total: 12,
            flagged: 3,
            blocked: 1,
            quarantined: 2,
            avg_processing_time_ms: 4.25,
        }
    }

    #[test]
    fn test_grid() {
        let out = grid(&sample());
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("Total Emails   Flagged   Blocked   Quarantined   Avg Processing (ms)")
        );
        assert_eq!(
            lines.next(),
            Some("12             3         1         2             4.25")
        );
    }

    #[test]
    fn test_empty_stats() {
        assert!(
            grid(&Stats::default())
                .ends_with("\n0              0         0         0             0.00\n")
        );
    }

    #[test]
    fn test_draw_matches_grid_columns() {
        let stats = sample();
        let lines = render_lines(100, 4, |frame| {
            let area = frame.area();
            draw(frame, area, Some(&stats));
        });
        assert!(lines[0].starts_with("┌MailGuard Dashboard─"));
        assert!(lines[1].starts_with(
            "│Total Emails   Flagged   Blocked   Quarantined   Avg Processing (ms)"
        ));
        assert!(lines[2].starts_with("│12             3         1         2             4.25"));
    }

    #[test]
    fn test_draw_loading() {
        let lines = render_lines(40, 4, |frame| {
            let area = frame.area();
            draw(frame, area, None);
        });
        assert!(lines[1].starts_with("│Loading stats..."));
    }
}
