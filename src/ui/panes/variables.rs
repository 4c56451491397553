//! Variables pane rendering
//!
//! Top section: the current event's locals sorted by name, prefixed `>` when
//! the name changed at this step and `@` when watched. Bottom section: every
//! watched name with its current value and how many times it has changed
//! over the whole trace.

use crate::trace::{ellipsize, loader::Changes, watch_history, Event};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    event: &Event,
    changes: &Changes,
    watches: &[String],
    events: &[Event],
) {
    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DEFAULT_THEME.border));

    let content_width = area.width.saturating_sub(2) as usize;
    let mut rows: Vec<Line> = Vec::new();

    if event.vars.is_empty() {
        rows.push(Line::from(Span::styled(
            "(no locals)",
            Style::default().fg(DEFAULT_THEME.dim),
        )));
    }

    for (name, value) in &event.vars {
        let watched = watches.iter().any(|w| w == name);
        let (prefix, style) = if changes.touches(name) {
            (
                ">",
                Style::default()
                    .fg(DEFAULT_THEME.changed)
                    .add_modifier(Modifier::BOLD),
            )
        } else if watched {
            ("@", Style::default().fg(DEFAULT_THEME.watched))
        } else {
            (" ", Style::default().fg(DEFAULT_THEME.fg))
        };

        let text = format!("{} {} = {}", prefix, name, value);
        rows.push(Line::from(Span::styled(
            ellipsize(&text, content_width),
            style,
        )));
    }

    if !changes.removed.is_empty() {
        let text = format!("- gone: {}", changes.removed.join(", "));
        rows.push(Line::from(Span::styled(
            ellipsize(&text, content_width),
            Style::default().fg(DEFAULT_THEME.removed),
        )));
    }

    if !watches.is_empty() {
        rows.push(Line::from(""));
        rows.push(Line::from(Span::styled(
            "Watches",
            Style::default()
                .fg(DEFAULT_THEME.watched)
                .add_modifier(Modifier::BOLD),
        )));
        for name in watches {
            let history = watch_history(events, name);
            let value = event
                .vars
                .get(name)
                .map(String::as_str)
                .unwrap_or("—");
            let text = format!("@ {} = {} ({} changes)", name, value, history.len());
            rows.push(Line::from(Span::styled(
                ellipsize(&text, content_width),
                Style::default().fg(DEFAULT_THEME.watched),
            )));
        }
    }

    frame.render_widget(Paragraph::new(rows).block(block), area);
}
