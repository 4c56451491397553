//! Modal overlays: help, timeline, and inspect
//!
//! Each overlay clears a centered region and draws a bordered box over the
//! main screen; any key dismisses it.

use crate::trace::{ellipsize, Event, TraceStats};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Centered sub-rectangle taking the given percentages of the frame.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn overlay_block(title: &str) -> Block<'_> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DEFAULT_THEME.primary))
}

pub fn render_help(frame: &mut Frame) {
    let area = centered_rect(70, 80, frame.area());

    let keys = [
        ("←/→", "step backward / forward"),
        ("PgUp/PgDn", "move 10 steps"),
        ("Home/End", "first / last step"),
        ("g", "jump to a step number"),
        ("c / r", "continue / reverse to breakpoint"),
        ("b", "set or clear a breakpoint (file:line)"),
        ("/ or f", "search desc, file, scope, then vars"),
        ("n / p", "next / previous search match"),
        ("w", "toggle a watch (empty input lists them)"),
        ("d", "show what changed at this step"),
        ("v", "inspect a variable's history"),
        ("t", "timeline overview"),
        ("h", "this help"),
        ("q", "quit"),
    ];

    let mut lines = vec![Line::from("")];
    for (key, what) in keys {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:>10}  ", key),
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(what, Style::default().fg(DEFAULT_THEME.fg)),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  any key to close",
        Style::default().fg(DEFAULT_THEME.dim),
    )));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(overlay_block("Help")), area);
}

pub fn render_timeline(frame: &mut Frame, stats: &TraceStats, pos: usize, total: usize) {
    let area = centered_rect(70, 70, frame.area());
    let inner_width = area.width.saturating_sub(4).max(2) as usize;

    // Position bar with a marker at the normalised current step
    let marker = if total > 1 {
        pos * (inner_width - 1) / (total - 1)
    } else {
        0
    };
    let bar: String = (0..inner_width)
        .map(|i| if i == marker { '█' } else { '─' })
        .collect();

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}", bar),
            Style::default().fg(DEFAULT_THEME.primary),
        )),
        Line::from(Span::styled(
            format!(
                " step {} of {}  ·  max depth {}  ·  {:.3}s",
                pos,
                total.saturating_sub(1),
                stats.max_depth,
                stats.duration
            ),
            Style::default().fg(DEFAULT_THEME.fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Files ({})", stats.files.len()),
            Style::default()
                .fg(DEFAULT_THEME.secondary)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    for file in &stats.files {
        lines.push(Line::from(Span::styled(
            ellipsize(&format!("   {}", file), inner_width + 2),
            Style::default().fg(DEFAULT_THEME.fg),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" Scopes ({})", stats.scopes.len()),
        Style::default()
            .fg(DEFAULT_THEME.secondary)
            .add_modifier(Modifier::BOLD),
    )));
    for scope in &stats.scopes {
        lines.push(Line::from(Span::styled(
            ellipsize(&format!("   {}", scope), inner_width + 2),
            Style::default().fg(DEFAULT_THEME.fg),
        )));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(overlay_block("Timeline")), area);
}

pub fn render_inspect(
    frame: &mut Frame,
    name: &str,
    event: &Event,
    history: &[(usize, String)],
    pos: usize,
) {
    let area = centered_rect(70, 70, frame.area());

    let current = event
        .vars
        .get(name)
        .map(String::as_str)
        .unwrap_or("(not set at this step)");

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(
                format!(" {} = ", name),
                Style::default()
                    .fg(DEFAULT_THEME.watched)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(current, Style::default().fg(DEFAULT_THEME.fg)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!(" History ({} changes)", history.len()),
            Style::default()
                .fg(DEFAULT_THEME.secondary)
                .add_modifier(Modifier::BOLD),
        )),
    ];

    for (step, value) in history {
        let is_here = *step == pos;
        let prefix = if is_here { ">" } else { " " };
        let style = if is_here {
            Style::default()
                .fg(DEFAULT_THEME.secondary)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DEFAULT_THEME.fg)
        };
        lines.push(Line::from(Span::styled(
            format!(" {} [{}] {}", prefix, step, value),
            style,
        )));
    }
    if history.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (never recorded)",
            Style::default().fg(DEFAULT_THEME.dim),
        )));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(overlay_block("Inspect")),
        area,
    );
}
