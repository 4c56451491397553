//! Header and footer rendering

use crate::trace::{ellipsize, Event, MODULE_SCOPE};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Two rows: title + step position, then location / scope / depth.
pub fn render_header(frame: &mut Frame, area: Rect, event: &Event, pos: usize, total: usize) {
    let width = area.width as usize;

    let title = " retrace";
    let step = format!("Step {} / {} ", pos, total.saturating_sub(1));
    let pad = width
        .saturating_sub(title.chars().count())
        .saturating_sub(step.chars().count());
    let row1 = Line::from(vec![
        Span::styled(
            title,
            Style::default()
                .fg(DEFAULT_THEME.primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(pad)),
        Span::styled(step, Style::default().fg(DEFAULT_THEME.secondary)),
    ]);

    let mut location = format!(" {}:{}", event.file, event.line);
    if event.scope != MODULE_SCOPE {
        location.push_str(&format!("  scope: {}", event.scope));
    }
    if event.depth > 0 {
        location.push_str(&format!("  depth: {}", event.depth));
    }
    let row2 = Line::from(Span::styled(
        ellipsize(&location, width),
        Style::default().fg(DEFAULT_THEME.dim),
    ));

    frame.render_widget(Paragraph::new(vec![row1, row2]), area);
}

/// Three rows: key hints, prompt-or-status line, current description.
pub fn render_footer(
    frame: &mut Frame,
    area: Rect,
    hints: &str,
    middle: &str,
    middle_is_error: bool,
    desc: &str,
) {
    let width = area.width as usize;

    let hint_line = Line::from(Span::styled(
        ellipsize(hints, width),
        Style::default().fg(DEFAULT_THEME.dim),
    ));

    let middle_style = if middle_is_error {
        Style::default().fg(DEFAULT_THEME.error)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    };
    let middle_line = Line::from(Span::styled(ellipsize(middle, width), middle_style));

    let desc_line = Line::from(Span::styled(
        ellipsize(desc, width),
        Style::default().fg(DEFAULT_THEME.secondary),
    ));

    frame.render_widget(
        Paragraph::new(vec![hint_line, middle_line, desc_line]),
        area,
    );
}
