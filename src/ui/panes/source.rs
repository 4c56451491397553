//! Source pane rendering
//!
//! Shows a scrollable window of the current event's source file with the
//! current line highlighted across the pane width and breakpoint lines
//! marked in the gutter. The window auto-scrolls so the current line stays
//! at least [`SCROLL_MARGIN`] rows away from the visible edges.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Rows the current line keeps clear of the window edges.
pub const SCROLL_MARGIN: usize = 3;

pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    lines: Option<&[String]>,
    current_line: usize,
    breakpoint_lines: &[u32],
    scroll: &mut usize,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DEFAULT_THEME.border));

    let Some(lines) = lines else {
        let placeholder = Paragraph::new(Line::from(Span::styled(
            "(source not available)",
            Style::default().fg(DEFAULT_THEME.dim),
        )))
        .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Keep the current line inside the margin
    if current_line > 0 && current_line <= total_lines {
        let current_idx = current_line - 1;
        if current_idx < *scroll + SCROLL_MARGIN {
            *scroll = current_idx.saturating_sub(SCROLL_MARGIN);
        } else if current_idx + SCROLL_MARGIN >= *scroll + visible_height {
            *scroll = current_idx + SCROLL_MARGIN + 1 - visible_height;
        }
    }
    *scroll = (*scroll).min(total_lines.saturating_sub(visible_height));

    let content_width = area.width.saturating_sub(2) as usize;

    let visible: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, text)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;
            let has_breakpoint = breakpoint_lines.contains(&(line_num as u32));

            let gutter_mark = if has_breakpoint { "●" } else { " " };
            let gutter = format!("{}{:4} ", gutter_mark, line_num);

            let gutter_style = if has_breakpoint {
                Style::default().fg(DEFAULT_THEME.marker)
            } else if is_current {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.dim)
            };

            if is_current {
                // Pad to the pane width so the highlight covers the row
                let used = gutter.chars().count() + text.chars().count();
                let padded = format!("{}{}", text, " ".repeat(content_width.saturating_sub(used)));
                let highlight = Style::default().bg(DEFAULT_THEME.current_line_bg);
                Line::from(vec![
                    Span::styled(gutter, gutter_style.patch(highlight)),
                    Span::styled(padded, Style::default().fg(DEFAULT_THEME.fg).patch(highlight)),
                ])
            } else {
                Line::from(vec![
                    Span::styled(gutter, gutter_style),
                    Span::styled(text.clone(), Style::default().fg(DEFAULT_THEME.fg)),
                ])
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(visible).block(block), area);
}
