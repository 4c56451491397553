use ratatui::style::Color;

pub struct Theme {
    pub fg: Color,
    pub primary: Color,   // Blue
    pub secondary: Color, // Orange
    pub dim: Color,       // Grey
    pub success: Color,   // Green
    pub error: Color,     // Red
    pub border: Color,
    pub current_line_bg: Color,
    pub added: Color,   // Changed-set '+' entries
    pub changed: Color, // Changed-set '~' entries
    pub removed: Color, // Changed-set '-' entries
    pub watched: Color, // '@' watch markers
    pub marker: Color,  // Breakpoint gutter markers
}

pub const DEFAULT_THEME: Theme = Theme {
    fg: Color::Rgb(205, 214, 244),
    primary: Color::Rgb(137, 180, 250),   // Blue
    secondary: Color::Rgb(250, 179, 135), // Orange
    dim: Color::Rgb(108, 112, 134),
    success: Color::Rgb(166, 227, 161),
    error: Color::Rgb(243, 139, 168),
    border: Color::Rgb(108, 112, 134),
    current_line_bg: Color::Rgb(50, 50, 70), // Slightly lighter BG for current line
    added: Color::Rgb(166, 227, 161),        // Green for new names
    changed: Color::Rgb(249, 226, 175),      // Yellow for revalued names
    removed: Color::Rgb(243, 139, 168),      // Red for dropped names
    watched: Color::Rgb(148, 226, 213),      // Teal for watches
    marker: Color::Rgb(243, 139, 168),       // Red breakpoint dots
};
