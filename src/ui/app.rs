//! Replay application state and keyboard loop
//!
//! The TUI is a single-threaded cooperative loop: render one frame, block
//! for one key, dispatch, repeat. All semantics (navigation, search,
//! breakpoints, watches) live on plain methods over the loaded event
//! vector; nothing here touches the terminal except [`App::run`].
//!
//! No user action may crash the process: every invalid input becomes a
//! transient message in the footer.

use crate::trace::{changed_names, stats, watch_history, Event, TraceStats};
use crate::ui::panes;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use rustc_hash::FxHashMap;
use std::fs;
use std::io;

/// Fixed width of the right-hand variables pane.
pub const VARS_PANE_WIDTH: u16 = 35;

/// Narrowest source pane still worth drawing.
pub const MIN_SOURCE_WIDTH: u16 = 25;

/// Below this total width the application refuses to start.
pub const MIN_WIDTH: u16 = MIN_SOURCE_WIDTH + VARS_PANE_WIDTH;

/// Steps moved by PageUp / PageDown.
pub const PAGE_STEP: usize = 10;

/// Which modal prompt is collecting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Search,
    Jump,
    Break,
    Watch,
    Inspect,
}

impl Prompt {
    fn label(self) -> &'static str {
        match self {
            Prompt::Search => "search",
            Prompt::Jump => "jump to step",
            Prompt::Break => "breakpoint (file:line)",
            Prompt::Watch => "watch",
            Prompt::Inspect => "inspect",
        }
    }
}

/// Which full-screen overlay is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    Timeline,
    Inspect(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Prompt(Prompt),
    Overlay(Overlay),
}

/// A (file-suffix, line) pair. Matches events whose `file` ends with the
/// suffix, so breakpoints can be set with bare filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub file: String,
    pub line: u32,
}

impl Breakpoint {
    /// Parse a `file:line` spec.
    pub fn parse(spec: &str) -> Option<Self> {
        let (file, line) = spec.rsplit_once(':')?;
        if file.is_empty() {
            return None;
        }
        let line = line.trim().parse().ok()?;
        Some(Self {
            file: file.trim().to_string(),
            line,
        })
    }

    pub fn matches(&self, event: &Event) -> bool {
        event.line == self.line && event.file.ends_with(&self.file)
    }
}

/// The replay application.
pub struct App {
    pub events: Vec<Event>,
    pub stats: TraceStats,
    pub pos: usize,
    pub mode: Mode,
    input: String,
    status: String,
    status_is_error: bool,
    pub breakpoints: Vec<Breakpoint>,
    pub watches: Vec<String>,
    search_results: Vec<usize>,
    search_cursor: usize,
    last_query: String,
    source_cache: FxHashMap<String, Option<Vec<String>>>,
    source_scroll: usize,
    should_quit: bool,
}

impl App {
    /// Create an app over a non-empty, loaded trace.
    pub fn new(events: Vec<Event>) -> Self {
        let stats = stats(&events);
        App {
            events,
            stats,
            pos: 0,
            mode: Mode::Normal,
            input: String::new(),
            status: String::from("Ready"),
            status_is_error: false,
            breakpoints: Vec::new(),
            watches: Vec::new(),
            search_results: Vec::new(),
            search_cursor: 0,
            last_query: String::new(),
            source_cache: FxHashMap::default(),
            source_scroll: 0,
            should_quit: false,
        }
    }

    pub fn current(&self) -> &Event {
        &self.events[self.pos]
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_is_error = false;
    }

    fn error(&mut self, message: impl Into<String>) {
        self.status = message.into();
        self.status_is_error = true;
    }

    // --- navigation ---

    pub fn step_forward(&mut self) {
        if self.pos + 1 < self.events.len() {
            self.pos += 1;
        }
    }

    pub fn step_backward(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn page_forward(&mut self) {
        self.pos = (self.pos + PAGE_STEP).min(self.events.len() - 1);
    }

    pub fn page_backward(&mut self) {
        self.pos = self.pos.saturating_sub(PAGE_STEP);
    }

    pub fn home(&mut self) {
        self.pos = 0;
    }

    pub fn end(&mut self) {
        self.pos = self.events.len() - 1;
    }

    pub fn jump(&mut self, step: usize) {
        if step < self.events.len() {
            self.pos = step;
            self.info(format!("Jumped to step {}", step));
        } else {
            self.error(format!(
                "Step {} out of range (0..{})",
                step,
                self.events.len() - 1
            ));
        }
    }

    /// Scan forward from `pos + 1` for the first breakpoint hit.
    pub fn continue_to_breakpoint(&mut self) {
        for step in self.pos + 1..self.events.len() {
            if self.hits_breakpoint(step) {
                self.pos = step;
                self.info(format!("Breakpoint hit at step {}", step));
                return;
            }
        }
        self.error("No breakpoint hit");
    }

    /// Scan backward from `pos - 1` down to step 0.
    pub fn reverse_to_breakpoint(&mut self) {
        for step in (0..self.pos).rev() {
            if self.hits_breakpoint(step) {
                self.pos = step;
                self.info(format!("Breakpoint hit at step {}", step));
                return;
            }
        }
        self.error("No breakpoint hit");
    }

    fn hits_breakpoint(&self, step: usize) -> bool {
        let event = &self.events[step];
        self.breakpoints.iter().any(|bp| bp.matches(event))
    }

    // --- breakpoints and watches ---

    /// Set a breakpoint from a `file:line` spec; an identical existing
    /// breakpoint is removed instead.
    pub fn toggle_breakpoint(&mut self, spec: &str) {
        let Some(bp) = Breakpoint::parse(spec) else {
            self.error(format!("Invalid breakpoint '{}' (use file:line)", spec));
            return;
        };
        if let Some(idx) = self.breakpoints.iter().position(|b| *b == bp) {
            self.breakpoints.remove(idx);
            self.info(format!("Breakpoint removed: {}:{}", bp.file, bp.line));
        } else {
            self.info(format!("Breakpoint set: {}:{}", bp.file, bp.line));
            self.breakpoints.push(bp);
        }
    }

    pub fn toggle_watch(&mut self, name: &str) {
        if let Some(idx) = self.watches.iter().position(|w| w == name) {
            self.watches.remove(idx);
            self.info(format!("Unwatched {}", name));
        } else {
            self.watches.push(name.to_string());
            self.info(format!("Watching {}", name));
        }
    }

    fn list_watches(&mut self) {
        if self.watches.is_empty() {
            self.info("No watches");
        } else {
            self.info(format!("Watches: {}", self.watches.join(", ")));
        }
    }

    // --- search ---

    /// Case-insensitive substring search over desc, file, and scope; when
    /// nothing matches those, fall back to variable names and values. The
    /// cursor lands on the first result at or after the current position.
    pub fn run_search(&mut self, query: &str) {
        let needle = query.to_lowercase();

        let mut results: Vec<usize> = self
            .events
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.desc.to_lowercase().contains(&needle)
                    || e.file.to_lowercase().contains(&needle)
                    || e.scope.to_lowercase().contains(&needle)
            })
            .map(|(step, _)| step)
            .collect();

        if results.is_empty() {
            results = self
                .events
                .iter()
                .enumerate()
                .filter(|(_, e)| {
                    e.vars.iter().any(|(name, value)| {
                        name.to_lowercase().contains(&needle)
                            || value.to_lowercase().contains(&needle)
                    })
                })
                .map(|(step, _)| step)
                .collect();
        }

        if results.is_empty() {
            self.search_results.clear();
            self.last_query = query.to_string();
            self.error(format!("No match for '{}'", query));
            return;
        }

        self.search_cursor = results
            .iter()
            .position(|&step| step >= self.pos)
            .unwrap_or(0);
        self.pos = results[self.search_cursor];
        self.info(format!(
            "{} matches for '{}' ({} of {})",
            results.len(),
            query,
            self.search_cursor + 1,
            results.len()
        ));
        self.search_results = results;
        self.last_query = query.to_string();
    }

    pub fn search_next(&mut self) {
        if self.search_results.is_empty() {
            self.error("No search results");
            return;
        }
        self.search_cursor = (self.search_cursor + 1) % self.search_results.len();
        self.pos = self.search_results[self.search_cursor];
        self.info(format!(
            "Match {} of {} for '{}'",
            self.search_cursor + 1,
            self.search_results.len(),
            self.last_query
        ));
    }

    pub fn search_prev(&mut self) {
        if self.search_results.is_empty() {
            self.error("No search results");
            return;
        }
        self.search_cursor =
            (self.search_cursor + self.search_results.len() - 1) % self.search_results.len();
        self.pos = self.search_results[self.search_cursor];
        self.info(format!(
            "Match {} of {} for '{}'",
            self.search_cursor + 1,
            self.search_results.len(),
            self.last_query
        ));
    }

    pub fn search_results(&self) -> &[usize] {
        &self.search_results
    }

    // --- diff ---

    pub fn show_diff(&mut self) {
        let changes = changed_names(&self.events, self.pos);
        if changes.is_empty() {
            self.info("No changes");
        } else {
            let summary = changes.summary();
            self.info(summary);
        }
    }

    // --- key dispatch ---

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.mode.clone() {
            Mode::Normal => self.handle_normal_key(key.code),
            Mode::Prompt(prompt) => self.handle_prompt_key(prompt, key.code),
            Mode::Overlay(_) => {
                self.mode = Mode::Normal;
            }
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Left => self.step_backward(),
            KeyCode::Right => self.step_forward(),
            KeyCode::PageUp => self.page_backward(),
            KeyCode::PageDown => self.page_forward(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Char('c') => self.continue_to_breakpoint(),
            KeyCode::Char('r') => self.reverse_to_breakpoint(),
            KeyCode::Char('n') => self.search_next(),
            KeyCode::Char('p') => self.search_prev(),
            KeyCode::Char('d') => self.show_diff(),
            KeyCode::Char('g') => self.open_prompt(Prompt::Jump),
            KeyCode::Char('/') | KeyCode::Char('f') => self.open_prompt(Prompt::Search),
            KeyCode::Char('b') => self.open_prompt(Prompt::Break),
            KeyCode::Char('w') => self.open_prompt(Prompt::Watch),
            KeyCode::Char('v') => self.open_prompt(Prompt::Inspect),
            KeyCode::Char('h') => self.mode = Mode::Overlay(Overlay::Help),
            KeyCode::Char('t') => self.mode = Mode::Overlay(Overlay::Timeline),
            _ => {}
        }
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        self.input.clear();
        self.mode = Mode::Prompt(prompt);
    }

    fn handle_prompt_key(&mut self, prompt: Prompt, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.input.clear();
                self.mode = Mode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.input);
                self.mode = Mode::Normal;
                self.commit_prompt(prompt, input.trim());
            }
            KeyCode::Char(c) => {
                let acceptable = match prompt {
                    Prompt::Jump => c.is_ascii_digit(),
                    _ => c.is_ascii() && !c.is_control(),
                };
                if acceptable {
                    self.input.push(c);
                }
            }
            _ => {}
        }
    }

    fn commit_prompt(&mut self, prompt: Prompt, input: &str) {
        match prompt {
            Prompt::Search => {
                if !input.is_empty() {
                    self.run_search(input);
                }
            }
            Prompt::Jump => match input.parse::<usize>() {
                Ok(step) => self.jump(step),
                Err(_) => self.error("Not a step number"),
            },
            Prompt::Break => {
                if !input.is_empty() {
                    self.toggle_breakpoint(input);
                }
            }
            Prompt::Watch => {
                if input.is_empty() {
                    self.list_watches();
                } else {
                    self.toggle_watch(input);
                }
            }
            Prompt::Inspect => {
                let name = if input.is_empty() {
                    self.watches.first().cloned()
                } else {
                    Some(input.to_string())
                };
                match name {
                    Some(name) => self.mode = Mode::Overlay(Overlay::Inspect(name)),
                    None => self.error("Nothing to inspect (name a variable or set a watch)"),
                }
            }
        }
    }

    // --- event loop and rendering ---

    /// Run the draw/read/dispatch loop until quit or end of input.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            // Blocking read; EOF or a closed input stream quits cleanly
            match event::read() {
                Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    self.handle_key(key);
                }
                Ok(_) => {} // resize and release events fall through to redraw
                Err(_) => break,
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(area);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(MIN_SOURCE_WIDTH), Constraint::Length(VARS_PANE_WIDTH)])
            .split(rows[1]);

        let changes = changed_names(&self.events, self.pos);
        let event = self.events[self.pos].clone();

        panes::render_header(frame, rows[0], &event, self.pos, self.events.len());

        let breakpoint_lines: Vec<u32> = self
            .breakpoints
            .iter()
            .filter(|bp| event.file.ends_with(&bp.file))
            .map(|bp| bp.line)
            .collect();
        self.ensure_source_cached(&event.file);
        let lines = self
            .source_cache
            .get(&event.file)
            .and_then(|cached| cached.as_deref());
        panes::render_source_pane(
            frame,
            body[0],
            if event.file.is_empty() { "?" } else { &event.file },
            lines,
            event.line as usize,
            &breakpoint_lines,
            &mut self.source_scroll,
        );

        panes::render_variables_pane(
            frame,
            body[1],
            &event,
            &changes,
            &self.watches,
            &self.events,
        );

        let (hints, middle, middle_is_error) = self.footer_content();
        panes::render_footer(
            frame,
            rows[2],
            &hints,
            &middle,
            middle_is_error,
            &event.desc,
        );

        match &self.mode {
            Mode::Overlay(Overlay::Help) => panes::render_help(frame),
            Mode::Overlay(Overlay::Timeline) => {
                panes::render_timeline(frame, &self.stats, self.pos, self.events.len());
            }
            Mode::Overlay(Overlay::Inspect(name)) => {
                let history = watch_history(&self.events, name);
                panes::render_inspect(frame, name, &event, &history, self.pos);
            }
            _ => {}
        }
    }

    fn footer_content(&self) -> (String, String, bool) {
        match &self.mode {
            Mode::Prompt(prompt) => (
                "enter: accept   esc: cancel   backspace: delete".to_string(),
                format!("{}: {}_", prompt.label(), self.input),
                false,
            ),
            Mode::Overlay(_) => (
                "any key to close".to_string(),
                self.status.clone(),
                self.status_is_error,
            ),
            Mode::Normal => (
                "←/→ step  PgUp/PgDn page  g jump  c/r breakpoint  / search  n/p match  \
                 b break  w watch  d diff  v inspect  t timeline  h help  q quit"
                    .to_string(),
                self.status.clone(),
                self.status_is_error,
            ),
        }
    }

    fn ensure_source_cached(&mut self, path: &str) {
        if path.is_empty() || self.source_cache.contains_key(path) {
            return;
        }
        let lines = fs::read_to_string(path)
            .ok()
            .map(|text| text.lines().map(str::to_string).collect::<Vec<_>>());
        self.source_cache.insert(path.to_string(), lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn event(step: u64, file: &str, line: u32, desc: &str) -> Event {
        Event {
            step,
            ts: step as f64,
            file: file.to_string(),
            line,
            col: 0,
            desc: desc.to_string(),
            depth: 0,
            scope: "<module>".to_string(),
            vars: BTreeMap::new(),
        }
    }

    fn ten_step_app() -> App {
        let descs = ["a", "b", "c", "a", "b", "c", "a", "b", "c", "done"];
        let events = descs
            .iter()
            .enumerate()
            .map(|(i, d)| event(i as u64, "m.src", i as u32 + 1, d))
            .collect();
        App::new(events)
    }

    #[test]
    fn navigation_clamps_to_range() {
        let mut app = ten_step_app();
        app.step_backward();
        assert_eq!(app.pos, 0);
        app.end();
        app.step_forward();
        assert_eq!(app.pos, 9);
        app.page_forward();
        assert_eq!(app.pos, 9);
        app.home();
        app.page_backward();
        assert_eq!(app.pos, 0);
    }

    #[test]
    fn out_of_range_jump_leaves_pos_unchanged() {
        let mut app = ten_step_app();
        app.jump(4);
        assert_eq!(app.pos, 4);
        app.jump(99);
        assert_eq!(app.pos, 4);
        assert!(app.status_is_error);
    }

    #[test]
    fn search_cycles_with_wraparound() {
        let mut app = ten_step_app();
        app.run_search("a");
        assert_eq!(app.search_results(), &[0, 3, 6]);
        assert_eq!(app.pos, 0);
        app.search_next();
        assert_eq!(app.pos, 3);
        app.search_next();
        assert_eq!(app.pos, 6);
        app.search_next();
        assert_eq!(app.pos, 0);
        app.search_prev();
        assert_eq!(app.pos, 6);
    }

    #[test]
    fn search_falls_back_to_vars() {
        let mut app = ten_step_app();
        app.events[5]
            .vars
            .insert("total".to_string(), "99".to_string());
        app.run_search("total");
        assert_eq!(app.search_results(), &[5]);
    }

    #[test]
    fn breakpoint_matching_is_suffix_based() {
        let mut app = ten_step_app();
        app.events[7].file = "proj/m.src".to_string();
        app.events[7].line = 15;
        app.toggle_breakpoint("m.src:15");

        app.pos = 0;
        app.continue_to_breakpoint();
        assert_eq!(app.pos, 7);

        app.pos = 9;
        app.reverse_to_breakpoint();
        assert_eq!(app.pos, 7);

        // No further hit forward: pos stays, error shown
        app.continue_to_breakpoint();
        assert_eq!(app.pos, 7);
        assert_eq!(app.status, "No breakpoint hit");
    }

    #[test]
    fn continue_with_no_breakpoints_reports_no_hit() {
        let mut app = ten_step_app();
        app.continue_to_breakpoint();
        assert_eq!(app.pos, 0);
        assert_eq!(app.status, "No breakpoint hit");
        app.end();
        app.reverse_to_breakpoint();
        assert_eq!(app.pos, 9);
        assert_eq!(app.status, "No breakpoint hit");
    }

    #[test]
    fn toggle_breakpoint_twice_removes_it() {
        let mut app = ten_step_app();
        app.toggle_breakpoint("m.src:3");
        assert_eq!(app.breakpoints.len(), 1);
        app.toggle_breakpoint("m.src:3");
        assert!(app.breakpoints.is_empty());
    }

    #[test]
    fn invalid_breakpoint_spec_is_rejected() {
        let mut app = ten_step_app();
        app.toggle_breakpoint("nonsense");
        assert!(app.breakpoints.is_empty());
        assert!(app.status_is_error);
    }

    #[test]
    fn jump_prompt_accepts_digits_only() {
        let mut app = ten_step_app();
        app.handle_key(KeyEvent::from(KeyCode::Char('g')));
        assert_eq!(app.mode, Mode::Prompt(Prompt::Jump));
        for c in ['x', '7', '!', ' '] {
            app.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.pos, 7);
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn escape_cancels_a_prompt() {
        let mut app = ten_step_app();
        app.handle_key(KeyEvent::from(KeyCode::Char('/')));
        app.handle_key(KeyEvent::from(KeyCode::Char('a')));
        app.handle_key(KeyEvent::from(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.search_results().is_empty());
    }

    #[test]
    fn any_key_dismisses_an_overlay() {
        let mut app = ten_step_app();
        app.handle_key(KeyEvent::from(KeyCode::Char('t')));
        assert_eq!(app.mode, Mode::Overlay(Overlay::Timeline));
        app.handle_key(KeyEvent::from(KeyCode::Char('x')));
        assert_eq!(app.mode, Mode::Normal);
    }

    #[test]
    fn empty_watch_input_lists_watches() {
        let mut app = ten_step_app();
        app.toggle_watch("x");
        app.handle_key(KeyEvent::from(KeyCode::Char('w')));
        app.handle_key(KeyEvent::from(KeyCode::Enter));
        assert_eq!(app.status, "Watches: x");
    }

    #[test]
    fn diff_reports_no_changes_on_identical_steps() {
        let mut app = ten_step_app();
        app.pos = 1;
        app.show_diff();
        assert_eq!(app.status, "No changes");
    }
}
