//! Replay terminal user interface built on [ratatui](https://docs.rs/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]** — application state, the keyboard event loop, prompt modes,
//!   navigation, search, breakpoints, and watches
//! - **[`panes`]** — stateless render functions for the visible regions
//!   (header, source pane, variables pane, footer, modal overlays)
//! - **[`theme`]** — centralized color palette used by all panes
//!
//! The entry point for consumers is [`App`]: construct it with a loaded
//! event vector and call [`App::run`] to start the event loop. Everything
//! the loop mutates lives on plain methods, so navigation semantics are
//! testable without a terminal.
//!
//! [`App::run`]: app::App::run

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;
