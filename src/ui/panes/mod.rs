//! Stateless render functions for the replay screen
//!
//! Each function draws one region from values the [`App`] hands it; none of
//! them own state beyond the scroll offsets passed in by reference.
//!
//! [`App`]: crate::ui::app::App

pub mod chrome;
pub mod overlays;
pub mod source;
pub mod variables;

pub use chrome::{render_footer, render_header};
pub use overlays::{render_help, render_inspect, render_timeline};
pub use source::render_source_pane;
pub use variables::render_variables_pane;
