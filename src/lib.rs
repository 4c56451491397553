//! # Introduction
//!
//! retrace is a trace-based time-travel debugger. Source code wrapped in a
//! `debug { … }` block is rewritten at the AST level so that every statement
//! emits a structured trace event; running the instrumented program appends
//! those events to a line-delimited JSON file, and the replay binary lets you
//! walk that history forward and backward in a full-screen terminal UI.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Parser → AST → Instrumenter → Evaluator → trace file → Replay TUI
//! ```
//!
//! 1. [`parser`] — tokenises the mini source language and builds a statement
//!    tree with per-node source locations.
//! 2. [`instrument`] — rewrites a `debug` region: an emit call before every
//!    statement, scope enter/exit around procedure bodies, known-locals
//!    tracking, and verbatim splicing of `noDebug { … }` islands.
//! 3. [`runtime`] — the trace writer the instrumented code calls into: a step
//!    counter, a scope-depth tracker, and an append-only flush-per-event file
//!    emitter with a human-readable summary on close.
//! 4. [`eval`] — executes instrumented statement trees so a trace exists to
//!    replay.
//! 5. [`trace`] — the on-disk event schema, its line codec, and the loader
//!    plus derived indices the replayer is built on.
//! 6. [`ui`] — ratatui-based replay TUI; not part of the stable library API.
//!
//! Replay never re-executes the program: all per-step variable state is
//! reconstructed from the captured (stringified) values in the trace file.

pub mod eval;
pub mod instrument;
pub mod parser;
pub mod runtime;
pub mod trace;
pub mod ui;
