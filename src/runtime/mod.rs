//! Runtime support for instrumented programs
//!
//! [`writer::TraceWriter`] does the actual work; this module adds the two
//! things generated code needs on top of it:
//!
//! - [`safe_repr`]: stringification that cannot fail, so capturing a value
//!   can never take the host program down.
//! - The five-function process-global surface the rewriter targets:
//!   [`init_debug_log`], [`close_debug_log`], [`debug_log`], [`enter_scope`],
//!   [`exit_scope`]. The global writer sits behind a mutex, which makes
//!   multi-threaded emission safe but serialised; single-threaded callers pay
//!   one uncontended lock per event.
//!
//! There is no portable process-exit hook for library code in Rust, so the
//! close-on-exit contract is carried by [`LogGuard`] (closes the log on
//! drop) together with the explicit close call the instrumenter appends to
//! every `debug` region.

pub mod writer;

pub use writer::{TraceWriter, DEFAULT_TRACE_PATH, RING_CAPACITY, SUMMARY_VALUE_WIDTH, TRACE_PATH_ENV};

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Mutex;

/// Substituted when a value's formatter reports an error.
pub const REPR_ERROR: &str = "<error>";

/// Substituted for values that have no string representation at all.
pub const NO_REPR: &str = "<no representation>";

/// Render a value, substituting [`REPR_ERROR`] if its `Display` impl fails.
/// Never panics, never propagates: `emit` must not fail from value capture.
pub fn safe_repr(value: &dyn fmt::Display) -> String {
    let mut out = String::new();
    match write!(out, "{}", value) {
        Ok(()) => out,
        Err(_) => REPR_ERROR.to_string(),
    }
}

static WRITER: Mutex<Option<TraceWriter>> = Mutex::new(None);

fn with_writer(f: impl FnOnce(&mut TraceWriter)) {
    // A poisoned lock just drops the write; tracing never fails the host
    let Ok(mut guard) = WRITER.lock() else {
        return;
    };
    let writer = guard.get_or_insert_with(|| TraceWriter::create(None));
    f(writer);
}

/// Open (truncating) the process-wide trace log at the default or
/// environment-selected path, replacing any previous writer.
pub fn init_debug_log() {
    if let Ok(mut guard) = WRITER.lock() {
        *guard = Some(TraceWriter::create(None));
    }
}

/// As [`init_debug_log`], but at an explicit path (which wins over the
/// environment variable).
pub fn init_debug_log_at(path: &Path) {
    if let Ok(mut guard) = WRITER.lock() {
        *guard = Some(TraceWriter::create(Some(path)));
    }
}

/// Emit one trace event. Initialises the writer lazily on first use.
pub fn debug_log(file: &str, line: u32, col: u32, desc: &str, vars: BTreeMap<String, String>) {
    with_writer(|w| w.emit(file, line, col, desc, vars));
}

/// Record entry into a named scope.
pub fn enter_scope(name: &str) {
    with_writer(|w| w.enter_scope(name));
}

/// Record exit from the current scope.
pub fn exit_scope() {
    with_writer(|w| w.exit_scope());
}

/// Write the summary and close the process-wide log. Safe to call twice.
pub fn close_debug_log() {
    if let Ok(mut guard) = WRITER.lock() {
        if let Some(writer) = guard.as_mut() {
            writer.close();
        }
        *guard = None;
    }
}

/// Closes the process-wide log when dropped, covering early returns and
/// panics in the host program.
pub struct LogGuard;

impl Drop for LogGuard {
    fn drop(&mut self) {
        close_debug_log();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;

    impl fmt::Display for AlwaysFails {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn safe_repr_renders_ordinary_values() {
        assert_eq!(safe_repr(&10), "10");
        assert_eq!(safe_repr(&"text"), "text");
    }

    #[test]
    fn safe_repr_substitutes_on_failure() {
        assert_eq!(safe_repr(&AlwaysFails), REPR_ERROR);
    }

    // The only test touching the process-global writer, so it cannot race
    // with a parallel test over the same state.
    #[test]
    fn global_surface_writes_and_closes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("global.trace");

        init_debug_log_at(&path);
        enter_scope("f");
        debug_log("t.src", 3, 0, "var y = n * 2", BTreeMap::new());
        exit_scope();
        {
            let _guard = LogGuard;
        }

        let events = crate::trace::load(&path);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].scope, "f");
        assert_eq!(events[0].depth, 1);
        assert!(path.with_extension("summary").exists());
    }
}
