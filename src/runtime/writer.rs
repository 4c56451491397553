//! The trace writer instrumented programs call into
//!
//! One writer per process per trace file. Every emission is encoded, written,
//! and flushed before `emit` returns, so a crashing program still leaves a
//! well-formed prefix on disk. A failed open is not an error for the host
//! program: the writer goes quiet and drops every subsequent write.

use crate::trace::event::{encode_line, Event, MODULE_SCOPE};
use crate::trace::ellipsize;
use std::collections::{BTreeMap, VecDeque};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default trace path in the working directory.
pub const DEFAULT_TRACE_PATH: &str = ".debug.trace";

/// Environment variable overriding the trace path. An explicit path passed
/// to [`TraceWriter::create`] wins over this.
pub const TRACE_PATH_ENV: &str = "RETRACE_TRACE";

/// How many recent events the close-time summary shows.
pub const RING_CAPACITY: usize = 15;

/// Captured values are cut to this width in the summary. Distinct from the
/// 80-column statement description width.
pub const SUMMARY_VALUE_WIDTH: usize = 30;

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Step counter, scope tracker, and append-only line emitter.
pub struct TraceWriter {
    path: PathBuf,
    file: Option<File>,
    next_step: u64,
    depth: u32,
    scope: String,
    ring: VecDeque<Event>,
    max_depth: u32,
    scopes: Vec<String>,
}

impl TraceWriter {
    /// Open (truncating) the trace file. Resolution order: explicit `path`,
    /// then the [`TRACE_PATH_ENV`] variable, then [`DEFAULT_TRACE_PATH`].
    pub fn create(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => env::var(TRACE_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TRACE_PATH)),
        };

        // An unopenable trace file must not break the traced program
        let file = File::create(&path).ok();

        Self {
            path,
            file,
            next_step: 0,
            depth: 0,
            scope: MODULE_SCOPE.to_string(),
            ring: VecDeque::with_capacity(RING_CAPACITY),
            max_depth: 0,
            scopes: vec![MODULE_SCOPE.to_string()],
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Steps emitted so far.
    pub fn steps(&self) -> u64 {
        self.next_step
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Emit one event: stamp step, timestamp, and the current scope/depth,
    /// write the line, flush, and remember it in the ring buffer.
    pub fn emit(
        &mut self,
        file: &str,
        line: u32,
        col: u32,
        desc: &str,
        vars: BTreeMap<String, String>,
    ) {
        let event = Event {
            step: self.next_step,
            ts: now_seconds(),
            file: file.to_string(),
            line,
            col,
            desc: desc.to_string(),
            depth: self.depth,
            scope: self.scope.clone(),
            vars,
        };
        self.next_step += 1;
        self.max_depth = self.max_depth.max(self.depth);

        if let Some(out) = &mut self.file {
            // Write errors are swallowed: tracing never fails the host
            let _ = writeln!(out, "{}", encode_line(&event));
            let _ = out.flush();
        }

        if self.ring.len() == RING_CAPACITY {
            self.ring.pop_front();
        }
        self.ring.push_back(event);
    }

    pub fn enter_scope(&mut self, name: &str) {
        self.scope = name.to_string();
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        if !self.scopes.iter().any(|s| s == name) {
            self.scopes.push(name.to_string());
        }
    }

    /// Leave the current scope. The depth clamps at zero, at which point the
    /// scope name resets to [`MODULE_SCOPE`].
    pub fn exit_scope(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.scope = MODULE_SCOPE.to_string();
        }
    }

    /// Write the human-readable summary next to the trace and close the
    /// file handle. Further emissions are dropped.
    pub fn close(&mut self) {
        self.write_summary();
        self.file = None;
    }

    /// Summary path: the trace path with its extension replaced.
    pub fn summary_path(&self) -> PathBuf {
        self.path.with_extension("summary")
    }

    fn write_summary(&self) {
        // Skip the summary when the trace itself never opened
        if self.file.is_none() {
            return;
        }

        let mut text = String::new();
        text.push_str("# Debug Summary\n");
        text.push_str(&format!("# Total steps: {}\n", self.next_step));
        text.push_str(&format!("# Max depth: {}\n", self.max_depth));
        text.push_str(&format!("# Scopes: {}\n", self.scopes.join(" -> ")));
        text.push('\n');
        text.push_str(&format!("# Last {} steps:\n", self.ring.len()));

        for event in &self.ring {
            text.push_str(&format!(
                "[{}] {}:{} ({}) | {}\n",
                event.step, event.file, event.line, event.scope, event.desc
            ));
            if !event.vars.is_empty() {
                let rendered: Vec<String> = event
                    .vars
                    .iter()
                    .map(|(name, value)| {
                        format!("{}={}", name, ellipsize(value, SUMMARY_VALUE_WIDTH))
                    })
                    .collect();
                text.push_str(&format!("    vars: {}\n", rendered.join(", ")));
            }
        }

        let _ = std::fs::write(self.summary_path(), text);
    }
}
