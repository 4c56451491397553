//! The trace record and its line-oriented codec
//!
//! One [`Event`] per executed statement, one JSON object per line on disk.
//! Field order in the encoded form follows the struct declaration, so traces
//! diff cleanly; decoding ignores unknown fields so newer writers stay
//! readable by older replayers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scope name used while execution is outside any traced procedure.
pub const MODULE_SCOPE: &str = "<module>";

/// A single trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Dense, zero-based position in the trace
    pub step: u64,
    /// Wall-clock seconds since the UNIX epoch; non-decreasing per writer
    pub ts: f64,
    /// Source path of the statement; may be empty when unknown
    pub file: String,
    /// 1-based line, 0 when unavailable
    pub line: u32,
    /// 0-based column, 0 when unavailable
    pub col: u32,
    /// One-line statement description
    pub desc: String,
    /// Call-stack depth; 0 is the outermost instrumented scope
    pub depth: u32,
    /// Name of the containing procedure, or [`MODULE_SCOPE`]
    pub scope: String,
    /// Stringified value of every local known at the emission point
    #[serde(default)]
    pub vars: BTreeMap<String, String>,
}

/// Encode one event as a single JSON line (no trailing newline).
pub fn encode_line(event: &Event) -> String {
    // A BTreeMap of strings and plain scalars cannot fail to serialize
    serde_json::to_string(event).unwrap_or_default()
}

/// Decode one line. Returns `None` for blank lines, lines that are not JSON,
/// and objects missing any required scalar; a missing `vars` key becomes an
/// empty map.
pub fn decode_line(line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Event {
        let mut vars = BTreeMap::new();
        vars.insert("x".to_string(), "10".to_string());
        vars.insert("name".to_string(), "\"ida\"".to_string());
        Event {
            step: 3,
            ts: 1700000000.25,
            file: "prog.src".to_string(),
            line: 7,
            col: 2,
            desc: "x = x + 1".to_string(),
            depth: 1,
            scope: "f".to_string(),
            vars,
        }
    }

    #[test]
    fn round_trips_every_field() {
        let event = sample();
        let decoded = decode_line(&encode_line(&event)).expect("decode failed");
        assert_eq!(decoded, event);
    }

    #[test]
    fn rejects_non_json() {
        assert!(decode_line("not json at all").is_none());
        assert!(decode_line("").is_none());
    }

    #[test]
    fn rejects_missing_required_scalar() {
        // No "step"
        let line = r#"{"ts":1.0,"file":"a","line":1,"col":0,"desc":"d","depth":0,"scope":"<module>"}"#;
        assert!(decode_line(line).is_none());
    }

    #[test]
    fn missing_vars_becomes_empty_map() {
        let line = r#"{"step":0,"ts":1.0,"file":"a","line":1,"col":0,"desc":"d","depth":0,"scope":"<module>"}"#;
        let event = decode_line(line).expect("decode failed");
        assert!(event.vars.is_empty());
    }

    #[test]
    fn ignores_unknown_fields() {
        let line = r#"{"step":0,"ts":1.0,"file":"a","line":1,"col":0,"desc":"d","depth":0,"scope":"<module>","thread":"main"}"#;
        assert!(decode_line(line).is_some());
    }
}
