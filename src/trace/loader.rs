//! Trace loading and derived indices
//!
//! The loader is deliberately forgiving: a crashed writer leaves a valid
//! prefix (every event is flushed as a whole line), and anything that does
//! not decode is skipped rather than failing the load. All derived data
//! references events by step index, never by pointer, so the event vector
//! stays freely growable.

use crate::trace::event::{decode_line, Event};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read a whole trace file. Malformed lines are skipped; a missing file
/// yields an empty vector.
pub fn load(path: &Path) -> Vec<Event> {
    let Ok(file) = File::open(path) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            break;
        };
        if let Some(event) = decode_line(&line) {
            events.push(event);
        }
    }
    events
}

/// Single-pass aggregate over a loaded trace.
#[derive(Debug, Clone, Default)]
pub struct TraceStats {
    pub total_steps: usize,
    /// Distinct non-empty file paths in order of first appearance
    pub files: Vec<String>,
    /// Distinct scope names in order of first appearance
    pub scopes: Vec<String>,
    pub max_depth: u32,
    /// `ts[last] - ts[first]`, 0 when fewer than two events
    pub duration: f64,
}

pub fn stats(events: &[Event]) -> TraceStats {
    let mut stats = TraceStats {
        total_steps: events.len(),
        ..TraceStats::default()
    };

    for event in events {
        if !event.file.is_empty() && !stats.files.iter().any(|f| f == &event.file) {
            stats.files.push(event.file.clone());
        }
        if !stats.scopes.iter().any(|s| s == &event.scope) {
            stats.scopes.push(event.scope.clone());
        }
        stats.max_depth = stats.max_depth.max(event.depth);
    }

    if events.len() >= 2 {
        stats.duration = events[events.len() - 1].ts - events[0].ts;
    }
    stats
}

/// The steps at which `name` takes a value different from the value last
/// emitted for it, with that value. Steps where the name is absent emit
/// nothing and do not reset the comparison.
pub fn watch_history(events: &[Event], name: &str) -> Vec<(usize, String)> {
    let mut history = Vec::new();
    let mut last: Option<&str> = None;

    for (step, event) in events.iter().enumerate() {
        if let Some(value) = event.vars.get(name) {
            if last != Some(value.as_str()) {
                history.push((step, value.clone()));
                last = Some(value.as_str());
            }
        }
    }
    history
}

/// Per-step variable difference against the previous step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// True when `name` was added or took a new value at this step.
    pub fn touches(&self, name: &str) -> bool {
        self.added.iter().any(|n| n == name) || self.changed.iter().any(|n| n == name)
    }

    /// Render as `+a ~b -c`, the diff view's format.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        for name in &self.added {
            parts.push(format!("+{}", name));
        }
        for name in &self.changed {
            parts.push(format!("~{}", name));
        }
        for name in &self.removed {
            parts.push(format!("-{}", name));
        }
        parts.join(" ")
    }
}

/// Names added, removed, or revalued at step `index` relative to the step
/// before it. Step 0 (and out-of-range indices) have no changes.
pub fn changed_names(events: &[Event], index: usize) -> Changes {
    let mut changes = Changes::default();
    if index == 0 || index >= events.len() {
        return changes;
    }

    let current = &events[index].vars;
    let previous = &events[index - 1].vars;

    // Both maps iterate sorted, so the output is sorted without extra work
    for (name, value) in current {
        match previous.get(name) {
            None => changes.added.push(name.clone()),
            Some(old) if old != value => changes.changed.push(name.clone()),
            Some(_) => {}
        }
    }
    for name in previous.keys() {
        if !current.contains_key(name) {
            changes.removed.push(name.clone());
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn event(step: u64, ts: f64, vars: &[(&str, &str)]) -> Event {
        Event {
            step,
            ts,
            file: "prog.src".to_string(),
            line: step as u32 + 1,
            col: 0,
            desc: format!("step {}", step),
            depth: 0,
            scope: "<module>".to_string(),
            vars: vars
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn stats_cover_files_scopes_depth_duration() {
        let mut events = vec![
            event(0, 10.0, &[]),
            event(1, 11.5, &[("x", "1")]),
            event(2, 12.0, &[("x", "2")]),
        ];
        events[1].scope = "f".to_string();
        events[1].depth = 1;
        events[2].file = "other.src".to_string();

        let stats = stats(&events);
        assert_eq!(stats.total_steps, 3);
        assert_eq!(stats.files, vec!["prog.src", "other.src"]);
        assert_eq!(stats.scopes, vec!["<module>", "f"]);
        assert_eq!(stats.max_depth, 1);
        assert!((stats.duration - 2.0).abs() < 1e-9);
    }

    #[test]
    fn watch_history_reports_value_changes_only() {
        let events = vec![
            event(0, 0.0, &[("x", "1")]),
            event(1, 0.0, &[("x", "1")]),
            event(2, 0.0, &[]),          // absent: no entry, no reset
            event(3, 0.0, &[("x", "1")]), // same as last emitted
            event(4, 0.0, &[("x", "2")]),
        ];
        assert_eq!(
            watch_history(&events, "x"),
            vec![(0, "1".to_string()), (4, "2".to_string())]
        );
    }

    #[test]
    fn changed_names_classifies_added_changed_removed() {
        let events = vec![
            event(0, 0.0, &[("a", "1"), ("b", "2")]),
            event(1, 0.0, &[("a", "1"), ("c", "3"), ("b", "9")]),
        ];
        let changes = changed_names(&events, 1);
        assert_eq!(changes.added, vec!["c"]);
        assert_eq!(changes.changed, vec!["b"]);
        assert!(changes.removed.is_empty());
        assert_eq!(changes.summary(), "+c ~b");
    }

    #[test]
    fn step_zero_has_no_changes() {
        let events = vec![event(0, 0.0, &[("a", "1")])];
        assert!(changed_names(&events, 0).is_empty());
    }

    #[test]
    fn load_skips_malformed_lines() {
        use std::io::Write;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("trace.jsonl");
        let mut file = File::create(&path).expect("create");
        writeln!(file, "{}", crate::trace::encode_line(&event(0, 1.0, &[]))).expect("write");
        writeln!(file, "{{ truncated garbage").expect("write");
        writeln!(file, "{}", crate::trace::encode_line(&event(1, 2.0, &[]))).expect("write");

        let events = load(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].step, 1);
    }

    #[test]
    fn load_missing_file_is_empty() {
        assert!(load(Path::new("/no/such/trace.file")).is_empty());
    }
}
