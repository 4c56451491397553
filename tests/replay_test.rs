// Replay-side integration tests: loader invariants, navigation, search,
// breakpoints, and the summary file contract

use retrace::runtime::TraceWriter;
use retrace::trace::{changed_names, load, stats, Event};
use retrace::ui::App;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;

fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn write_trace(steps: &[(&str, u32, &str, &[(&str, &str)])]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("run.trace");
    let mut writer = TraceWriter::create(Some(&path));
    for (file, line, desc, pairs) in steps {
        writer.emit(file, *line, 0, desc, vars(pairs));
    }
    writer.close();
    (dir, path)
}

#[test]
fn written_trace_loads_back_verbatim() {
    let (_dir, path) = write_trace(&[
        ("m.src", 1, "var a = 1", &[]),
        ("m.src", 2, "a = a + 1", &[("a", "1")]),
        ("m.src", 3, "echo a", &[("a", "2")]),
    ]);

    let events = load(&path);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].step, 0);
    assert_eq!(events[2].vars.get("a").map(String::as_str), Some("2"));

    let stats = stats(&events);
    assert_eq!(stats.total_steps, 3);
    assert_eq!(stats.files, vec!["m.src"]);
}

#[test]
fn changed_set_equals_symmetric_difference_plus_value_diffs() {
    let step_vars: [&[(&str, &str)]; 4] = [
        &[("a", "1"), ("b", "2")],
        &[("a", "1"), ("b", "3"), ("c", "0")],
        &[("b", "3")],
        &[("b", "3")],
    ];
    let steps: Vec<(&str, u32, &str, &[(&str, &str)])> = step_vars
        .iter()
        .map(|pairs| ("m.src", 1u32, "step", *pairs))
        .collect();
    let (_dir, path) = write_trace(&steps);
    let events = load(&path);

    for index in 1..events.len() {
        let changes = changed_names(&events, index);

        let current: BTreeSet<&String> = events[index].vars.keys().collect();
        let previous: BTreeSet<&String> = events[index - 1].vars.keys().collect();

        let mut expected: BTreeSet<String> = current
            .symmetric_difference(&previous)
            .map(|s| s.to_string())
            .collect();
        for name in current.intersection(&previous) {
            if events[index].vars[*name] != events[index - 1].vars[*name] {
                expected.insert(name.to_string());
            }
        }

        let actual: BTreeSet<String> = changes
            .added
            .iter()
            .chain(&changes.removed)
            .chain(&changes.changed)
            .cloned()
            .collect();
        assert_eq!(actual, expected, "changed set mismatch at step {}", index);
    }
}

#[test]
fn navigation_never_leaves_the_step_range() {
    let steps: Vec<(&str, u32, &str, &[(&str, &str)])> =
        (0..10).map(|_| ("m.src", 1u32, "step", &[][..])).collect();
    let (_dir, path) = write_trace(&steps);
    let mut app = App::new(load(&path));

    app.step_backward();
    app.page_backward();
    assert_eq!(app.pos, 0);

    app.end();
    app.step_forward();
    app.page_forward();
    assert_eq!(app.pos, 9);

    app.jump(12); // rejected
    assert_eq!(app.pos, 9);
    app.jump(4);
    assert_eq!(app.pos, 4);
}

#[test]
fn search_results_and_cycling_match_the_scenario() {
    // desc sequence a b c a b c a b c done
    let descs = ["a", "b", "c", "a", "b", "c", "a", "b", "c", "done"];
    let steps: Vec<(&str, u32, &str, &[(&str, &str)])> = descs
        .iter()
        .map(|d| ("m.src", 1u32, *d, &[][..]))
        .collect();
    let (_dir, path) = write_trace(&steps);
    let mut app = App::new(load(&path));

    app.run_search("a");
    assert_eq!(app.search_results(), &[0, 3, 6]);
    assert_eq!(app.pos, 0);
    app.search_next();
    assert_eq!(app.pos, 3);
    app.search_next();
    assert_eq!(app.pos, 6);
    app.search_next();
    assert_eq!(app.pos, 0); // wraps
}

#[test]
fn breakpoint_suffix_match_and_continue_reverse() {
    let steps: Vec<(&str, u32, &str, &[(&str, &str)])> = (0..10)
        .map(|i| {
            if i == 7 {
                ("proj/m.src", 15u32, "hit", &[][..])
            } else {
                ("proj/m.src", i as u32 + 20, "miss", &[][..])
            }
        })
        .collect();
    let (_dir, path) = write_trace(&steps);
    let mut app = App::new(load(&path));

    app.toggle_breakpoint("m.src:15");

    app.continue_to_breakpoint();
    assert_eq!(app.pos, 7);

    app.end();
    app.reverse_to_breakpoint();
    assert_eq!(app.pos, 7);

    // No hit beyond step 7: position must not move
    app.continue_to_breakpoint();
    assert_eq!(app.pos, 7);
}

#[test]
fn summary_file_matches_the_documented_shape() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.trace");
    let mut writer = TraceWriter::create(Some(&path));

    writer.emit("m.src", 1, 0, "var a = 1", vars(&[]));
    writer.enter_scope("work");
    writer.emit("m.src", 5, 0, "a = a * 2", vars(&[("a", "1")]));
    writer.exit_scope();
    writer.close();

    let summary_path = dir.path().join("session.summary");
    let summary = std::fs::read_to_string(&summary_path).expect("summary missing");
    let lines: Vec<&str> = summary.lines().collect();

    assert_eq!(lines[0], "# Debug Summary");
    assert_eq!(lines[1], "# Total steps: 2");
    assert_eq!(lines[2], "# Max depth: 1");
    assert_eq!(lines[3], "# Scopes: <module> -> work");
    assert_eq!(lines[4], "");
    assert_eq!(lines[5], "# Last 2 steps:");
    assert_eq!(lines[6], "[0] m.src:1 (<module>) | var a = 1");
    assert_eq!(lines[7], "[1] m.src:5 (work) | a = a * 2");
    assert_eq!(lines[8], "    vars: a=1");
}

#[test]
fn loader_tolerates_interleaved_garbage() {
    use std::io::Write;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("mixed.trace");
    {
        let mut writer = TraceWriter::create(Some(&path));
        writer.emit("m.src", 1, 0, "ok", vars(&[]));
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .expect("open");
    writeln!(file, "{{\"step\": 99, \"truncated").expect("write");
    writeln!(file, "not json").expect("write");

    let events = load(&path);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].desc, "ok");
}

#[test]
fn watch_history_is_reachable_from_loaded_events() {
    let (_dir, path) = write_trace(&[
        ("m.src", 1, "s1", &[("x", "1")]),
        ("m.src", 2, "s2", &[("x", "1")]),
        ("m.src", 3, "s3", &[("x", "2")]),
    ]);
    let events: Vec<Event> = load(&path);
    let history = retrace::trace::watch_history(&events, "x");
    assert_eq!(history, vec![(0, "1".to_string()), (2, "2".to_string())]);
}
