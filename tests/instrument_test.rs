// End-to-end instrumentation tests: parse → instrument → evaluate → load

use retrace::eval::Evaluator;
use retrace::instrument::{expand_program, instrument_region};
use retrace::parser::ast::SourceLocation;
use retrace::parser::parser::Parser;
use retrace::runtime::TraceWriter;
use retrace::trace::{load, Event, MODULE_SCOPE};
use std::path::PathBuf;

/// Parse `source`, instrument it as one region rooted at line 1 of `t.src`,
/// run it, and load the trace back.
fn run_region(source: &str) -> Vec<Event> {
    let program = Parser::new(source, "t.src")
        .expect("lexing failed")
        .parse_program()
        .expect("parsing failed");

    let instrumented = instrument_region(&program.stmts, &SourceLocation::new("t.src", 1, 0));
    run_stmts(&instrumented).1
}

/// Parse a whole file containing `debug { … }` wrappers, expand, run, load.
fn run_program(source: &str) -> (Vec<String>, Vec<Event>) {
    let program = Parser::new(source, "t.src")
        .expect("lexing failed")
        .parse_program()
        .expect("parsing failed");
    let expanded = expand_program(&program);
    run_stmts(&expanded.stmts)
}

fn run_stmts(stmts: &[retrace::parser::ast::Stmt]) -> (Vec<String>, Vec<Event>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path: PathBuf = dir.path().join("run.trace");
    let mut writer = TraceWriter::create(Some(&path));
    let mut evaluator = Evaluator::new(&mut writer);
    evaluator.run(stmts).expect("evaluation failed");
    let output = evaluator.output().to_vec();
    (output, load(&path))
}

#[test]
fn minimal_trace_declaration_then_mutation() {
    // `var x = 10` then `x = x + 1`: the declaration's own event must not
    // yet contain x; the next event must show it with its pre-assignment
    // value.
    let events = run_region("var x = 10\nx = x + 1");

    assert_eq!(events.len(), 2);

    assert_eq!(events[0].step, 0);
    assert_eq!(events[0].file, "t.src");
    assert_eq!(events[0].line, 1);
    assert_eq!(events[0].desc, "var x = 10");
    assert!(events[0].vars.is_empty());

    assert_eq!(events[1].step, 1);
    assert_eq!(events[1].line, 2);
    assert_eq!(events[1].desc, "x = x + 1");
    assert_eq!(events[1].vars.get("x").map(String::as_str), Some("10"));
}

#[test]
fn for_loop_captures_the_binder_per_iteration() {
    let events = run_region("for i in 1..3 { echo i }");

    assert_eq!(events.len(), 4);
    assert!(events[0].vars.is_empty()); // the for statement itself
    for (offset, expected) in [(1usize, "1"), (2, "2"), (3, "3")] {
        assert_eq!(events[offset].desc, "echo i");
        assert_eq!(
            events[offset].vars.get("i").map(String::as_str),
            Some(expected)
        );
    }
}

#[test]
fn procedure_scope_raises_depth_and_resets_known_vars() {
    let events = run_region("proc f(n) {\n var y = n * 2\n echo y\n}\nf(5)");

    let in_proc: Vec<&Event> = events.iter().filter(|e| e.scope == "f").collect();
    assert_eq!(in_proc.len(), 2);

    assert_eq!(in_proc[0].depth, 1);
    assert_eq!(in_proc[0].vars.len(), 1);
    assert_eq!(in_proc[0].vars.get("n").map(String::as_str), Some("5"));

    assert_eq!(in_proc[1].depth, 1);
    assert_eq!(in_proc[1].vars.get("n").map(String::as_str), Some("5"));
    assert_eq!(in_proc[1].vars.get("y").map(String::as_str), Some("10"));

    // Outside the procedure everything is module scope at depth 0
    for event in events.iter().filter(|e| e.scope != "f") {
        assert_eq!(event.depth, 0);
        assert_eq!(event.scope, MODULE_SCOPE);
    }
}

#[test]
fn no_debug_island_runs_but_never_emits() {
    let (output, events) = run_program(
        "debug {\n\
         var s = 0\n\
         noDebug {\n\
         for i in 1..1000000 { s += i }\n\
         }\n\
         echo s\n\
         }",
    );

    // The island did its work
    assert_eq!(output, vec!["500000500000"]);

    // ...but contributed zero events
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].desc, "var s = 0");
    assert_eq!(events[1].desc, "echo s");
    assert_eq!(
        events[1].vars.get("s").map(String::as_str),
        Some("500000500000")
    );
}

#[test]
fn branch_declarations_stay_invisible_to_siblings() {
    let events = run_region(
        "var flag = true\n\
         if flag {\n\
         var inner = 1\n\
         echo inner\n\
         } else {\n\
         echo 0\n\
         }\n\
         echo flag",
    );

    // The statement after the if sees flag but not the then-branch local
    let after = events.last().expect("no events");
    assert_eq!(after.desc, "echo flag");
    assert!(after.vars.contains_key("flag"));
    assert!(!after.vars.contains_key("inner"));
}

#[test]
fn no_debug_outside_a_debug_region_is_a_passthrough() {
    let (output, events) = run_program("noDebug {\n echo 7\n}");
    assert_eq!(output, vec!["7"]);
    assert!(events.is_empty());
}

#[test]
fn while_loop_emits_per_iteration() {
    let events = run_region("var n = 3\nwhile n > 0 {\n n -= 1\n}\necho n");

    let decrements = events.iter().filter(|e| e.desc == "n -= 1").count();
    assert_eq!(decrements, 3);
    // The loop head is one statement: emitted once, ahead of the loop
    let heads = events
        .iter()
        .filter(|e| e.desc.starts_with("while"))
        .count();
    assert_eq!(heads, 1);

    let last = events.last().expect("no events");
    assert_eq!(last.vars.get("n").map(String::as_str), Some("0"));
}

#[test]
fn case_branches_fork_known_vars() {
    let events = run_region(
        "var x = 2\n\
         case x {\n\
         of 1 { var a = 10\n echo a }\n\
         of 2 { var b = 20\n echo b }\n\
         else { echo 0 }\n\
         }\n\
         echo x",
    );

    let echo_b = events
        .iter()
        .find(|e| e.desc == "echo b")
        .expect("echo b never emitted");
    assert!(echo_b.vars.contains_key("b"));
    assert!(!echo_b.vars.contains_key("a"));

    let after = events.last().expect("no events");
    assert!(!after.vars.contains_key("b"));
}

#[test]
fn steps_are_dense_and_timestamps_monotone() {
    let events = run_region("var x = 0\nfor i in 1..5 {\n x += i\n}\necho x");

    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.step, i as u64);
    }
    for pair in events.windows(2) {
        assert!(pair[0].ts <= pair[1].ts);
    }
    // Module scope implies depth 0 everywhere in this trace
    for event in &events {
        assert!(event.scope != MODULE_SCOPE || event.depth == 0);
    }
}
