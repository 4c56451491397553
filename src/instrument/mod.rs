//! Compile-time statement instrumentation
//!
//! Rewrites the body of a `debug { … }` region so that every recognised
//! statement is preceded by a [`TraceCall::Emit`] carrying the statement's
//! location, a one-line description, and the names of all locals known at
//! that point. Procedure bodies additionally get scope enter/exit calls, and
//! `noDebug { … }` sub-blocks are spliced through verbatim.
//!
//! # Known-vars discipline
//!
//! The set of known locals is forked *by value* at every lexical sub-scope
//! (loop bodies, branch arms, handler bodies), so a declaration inside one
//! branch is never visible to a sibling branch and never leaks back out.
//! Procedure bodies start from a fresh set holding only the parameter names.
//!
//! # What is not touched
//!
//! Statements the rewriter does not recognise pass through unchanged with no
//! emission; the rewriter never fails on an unexpected shape.

use crate::parser::ast::{
    Binding, Handler, OfBranch, Program, SourceLocation, Stmt, TraceCall,
};
use crate::trace::ellipsize;

/// Statement descriptions are cut to this many columns. Distinct from the
/// 30-column value truncation used by the summary writer.
pub const DESC_WIDTH: usize = 80;

/// The instrumenter's compile-time estimate of which locals are in scope.
///
/// Order-preserving and duplicate-free; forking is a plain clone of a small
/// vector of short strings, which is what makes the sibling-isolation
/// property trivially hold.
#[derive(Debug, Clone, Default)]
pub struct KnownVars {
    names: Vec<String>,
}

impl KnownVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: &[String]) -> Self {
        let mut vars = Self::new();
        for param in params {
            vars.insert(param);
        }
        vars
    }

    pub fn insert(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Sorted copy for an emit site; keeps generated trees deterministic.
    fn snapshot(&self) -> Vec<String> {
        let mut names = self.names.clone();
        names.sort();
        names
    }

    /// Fold a declaration section's names in, skipping `_`.
    fn extend_from_bindings(&mut self, bindings: &[Binding]) {
        for binding in bindings {
            if let Some(name) = binding.name.ident() {
                self.insert(name);
            }
        }
    }
}

/// Instrument one `debug` region: init the log, rewrite the body starting
/// from an empty known-vars set, close the log.
pub fn instrument_region(body: &[Stmt], region: &SourceLocation) -> Vec<Stmt> {
    let mut vars = KnownVars::new();
    let mut out = vec![Stmt::Trace(TraceCall::Init)];
    out.extend(instrument_stmts(body, &mut vars, region));
    out.push(Stmt::Trace(TraceCall::Close));
    out
}

/// Expand every `debug { … }` wrapper in a program. Outside a `debug`
/// region, `noDebug { … }` is a plain pass-through.
pub fn expand_program(program: &Program) -> Program {
    Program {
        stmts: expand_stmts(&program.stmts),
    }
}

fn expand_stmts(stmts: &[Stmt]) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        match stmt {
            Stmt::Debug { body, loc } => {
                out.extend(instrument_region(body, loc));
            }
            Stmt::NoDebug { body, .. } => {
                out.extend(expand_stmts(body));
            }
            other => out.push(expand_bodies(other)),
        }
    }
    out
}

/// Recurse the debug-block search into every body position.
fn expand_bodies(stmt: &Stmt) -> Stmt {
    let mut stmt = stmt.clone();
    match &mut stmt {
        Stmt::If { branches, else_body, .. } | Stmt::When { branches, else_body, .. } => {
            for (_, body) in branches.iter_mut() {
                *body = expand_stmts(body);
            }
            if let Some(body) = else_body {
                *body = expand_stmts(body);
            }
        }
        Stmt::Case {
            branches, else_body, ..
        } => {
            for branch in branches.iter_mut() {
                branch.body = expand_stmts(&branch.body);
            }
            if let Some(body) = else_body {
                *body = expand_stmts(body);
            }
        }
        Stmt::For { body, .. }
        | Stmt::While { body, .. }
        | Stmt::Block { body, .. }
        | Stmt::ProcDef { body, .. } => {
            *body = expand_stmts(body);
        }
        Stmt::Try {
            body,
            handlers,
            finally,
            ..
        } => {
            *body = expand_stmts(body);
            for handler in handlers.iter_mut() {
                handler.body = expand_stmts(&handler.body);
            }
            if let Some(body) = finally {
                *body = expand_stmts(body);
            }
        }
        _ => {}
    }
    stmt
}

/// One-line description of a statement: its canonical first line, truncated.
fn describe(stmt: &Stmt) -> String {
    let rendered = stmt.to_string();
    let first_line = rendered.lines().next().unwrap_or("");
    ellipsize(first_line, DESC_WIDTH)
}

/// Location of a statement, falling back to the enclosing walk's location
/// when the node's own is unusable.
fn locate(stmt: &Stmt, caller: &SourceLocation) -> SourceLocation {
    match stmt.location() {
        Some(loc) if loc.is_known() => loc.clone(),
        _ => caller.clone(),
    }
}

fn emit_before(stmt: &Stmt, vars: &KnownVars, caller: &SourceLocation) -> Stmt {
    let loc = locate(stmt, caller);
    Stmt::Trace(TraceCall::Emit {
        file: loc.file,
        line: loc.line,
        col: loc.col,
        desc: describe(stmt),
        vars: vars.snapshot(),
    })
}

fn instrument_stmts(
    stmts: &[Stmt],
    vars: &mut KnownVars,
    caller: &SourceLocation,
) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len() * 2);

    for stmt in stmts {
        match stmt {
            // Opt-out island: splice the body untouched, no emission, no
            // recursion.
            Stmt::NoDebug { body, .. } => {
                out.extend(body.iter().cloned());
                continue;
            }
            // Unrecognised shapes (and stray generated nodes) pass through
            // without an emission.
            Stmt::Opaque { .. } | Stmt::Trace(_) => {
                out.push(stmt.clone());
                continue;
            }
            _ => {}
        }

        out.push(emit_before(stmt, vars, caller));

        // Declarations become known only after their own emission, so the
        // event shows the state before the declaration takes effect.
        if let Stmt::Decl { bindings, .. } = stmt {
            vars.extend_from_bindings(bindings);
        }

        let loc = locate(stmt, caller);
        out.push(instrument_children(stmt, vars, &loc));
    }

    out
}

/// Clone `stmt` with every body position rewritten against the appropriate
/// fork of the known-vars set.
fn instrument_children(stmt: &Stmt, vars: &KnownVars, loc: &SourceLocation) -> Stmt {
    let mut stmt = stmt.clone();
    match &mut stmt {
        Stmt::If { branches, else_body, .. } | Stmt::When { branches, else_body, .. } => {
            for (_, body) in branches.iter_mut() {
                let mut fork = vars.fork();
                *body = instrument_stmts(body, &mut fork, loc);
            }
            if let Some(body) = else_body {
                let mut fork = vars.fork();
                *body = instrument_stmts(body, &mut fork, loc);
            }
        }
        Stmt::Case {
            branches, else_body, ..
        } => {
            for OfBranch { body, .. } in branches.iter_mut() {
                let mut fork = vars.fork();
                *body = instrument_stmts(body, &mut fork, loc);
            }
            if let Some(body) = else_body {
                let mut fork = vars.fork();
                *body = instrument_stmts(body, &mut fork, loc);
            }
        }
        Stmt::For { binders, body, .. } => {
            let mut fork = vars.fork();
            for binder in binders.iter() {
                fork.insert(binder);
            }
            *body = instrument_stmts(body, &mut fork, loc);
        }
        Stmt::While { body, .. } | Stmt::Block { body, .. } | Stmt::Debug { body, .. } => {
            let mut fork = vars.fork();
            *body = instrument_stmts(body, &mut fork, loc);
        }
        Stmt::Try {
            body,
            handlers,
            finally,
            ..
        } => {
            let mut fork = vars.fork();
            *body = instrument_stmts(body, &mut fork, loc);
            for Handler { body, .. } in handlers.iter_mut() {
                let mut fork = vars.fork();
                *body = instrument_stmts(body, &mut fork, loc);
            }
            if let Some(body) = finally {
                let mut fork = vars.fork();
                *body = instrument_stmts(body, &mut fork, loc);
            }
        }
        Stmt::ProcDef { name, params, body, .. } => {
            *body = instrument_proc_body(name, params, body, loc);
        }
        _ => {}
    }
    stmt
}

/// Procedure bodies start a fresh scope: known vars are reset to the formal
/// parameters, the body is bracketed by enter/exit scope calls, and the exit
/// call runs on every path out (normal completion, return, or a raised
/// condition) by wrapping the body in a try/finally.
fn instrument_proc_body(
    name: &str,
    params: &[String],
    body: &[Stmt],
    loc: &SourceLocation,
) -> Vec<Stmt> {
    let mut fresh = KnownVars::from_params(params);
    let inner = instrument_stmts(body, &mut fresh, loc);

    vec![
        Stmt::Trace(TraceCall::EnterScope(name.to_string())),
        Stmt::Try {
            body: inner,
            handlers: Vec::new(),
            finally: Some(vec![Stmt::Trace(TraceCall::ExitScope)]),
            loc: loc.clone(),
        },
    ]
}
