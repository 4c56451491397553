//! Evaluator for (instrumented) statement trees
//!
//! Executes the mini language directly over the AST so an instrumented
//! program can actually produce a trace: generated [`TraceCall`] nodes are
//! mapped onto a [`TraceWriter`], everything else behaves as a small
//! strict, dynamically-checked language with integers, strings, and bools.
//!
//! Scoping: one frame per lexical body, pushed and popped around each
//! block/branch/loop iteration; procedure calls swap the whole frame stack
//! so a body sees exactly its parameters and own locals.

use crate::parser::ast::*;
use crate::runtime::{safe_repr, TraceWriter, NO_REPR};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// Runtime values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    /// Inclusive range, the result of `a..b`
    Range(i64, i64),
    /// Result of statements and value-less returns
    Unit,
    /// A defined routine referenced as a value (`var g = f`). Routines have
    /// no textual form; captured ones surface as `<no representation>`.
    Routine(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Range(_, _) => "range",
            Value::Unit => "unit",
            Value::Routine(_) => "routine",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Range(lo, hi) => write!(f, "{}..{}", lo, hi),
            Value::Unit => Ok(()),
            Value::Routine(_) => Ok(()),
        }
    }
}

/// Runtime errors
#[derive(Debug, Clone)]
pub enum EvalError {
    UndefinedVariable {
        name: String,
        loc: SourceLocation,
    },
    UnknownProc {
        name: String,
        loc: SourceLocation,
    },
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
        loc: SourceLocation,
    },
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
        loc: SourceLocation,
    },
    DivisionByZero {
        loc: SourceLocation,
    },
    Unsupported {
        message: String,
        loc: SourceLocation,
    },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedVariable { name, loc } => {
                write!(f, "undefined variable '{}' at line {}", name, loc.line)
            }
            EvalError::UnknownProc { name, loc } => {
                write!(f, "unknown routine '{}' at line {}", name, loc.line)
            }
            EvalError::ArgumentCount {
                name,
                expected,
                got,
                loc,
            } => write!(
                f,
                "routine '{}' expects {} argument(s), got {} at line {}",
                name, expected, got, loc.line
            ),
            EvalError::TypeMismatch { expected, got, loc } => {
                write!(
                    f,
                    "type mismatch at line {}: expected {}, got {}",
                    loc.line, expected, got
                )
            }
            EvalError::DivisionByZero { loc } => {
                write!(f, "division by zero at line {}", loc.line)
            }
            EvalError::Unsupported { message, loc } => {
                write!(f, "unsupported at line {}: {}", loc.line, message)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// How a statement finished.
enum Flow {
    Normal,
    Break,
    Return(Value),
}

#[derive(Debug, Clone)]
struct ProcVal {
    params: Vec<String>,
    body: Vec<Stmt>,
}

/// Tree-walking evaluator writing trace events through `writer`.
pub struct Evaluator<'w> {
    writer: &'w mut TraceWriter,
    frames: Vec<FxHashMap<String, Value>>,
    procs: FxHashMap<String, ProcVal>,
    output: Vec<String>,
}

impl<'w> Evaluator<'w> {
    pub fn new(writer: &'w mut TraceWriter) -> Self {
        Self {
            writer,
            frames: vec![FxHashMap::default()],
            procs: FxHashMap::default(),
            output: Vec::new(),
        }
    }

    /// Everything `echo` printed, one line per call.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Execute a statement list at module scope.
    pub fn run(&mut self, stmts: &[Stmt]) -> Result<(), EvalError> {
        self.exec_stmts(stmts)?;
        Ok(())
    }

    // --- variable frames ---

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    fn declare(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
    }

    fn assign(&mut self, name: &str, value: Value, loc: &SourceLocation) -> Result<(), EvalError> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return Ok(());
            }
        }
        Err(EvalError::UndefinedVariable {
            name: name.to_string(),
            loc: loc.clone(),
        })
    }

    fn in_scope(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Flow, EvalError>,
    ) -> Result<Flow, EvalError> {
        self.frames.push(FxHashMap::default());
        let result = f(self);
        self.frames.pop();
        result
    }

    // --- statements ---

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> Result<Flow, EvalError> {
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, EvalError> {
        match stmt {
            Stmt::Trace(call) => {
                self.exec_trace_call(call);
                Ok(Flow::Normal)
            }
            Stmt::Decl { bindings, .. } => {
                for binding in bindings {
                    let value = match &binding.value {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Int(0),
                    };
                    if let Some(name) = binding.name.ident() {
                        self.declare(name, value);
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Assign { target, value, loc } => {
                let value = self.eval(value)?;
                self.assign(target, value, loc)?;
                Ok(Flow::Normal)
            }
            Stmt::CompoundAssign {
                target,
                op,
                value,
                loc,
            } => {
                let rhs = self.eval(value)?;
                let current = self
                    .lookup(target)
                    .cloned()
                    .ok_or_else(|| EvalError::UndefinedVariable {
                        name: target.clone(),
                        loc: loc.clone(),
                    })?;
                let bin_op = match op {
                    CompoundOp::Add => BinOp::Add,
                    CompoundOp::Sub => BinOp::Sub,
                    CompoundOp::Mul => BinOp::Mul,
                };
                let value = apply_binop(bin_op, current, rhs, loc)?;
                self.assign(target, value, loc)?;
                Ok(Flow::Normal)
            }
            Stmt::Echo { args, .. } => {
                let mut line = String::new();
                for arg in args {
                    let value = self.eval(arg)?;
                    line.push_str(&safe_repr(&value));
                }
                self.output.push(line);
                Ok(Flow::Normal)
            }
            Stmt::ExprStmt { expr, .. } => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Unit,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::If {
                branches, else_body, ..
            }
            | Stmt::When {
                branches, else_body, ..
            } => {
                for (cond, body) in branches {
                    if self.eval_bool(cond, stmt)? {
                        return self.in_scope(|this| this.exec_stmts(body));
                    }
                }
                if let Some(body) = else_body {
                    return self.in_scope(|this| this.exec_stmts(body));
                }
                Ok(Flow::Normal)
            }
            Stmt::Case {
                subject,
                branches,
                else_body,
                ..
            } => {
                let subject = self.eval(subject)?;
                for branch in branches {
                    for value in &branch.values {
                        if self.case_matches(&subject, value)? {
                            return self.in_scope(|this| this.exec_stmts(&branch.body));
                        }
                    }
                }
                if let Some(body) = else_body {
                    return self.in_scope(|this| this.exec_stmts(body));
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                binders,
                iterable,
                body,
                loc,
            } => {
                if binders.len() != 1 {
                    return Err(EvalError::Unsupported {
                        message: "multiple loop variables".to_string(),
                        loc: loc.clone(),
                    });
                }
                let Value::Range(lo, hi) = self.eval(iterable)? else {
                    return Err(EvalError::TypeMismatch {
                        expected: "range",
                        got: "non-range",
                        loc: loc.clone(),
                    });
                };
                for i in lo..=hi {
                    let flow = self.in_scope(|this| {
                        this.declare(&binders[0], Value::Int(i));
                        this.exec_stmts(body)
                    })?;
                    match flow {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::While { cond, body, .. } => {
                while self.eval_bool(cond, stmt)? {
                    let flow = self.in_scope(|this| this.exec_stmts(body))?;
                    match flow {
                        Flow::Normal => {}
                        Flow::Break => break,
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Block { body, .. } => {
                let flow = self.in_scope(|this| this.exec_stmts(body))?;
                // `break` targets the enclosing block and stops there
                match flow {
                    Flow::Break => Ok(Flow::Normal),
                    other => Ok(other),
                }
            }
            Stmt::Try {
                body,
                handlers,
                finally,
                ..
            } => self.exec_try(body, handlers, finally.as_deref()),
            Stmt::ProcDef {
                name, params, body, ..
            } => {
                self.procs.insert(
                    name.clone(),
                    ProcVal {
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
                Ok(Flow::Normal)
            }
            // Leftover wrappers execute as plain blocks
            Stmt::Debug { body, .. } | Stmt::NoDebug { body, .. } => {
                self.in_scope(|this| this.exec_stmts(body))
            }
            Stmt::Opaque { .. } => Ok(Flow::Normal),
        }
    }

    fn exec_try(
        &mut self,
        body: &[Stmt],
        handlers: &[Handler],
        finally: Option<&[Stmt]>,
    ) -> Result<Flow, EvalError> {
        let outcome = self.in_scope(|this| this.exec_stmts(body));

        let outcome = match outcome {
            Err(_) if !handlers.is_empty() => {
                self.in_scope(|this| this.exec_stmts(&handlers[0].body))
            }
            other => other,
        };

        // The finally body always runs, whatever the body did; a non-normal
        // finally takes over, even after an error
        if let Some(final_body) = finally {
            let final_flow = self.in_scope(|this| this.exec_stmts(final_body))?;
            match final_flow {
                Flow::Normal => outcome,
                other => Ok(other),
            }
        } else {
            outcome
        }
    }

    fn exec_trace_call(&mut self, call: &TraceCall) {
        match call {
            // The writer is constructed by whoever runs the evaluator, so
            // init has nothing left to do here.
            TraceCall::Init => {}
            TraceCall::Close => self.writer.close(),
            TraceCall::Emit {
                file,
                line,
                col,
                desc,
                vars,
            } => {
                let mut captured = BTreeMap::new();
                for name in vars {
                    if let Some(value) = self.lookup(name) {
                        let repr = match value {
                            Value::Routine(_) => NO_REPR.to_string(),
                            other => safe_repr(other),
                        };
                        captured.insert(name.clone(), repr);
                    }
                }
                self.writer.emit(file, *line, *col, desc, captured);
            }
            TraceCall::EnterScope(name) => self.writer.enter_scope(name),
            TraceCall::ExitScope => self.writer.exit_scope(),
        }
    }

    // --- expressions ---

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Ident(name) => {
                if let Some(value) = self.lookup(name) {
                    return Ok(value.clone());
                }
                // A routine name used as a value; locals shadow routines
                if self.procs.contains_key(name) {
                    return Ok(Value::Routine(name.clone()));
                }
                Err(EvalError::UndefinedVariable {
                    name: name.clone(),
                    loc: SourceLocation::default(),
                })
            }
            Expr::Range { lo, hi } => {
                let lo = self.eval_int(lo)?;
                let hi = self.eval_int(hi)?;
                Ok(Value::Range(lo, hi))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand)?;
                match (op, value) {
                    (UnOp::Neg, Value::Int(v)) => Ok(Value::Int(-v)),
                    (UnOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (_, value) => Err(EvalError::TypeMismatch {
                        expected: "int or bool",
                        got: value.type_name(),
                        loc: SourceLocation::default(),
                    }),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                apply_binop(*op, left, right, &SourceLocation::default())
            }
            Expr::Call { name, args } => self.call_proc(name, args),
        }
    }

    fn eval_int(&mut self, expr: &Expr) -> Result<i64, EvalError> {
        match self.eval(expr)? {
            Value::Int(v) => Ok(v),
            other => Err(EvalError::TypeMismatch {
                expected: "int",
                got: other.type_name(),
                loc: SourceLocation::default(),
            }),
        }
    }

    fn eval_bool(&mut self, expr: &Expr, stmt: &Stmt) -> Result<bool, EvalError> {
        match self.eval(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::TypeMismatch {
                expected: "bool",
                got: other.type_name(),
                loc: stmt.location().cloned().unwrap_or_default(),
            }),
        }
    }

    fn case_matches(&mut self, subject: &Value, pattern: &Expr) -> Result<bool, EvalError> {
        let value = self.eval(pattern)?;
        match (&value, subject) {
            (Value::Range(lo, hi), Value::Int(v)) => Ok(v >= lo && v <= hi),
            _ => Ok(&value == subject),
        }
    }

    fn call_proc(&mut self, name: &str, args: &[Expr]) -> Result<Value, EvalError> {
        let proc = self
            .procs
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownProc {
                name: name.to_string(),
                loc: SourceLocation::default(),
            })?;

        if proc.params.len() != args.len() {
            return Err(EvalError::ArgumentCount {
                name: name.to_string(),
                expected: proc.params.len(),
                got: args.len(),
                loc: SourceLocation::default(),
            });
        }

        let mut frame = FxHashMap::default();
        for (param, arg) in proc.params.iter().zip(args) {
            frame.insert(param.clone(), self.eval(arg)?);
        }

        // The body sees its parameters and locals, nothing from the caller
        let saved = std::mem::replace(&mut self.frames, vec![frame]);
        let flow = self.exec_stmts(&proc.body);
        self.frames = saved;

        match flow? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Unit),
        }
    }
}

fn apply_binop(
    op: BinOp,
    left: Value,
    right: Value,
    loc: &SourceLocation,
) -> Result<Value, EvalError> {
    use Value::{Bool, Int, Str};

    let value = match (op, &left, &right) {
        (BinOp::Add, Int(a), Int(b)) => Int(a.wrapping_add(*b)),
        (BinOp::Add, Str(a), Str(b)) => Str(format!("{}{}", a, b)),
        (BinOp::Sub, Int(a), Int(b)) => Int(a.wrapping_sub(*b)),
        (BinOp::Mul, Int(a), Int(b)) => Int(a.wrapping_mul(*b)),
        (BinOp::Div, Int(a), Int(b)) => {
            if *b == 0 {
                return Err(EvalError::DivisionByZero { loc: loc.clone() });
            }
            Int(a / b)
        }
        (BinOp::Mod, Int(a), Int(b)) => {
            if *b == 0 {
                return Err(EvalError::DivisionByZero { loc: loc.clone() });
            }
            Int(a % b)
        }
        (BinOp::Eq, a, b) => Bool(a == b),
        (BinOp::Ne, a, b) => Bool(a != b),
        (BinOp::Lt, Int(a), Int(b)) => Bool(a < b),
        (BinOp::Le, Int(a), Int(b)) => Bool(a <= b),
        (BinOp::Gt, Int(a), Int(b)) => Bool(a > b),
        (BinOp::Ge, Int(a), Int(b)) => Bool(a >= b),
        (BinOp::And, Bool(a), Bool(b)) => Bool(*a && *b),
        (BinOp::Or, Bool(a), Bool(b)) => Bool(*a || *b),
        _ => {
            return Err(EvalError::TypeMismatch {
                expected: "matching operand types",
                got: left.type_name(),
                loc: loc.clone(),
            });
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::Parser;

    fn run_plain(source: &str) -> Vec<String> {
        let program = Parser::new(source, "t.src")
            .expect("lexing failed")
            .parse_program()
            .expect("parsing failed");
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = TraceWriter::create(Some(&dir.path().join("run.trace")));
        let mut evaluator = Evaluator::new(&mut writer);
        evaluator.run(&program.stmts).expect("evaluation failed");
        evaluator.output().to_vec()
    }

    #[test]
    fn arithmetic_and_echo() {
        assert_eq!(run_plain("var x = 5\nvar y = x * 2 + 1\necho y"), vec!["11"]);
    }

    #[test]
    fn while_loop_with_break() {
        let output = run_plain("var n = 0\nwhile true {\n n += 1\n if n == 3 { break }\n}\necho n");
        assert_eq!(output, vec!["3"]);
    }

    #[test]
    fn proc_call_returns_value() {
        let output = run_plain("proc double(n) {\n return n * 2\n}\necho double(21)");
        assert_eq!(output, vec!["42"]);
    }

    #[test]
    fn proc_body_cannot_see_caller_locals() {
        let program = Parser::new("var secret = 1\nproc peek() {\n return secret\n}\necho peek()", "t.src")
            .expect("lexing failed")
            .parse_program()
            .expect("parsing failed");
        let dir = tempfile::tempdir().expect("tempdir");
        let mut writer = TraceWriter::create(Some(&dir.path().join("run.trace")));
        let mut evaluator = Evaluator::new(&mut writer);
        assert!(evaluator.run(&program.stmts).is_err());
    }

    #[test]
    fn case_selects_matching_branch() {
        let output = run_plain(
            "var x = 2\ncase x {\n of 1 { echo \"one\" }\n of 2, 3 { echo \"few\" }\n else { echo \"many\" }\n}",
        );
        assert_eq!(output, vec!["few"]);
    }

    #[test]
    fn routine_valued_locals_capture_as_no_representation() {
        use crate::instrument::instrument_region;
        use crate::trace::load;

        let program = Parser::new("proc f(n) {\n return n\n}\nvar g = f\necho 1", "t.src")
            .expect("lexing failed")
            .parse_program()
            .expect("parsing failed");
        let instrumented =
            instrument_region(&program.stmts, &SourceLocation::new("t.src", 1, 0));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.trace");
        let mut writer = TraceWriter::create(Some(&path));
        let mut evaluator = Evaluator::new(&mut writer);
        evaluator.run(&instrumented).expect("evaluation failed");

        let events = load(&path);
        let capture = events
            .iter()
            .find(|e| e.desc == "echo 1")
            .expect("echo event missing");
        assert_eq!(capture.vars.get("g").map(String::as_str), Some(NO_REPR));
    }

    #[test]
    fn finally_runs_after_handler() {
        let output = run_plain(
            "try {\n echo \"in\"\n echo missing\n} except {\n echo \"caught\"\n} finally {\n echo \"done\"\n}",
        );
        assert_eq!(output, vec!["in", "caught", "done"]);
    }
}
