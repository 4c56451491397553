// AST definitions for the traced source language

use std::fmt;

/// Source position of a statement or expression
///
/// `line` is 1-based and `col` 0-based; either may be 0 (and `file` empty)
/// when the position is unknown, in which case consumers fall back to the
/// location of the enclosing construct.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub col: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }

    /// A location is usable when it carries both a file and a line.
    pub fn is_known(&self) -> bool {
        self.line > 0 && !self.file.is_empty()
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg, // -x
    Not, // not x
}

/// Compound assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    Add, // +=
    Sub, // -=
    Mul, // *=
}

impl CompoundOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompoundOp::Add => "+=",
            CompoundOp::Sub => "-=",
            CompoundOp::Mul => "*=",
        }
    }
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    Ident(String),
    /// Inclusive range `lo..hi`
    Range {
        lo: Box<Expr>,
        hi: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{}", v),
            Expr::Str(s) => write!(f, "\"{}\"", s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Range { lo, hi } => write!(f, "{}..{}", lo, hi),
            Expr::Unary { op, operand } => match op {
                UnOp::Neg => write!(f, "-{}", operand),
                UnOp::Not => write!(f, "not {}", operand),
            },
            Expr::Binary { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Declaration section keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKeyword {
    Var,
    Let,
    Const,
}

impl DeclKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKeyword::Var => "var",
            DeclKeyword::Let => "let",
            DeclKeyword::Const => "const",
        }
    }
}

/// How a declared name was written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclName {
    /// Plain identifier
    Ident(String),
    /// Exported form `name*`
    Exported(String),
    /// Pragma-wrapped form `name {.pragma.}`
    Pragma(String, Vec<String>),
    /// The discard placeholder `_`
    Discard,
}

impl DeclName {
    /// The identifier this declaration binds, or `None` for `_`.
    pub fn ident(&self) -> Option<&str> {
        match self {
            DeclName::Ident(name) | DeclName::Exported(name) | DeclName::Pragma(name, _) => {
                Some(name)
            }
            DeclName::Discard => None,
        }
    }
}

impl fmt::Display for DeclName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclName::Ident(name) => write!(f, "{}", name),
            DeclName::Exported(name) => write!(f, "{}*", name),
            DeclName::Pragma(name, pragmas) => {
                write!(f, "{} {{.{}.}}", name, pragmas.join(", "))
            }
            DeclName::Discard => write!(f, "_"),
        }
    }
}

/// One binding in a declaration section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: DeclName,
    pub value: Option<Expr>,
}

/// Routine definition keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcKind {
    Proc,
    Func,
    Method,
    Iterator,
}

impl ProcKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcKind::Proc => "proc",
            ProcKind::Func => "func",
            ProcKind::Method => "method",
            ProcKind::Iterator => "iterator",
        }
    }
}

/// One `of` alternative of a case statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfBranch {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// One `except` clause of a try statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub exception: Option<String>,
    pub body: Vec<Stmt>,
}

/// Instrumentation call sites injected by the rewriter.
///
/// These are dedicated node kinds rather than ordinary [`Expr::Call`]s so a
/// user-defined routine that happens to share a writer-API name can never
/// capture them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceCall {
    /// `initDebugLog()`
    Init,
    /// `closeDebugLog()`
    Close,
    /// `debugLog(file, line, col, desc, vars)`; `vars` is the list of local
    /// names whose values are snapshotted at the call site.
    Emit {
        file: String,
        line: u32,
        col: u32,
        desc: String,
        vars: Vec<String>,
    },
    /// `enterScope(name)`
    EnterScope(String),
    /// `exitScope()`
    ExitScope,
}

/// Statements of the traced source language.
///
/// The variants are exactly the kinds the instrumenter distinguishes; any
/// shape outside this set collapses to [`Stmt::Opaque`], which the rewriter
/// copies through untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `var` / `let` / `const` section with one or more bindings
    Decl {
        keyword: DeclKeyword,
        bindings: Vec<Binding>,
        loc: SourceLocation,
    },
    Assign {
        target: String,
        value: Expr,
        loc: SourceLocation,
    },
    CompoundAssign {
        target: String,
        op: CompoundOp,
        value: Expr,
        loc: SourceLocation,
    },
    Echo {
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    ExprStmt {
        expr: Expr,
        loc: SourceLocation,
    },
    Return {
        value: Option<Expr>,
        loc: SourceLocation,
    },
    Break {
        loc: SourceLocation,
    },
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        loc: SourceLocation,
    },
    /// Compile-time conditional; same shape as `if`
    When {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        loc: SourceLocation,
    },
    Case {
        subject: Expr,
        branches: Vec<OfBranch>,
        else_body: Option<Vec<Stmt>>,
        loc: SourceLocation,
    },
    For {
        binders: Vec<String>,
        iterable: Expr,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    Block {
        label: Option<String>,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<Handler>,
        finally: Option<Vec<Stmt>>,
        loc: SourceLocation,
    },
    ProcDef {
        kind: ProcKind,
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    /// `debug { … }`: the instrumentation wrapper
    Debug {
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    /// `noDebug { … }`: splice the body verbatim, never emit inside it
    NoDebug {
        body: Vec<Stmt>,
        loc: SourceLocation,
    },
    /// Generated instrumentation call (never produced by the parser)
    Trace(TraceCall),
    /// Unrecognised subtree carried through as raw text
    Opaque {
        text: String,
        loc: SourceLocation,
    },
}

impl Stmt {
    /// Source location of this statement, if it has one. Generated
    /// [`Stmt::Trace`] nodes carry none.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Stmt::Decl { loc, .. }
            | Stmt::Assign { loc, .. }
            | Stmt::CompoundAssign { loc, .. }
            | Stmt::Echo { loc, .. }
            | Stmt::ExprStmt { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::Break { loc }
            | Stmt::If { loc, .. }
            | Stmt::When { loc, .. }
            | Stmt::Case { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::Block { loc, .. }
            | Stmt::Try { loc, .. }
            | Stmt::ProcDef { loc, .. }
            | Stmt::Debug { loc, .. }
            | Stmt::NoDebug { loc, .. }
            | Stmt::Opaque { loc, .. } => Some(loc),
            Stmt::Trace(_) => None,
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for Stmt {
    /// Canonical single-line rendering. Bodies are elided as `{ ... }`; this
    /// is what the instrumenter turns into the event description.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Decl {
                keyword, bindings, ..
            } => {
                write!(f, "{} ", keyword.as_str())?;
                for (i, b) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", b.name)?;
                    if let Some(value) = &b.value {
                        write!(f, " = {}", value)?;
                    }
                }
                Ok(())
            }
            Stmt::Assign { target, value, .. } => write!(f, "{} = {}", target, value),
            Stmt::CompoundAssign {
                target, op, value, ..
            } => write!(f, "{} {} {}", target, op.symbol(), value),
            Stmt::Echo { args, .. } => {
                write!(f, "echo ")?;
                write_args(f, args)
            }
            Stmt::ExprStmt { expr, .. } => write!(f, "{}", expr),
            Stmt::Return { value, .. } => match value {
                Some(expr) => write!(f, "return {}", expr),
                None => write!(f, "return"),
            },
            Stmt::Break { .. } => write!(f, "break"),
            Stmt::If { branches, .. } => write!(f, "if {} {{ ... }}", branches[0].0),
            Stmt::When { branches, .. } => write!(f, "when {} {{ ... }}", branches[0].0),
            Stmt::Case { subject, .. } => write!(f, "case {} {{ ... }}", subject),
            Stmt::For {
                binders, iterable, ..
            } => write!(f, "for {} in {} {{ ... }}", binders.join(", "), iterable),
            Stmt::While { cond, .. } => write!(f, "while {} {{ ... }}", cond),
            Stmt::Block { label, .. } => match label {
                Some(name) => write!(f, "block {} {{ ... }}", name),
                None => write!(f, "block {{ ... }}"),
            },
            Stmt::Try { .. } => write!(f, "try {{ ... }}"),
            Stmt::ProcDef {
                kind, name, params, ..
            } => write!(f, "{} {}({}) {{ ... }}", kind.as_str(), name, params.join(", ")),
            Stmt::Debug { .. } => write!(f, "debug {{ ... }}"),
            Stmt::NoDebug { .. } => write!(f, "noDebug {{ ... }}"),
            Stmt::Trace(call) => match call {
                TraceCall::Init => write!(f, "initDebugLog()"),
                TraceCall::Close => write!(f, "closeDebugLog()"),
                TraceCall::Emit { desc, .. } => write!(f, "debugLog(\"{}\")", desc),
                TraceCall::EnterScope(name) => write!(f, "enterScope(\"{}\")", name),
                TraceCall::ExitScope => write!(f, "exitScope()"),
            },
            Stmt::Opaque { text, .. } => write!(f, "{}", text),
        }
    }
}

/// A parsed source file
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}
