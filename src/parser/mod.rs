//! Source front end for the traced mini language
//!
//! This module transforms source text into a statement tree:
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parser`]: Parsing (tokens → statement tree)
//! - [`ast`]: Statement and expression definitions
//!
//! # Supported language
//!
//! A small brace-delimited, newline-terminated language with exactly the
//! statement kinds the instrumenter distinguishes:
//!
//! - Declarations: `var` / `let` / `const` sections, multiple bindings,
//!   exported (`name*`) and pragma-wrapped (`name {.p.}`) names, `_` discard
//! - Control flow: `if`/`elif`/`else`, `case`/`of`, `for … in`, `while`,
//!   `block`, `try`/`except`/`finally`, `when`
//! - Routines: `proc`, `func`, `method`, `iterator`
//! - Instrumentation wrappers: `debug { … }` and `noDebug { … }`
//!
//! Hand-written recursive descent with precedence climbing for binary
//! operators; no parser generator.

pub mod ast;
pub mod lexer;
pub mod parser;
