//! Recursive descent parser for the traced source language
//!
//! Tokens → statement tree. Statements are newline- or semicolon-terminated;
//! bodies are brace-delimited. Binary expressions use precedence climbing.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use std::fmt;

/// Parser error type
#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at line {}, column {}: {}",
            self.location.line, self.location.col, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Recursive descent parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    file: String,
}

impl Parser {
    pub fn new(source: &str, file: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source).tokenize().map_err(|err| ParseError {
            message: err.message.clone(),
            location: SourceLocation::new(file, err.line, err.col),
        })?;
        Ok(Self {
            tokens,
            position: 0,
            file: file.to_string(),
        })
    }

    /// Parse the entire source file as a statement list.
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        self.skip_separators();
        while !self.at_end() {
            program.stmts.push(self.parse_statement()?);
            self.skip_separators();
        }

        Ok(program)
    }

    // --- token plumbing ---

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.position].kind
    }

    fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + offset).map(|t| &t.kind)
    }

    fn current_location(&self) -> SourceLocation {
        let token = &self.tokens[self.position];
        SourceLocation::new(&self.file, token.line, token.col)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.position].kind.clone();
        if !self.at_end() {
            self.position += 1;
        }
        kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String, ParseError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            location: self.current_location(),
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        )
    }

    // --- statements ---

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        match self.peek().clone() {
            TokenKind::Var => self.parse_decl(DeclKeyword::Var, loc),
            TokenKind::Let => self.parse_decl(DeclKeyword::Let, loc),
            TokenKind::Const => self.parse_decl(DeclKeyword::Const, loc),
            TokenKind::If => self.parse_branch(false, loc),
            TokenKind::When => self.parse_branch(true, loc),
            TokenKind::Case => self.parse_case(loc),
            TokenKind::For => self.parse_for(loc),
            TokenKind::While => self.parse_while(loc),
            TokenKind::Block => self.parse_block_stmt(loc),
            TokenKind::Try => self.parse_try(loc),
            TokenKind::Proc => self.parse_proc(ProcKind::Proc, loc),
            TokenKind::Func => self.parse_proc(ProcKind::Func, loc),
            TokenKind::Method => self.parse_proc(ProcKind::Method, loc),
            TokenKind::Iterator => self.parse_proc(ProcKind::Iterator, loc),
            TokenKind::Debug => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Stmt::Debug { body, loc })
            }
            TokenKind::NoDebug => {
                self.advance();
                let body = self.parse_block()?;
                Ok(Stmt::NoDebug { body, loc })
            }
            TokenKind::Echo => {
                self.advance();
                let mut args = Vec::new();
                if !self.at_statement_end() {
                    args.push(self.parse_expression()?);
                    while self.eat(&TokenKind::Comma) {
                        args.push(self.parse_expression()?);
                    }
                }
                Ok(Stmt::Echo { args, loc })
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Stmt::Return { value, loc })
            }
            TokenKind::Break => {
                self.advance();
                Ok(Stmt::Break { loc })
            }
            TokenKind::Ident(name) => {
                // Assignment needs one token of lookahead; anything else is
                // an expression statement.
                match self.peek_at(1) {
                    Some(TokenKind::Eq) => {
                        self.advance();
                        self.advance();
                        let value = self.parse_expression()?;
                        Ok(Stmt::Assign {
                            target: name,
                            value,
                            loc,
                        })
                    }
                    Some(TokenKind::PlusEq) | Some(TokenKind::MinusEq)
                    | Some(TokenKind::StarEq) => {
                        self.advance();
                        let op = match self.advance() {
                            TokenKind::PlusEq => CompoundOp::Add,
                            TokenKind::MinusEq => CompoundOp::Sub,
                            _ => CompoundOp::Mul,
                        };
                        let value = self.parse_expression()?;
                        Ok(Stmt::CompoundAssign {
                            target: name,
                            op,
                            value,
                            loc,
                        })
                    }
                    _ => {
                        let expr = self.parse_expression()?;
                        Ok(Stmt::ExprStmt { expr, loc })
                    }
                }
            }
            _ => {
                let expr = self.parse_expression()?;
                Ok(Stmt::ExprStmt { expr, loc })
            }
        }
    }

    /// Parse `{ … }` into a statement list.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace, "expected '{'")?;
        let mut stmts = Vec::new();
        self.skip_separators();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error("unexpected end of input inside block"));
            }
            stmts.push(self.parse_statement()?);
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace, "expected '}'")?;
        Ok(stmts)
    }

    fn parse_decl(
        &mut self,
        keyword: DeclKeyword,
        loc: SourceLocation,
    ) -> Result<Stmt, ParseError> {
        self.advance(); // keyword
        let mut bindings = Vec::new();

        loop {
            let name = self.parse_decl_name()?;
            let value = if self.eat(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            bindings.push(Binding { name, value });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Stmt::Decl {
            keyword,
            bindings,
            loc,
        })
    }

    /// Declared names come in four shapes: `name`, `name*` (exported),
    /// `name {.pragma.}`, and the discard placeholder `_`.
    fn parse_decl_name(&mut self) -> Result<DeclName, ParseError> {
        let name = self.expect_ident("expected a name in declaration")?;
        if name == "_" {
            return Ok(DeclName::Discard);
        }

        if self.eat(&TokenKind::Star) {
            return Ok(DeclName::Exported(name));
        }

        if self.eat(&TokenKind::PragmaOpen) {
            let mut pragmas = Vec::new();
            pragmas.push(self.expect_ident("expected pragma name")?);
            while self.eat(&TokenKind::Comma) {
                pragmas.push(self.expect_ident("expected pragma name")?);
            }
            self.expect(&TokenKind::PragmaClose, "expected '.}'")?;
            return Ok(DeclName::Pragma(name, pragmas));
        }

        Ok(DeclName::Ident(name))
    }

    /// `if`/`when` share a shape: condition + body, `elif` chain, `else`.
    fn parse_branch(&mut self, compile_time: bool, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // if / when
        let mut branches = Vec::new();

        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        branches.push((cond, body));

        let mut else_body = None;
        loop {
            self.skip_separators();
            if self.eat(&TokenKind::Elif) {
                let cond = self.parse_expression()?;
                let body = self.parse_block()?;
                branches.push((cond, body));
            } else if self.eat(&TokenKind::Else) {
                else_body = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }

        if compile_time {
            Ok(Stmt::When {
                branches,
                else_body,
                loc,
            })
        } else {
            Ok(Stmt::If {
                branches,
                else_body,
                loc,
            })
        }
    }

    fn parse_case(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // case
        let subject = self.parse_expression()?;
        self.expect(&TokenKind::LBrace, "expected '{' after case subject")?;

        let mut branches = Vec::new();
        let mut else_body = None;
        self.skip_separators();
        while !self.check(&TokenKind::RBrace) {
            if self.eat(&TokenKind::Of) {
                let mut values = Vec::new();
                values.push(self.parse_expression()?);
                while self.eat(&TokenKind::Comma) {
                    values.push(self.parse_expression()?);
                }
                let body = self.parse_block()?;
                branches.push(OfBranch { values, body });
            } else if self.eat(&TokenKind::Else) {
                else_body = Some(self.parse_block()?);
            } else {
                return Err(self.error("expected 'of' or 'else' in case body"));
            }
            self.skip_separators();
        }
        self.expect(&TokenKind::RBrace, "expected '}' after case branches")?;

        Ok(Stmt::Case {
            subject,
            branches,
            else_body,
            loc,
        })
    }

    fn parse_for(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // for
        let mut binders = Vec::new();
        binders.push(self.expect_ident("expected loop variable after 'for'")?);
        while self.eat(&TokenKind::Comma) {
            binders.push(self.expect_ident("expected loop variable")?);
        }
        self.expect(&TokenKind::In, "expected 'in' after loop variables")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;

        Ok(Stmt::For {
            binders,
            iterable,
            body,
            loc,
        })
    }

    fn parse_while(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // while
        let cond = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { cond, body, loc })
    }

    fn parse_block_stmt(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // block
        let label = match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let body = self.parse_block()?;
        Ok(Stmt::Block { label, body, loc })
    }

    fn parse_try(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // try
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        let mut finally = None;
        loop {
            self.skip_separators();
            if self.eat(&TokenKind::Except) {
                let exception = match self.peek().clone() {
                    TokenKind::Ident(name) => {
                        self.advance();
                        Some(name)
                    }
                    _ => None,
                };
                let body = self.parse_block()?;
                handlers.push(Handler { exception, body });
            } else if self.eat(&TokenKind::Finally) {
                finally = Some(self.parse_block()?);
                break;
            } else {
                break;
            }
        }

        Ok(Stmt::Try {
            body,
            handlers,
            finally,
            loc,
        })
    }

    fn parse_proc(&mut self, kind: ProcKind, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.advance(); // proc / func / method / iterator
        let name = self.expect_ident("expected routine name")?;
        self.expect(&TokenKind::LParen, "expected '(' after routine name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            params.push(self.expect_ident("expected parameter name")?);
            while self.eat(&TokenKind::Comma) {
                params.push(self.expect_ident("expected parameter name")?);
            }
        }
        self.expect(&TokenKind::RParen, "expected ')' after parameters")?;

        let body = self.parse_block()?;
        Ok(Stmt::ProcDef {
            kind,
            name,
            params,
            body,
            loc,
        })
    }

    // --- expressions ---

    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_range()
    }

    fn parse_range(&mut self) -> Result<Expr, ParseError> {
        let lo = self.parse_or()?;
        if self.eat(&TokenKind::DotDot) {
            let hi = self.parse_or()?;
            return Ok(Expr::Range {
                lo: Box::new(lo),
                hi: Box::new(hi),
            });
        }
        Ok(lo)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::Ne,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Not => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                Ok(Expr::Int(value))
            }
            TokenKind::StringLiteral(text) => {
                self.advance();
                Ok(Expr::Str(text))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        args.push(self.parse_expression()?);
                        while self.eat(&TokenKind::Comma) {
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.expect(&TokenKind::RParen, "expected ')' after call arguments")?;
                    return Ok(Expr::Call { name, args });
                }
                Ok(Expr::Ident(name))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error("expected an expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        Parser::new(source, "test.src")
            .expect("lexing failed")
            .parse_program()
            .expect("parsing failed")
    }

    #[test]
    fn parses_declaration_section() {
        let program = parse("var x = 10, y* = 2, _ = 3");
        assert_eq!(program.stmts.len(), 1);
        let Stmt::Decl { bindings, .. } = &program.stmts[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(bindings.len(), 3);
        assert_eq!(bindings[0].name, DeclName::Ident("x".to_string()));
        assert_eq!(bindings[1].name, DeclName::Exported("y".to_string()));
        assert_eq!(bindings[2].name, DeclName::Discard);
    }

    #[test]
    fn parses_pragma_wrapped_binding() {
        let program = parse("var counter {.threadvar.} = 0");
        let Stmt::Decl { bindings, .. } = &program.stmts[0] else {
            panic!("expected a declaration");
        };
        assert_eq!(
            bindings[0].name,
            DeclName::Pragma("counter".to_string(), vec!["threadvar".to_string()])
        );
    }

    #[test]
    fn parses_for_over_range() {
        let program = parse("for i in 1..3 { echo i }");
        let Stmt::For {
            binders, iterable, body, ..
        } = &program.stmts[0]
        else {
            panic!("expected a for loop");
        };
        assert_eq!(binders, &vec!["i".to_string()]);
        assert!(matches!(iterable, Expr::Range { .. }));
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn parses_if_elif_else() {
        let program = parse("if x > 1 { echo 1 } elif x > 0 { echo 2 } else { echo 3 }");
        let Stmt::If {
            branches, else_body, ..
        } = &program.stmts[0]
        else {
            panic!("expected an if");
        };
        assert_eq!(branches.len(), 2);
        assert!(else_body.is_some());
    }

    #[test]
    fn parses_nested_debug_blocks() {
        let program = parse("debug {\n  var s = 0\n  noDebug {\n    s += 1\n  }\n  echo s\n}");
        let Stmt::Debug { body, .. } = &program.stmts[0] else {
            panic!("expected a debug block");
        };
        assert_eq!(body.len(), 3);
        assert!(matches!(body[1], Stmt::NoDebug { .. }));
    }

    #[test]
    fn statement_locations_are_line_accurate() {
        let program = parse("var x = 10\nx = x + 1");
        let locs: Vec<u32> = program
            .stmts
            .iter()
            .map(|s| s.location().expect("missing location").line)
            .collect();
        assert_eq!(locs, vec![1, 2]);
    }

    #[test]
    fn renders_statements_on_one_line() {
        let program = parse("var x = 10\nx = x + 1\nfor i in 1..3 { echo i }");
        let rendered: Vec<String> = program.stmts.iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered[0], "var x = 10");
        assert_eq!(rendered[1], "x = x + 1");
        assert_eq!(rendered[2], "for i in 1..3 { ... }");
    }

    #[test]
    fn rejects_unterminated_block() {
        let result = Parser::new("while true { echo 1", "test.src")
            .expect("lexing failed")
            .parse_program();
        assert!(result.is_err());
    }
}
