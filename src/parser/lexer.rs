//! Lexer (tokenizer) for the traced source language
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the
//! parser. Newlines are significant (they terminate statements) and are kept
//! as tokens; `#` line comments are skipped.

use std::fmt;

/// Token kinds. Keywords are recognised eagerly; everything else that looks
/// like a word becomes [`TokenKind::Ident`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    StringLiteral(String),

    // Identifiers
    Ident(String),

    // Declaration keywords
    Var,
    Let,
    Const,

    // Control flow keywords
    If,
    Elif,
    Else,
    Case,
    Of,
    For,
    In,
    While,
    Block,
    Try,
    Except,
    Finally,
    When,
    Return,
    Break,

    // Routine keywords
    Proc,
    Func,
    Method,
    Iterator,

    // Instrumentation keywords
    Debug,
    NoDebug,

    // Builtin statement keywords
    Echo,

    // Literal keywords
    True,
    False,

    // Word operators
    And,
    Or,
    Not,

    // Operators
    Plus,     // +
    Minus,    // -
    Star,     // *
    Slash,    // /
    Percent,  // %
    EqEq,     // ==
    NotEq,    // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=
    Eq,       // =
    PlusEq,   // +=
    MinusEq,  // -=
    StarEq,   // *=
    DotDot,   // ..

    // Punctuation
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    PragmaOpen, // {.
    PragmaClose, // .}
    Comma,      // ,
    Semicolon,  // ;

    // Statement separator
    Newline,

    // End of file
    Eof,
}

/// A token plus the 1-based line and 0-based column it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
}

/// Lexer error
#[derive(Debug)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lex error at line {}, column {}: {}",
            self.line, self.col, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// Hand-rolled character lexer
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let at_end = token.kind == TokenKind::Eof;
            tokens.push(token);
            if at_end {
                break;
            }
        }

        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn token(&self, kind: TokenKind, line: u32, col: u32) -> Token {
        Token { kind, line, col }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        // Skip spaces, tabs and comments; newlines are tokens of their own
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }

        let line = self.line;
        let col = self.col;

        let Some(c) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, line, col));
        };

        if c == '\n' {
            self.advance();
            return Ok(self.token(TokenKind::Newline, line, col));
        }

        if c.is_ascii_digit() {
            return self.lex_number(line, col);
        }

        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_word(line, col));
        }

        if c == '"' {
            return self.lex_string(line, col);
        }

        self.advance();
        let two = |lexer: &mut Self, kind: TokenKind| {
            lexer.advance();
            kind
        };

        let kind = match c {
            '+' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::PlusEq)
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::MinusEq)
                } else {
                    TokenKind::Minus
                }
            }
            '*' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::StarEq)
                } else {
                    TokenKind::Star
                }
            }
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '=' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::EqEq)
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::NotEq)
                } else {
                    return Err(LexError {
                        message: "unexpected '!'".to_string(),
                        line,
                        col,
                    });
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::Le)
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    two(self, TokenKind::Ge)
                } else {
                    TokenKind::Gt
                }
            }
            '.' => {
                if self.peek() == Some('.') {
                    two(self, TokenKind::DotDot)
                } else if self.peek() == Some('}') {
                    two(self, TokenKind::PragmaClose)
                } else {
                    return Err(LexError {
                        message: "unexpected '.'".to_string(),
                        line,
                        col,
                    });
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => {
                if self.peek() == Some('.') {
                    two(self, TokenKind::PragmaOpen)
                } else {
                    TokenKind::LBrace
                }
            }
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            other => {
                return Err(LexError {
                    message: format!("unexpected character '{}'", other),
                    line,
                    col,
                });
            }
        };

        Ok(self.token(kind, line, col))
    }

    fn lex_number(&mut self, line: u32, col: u32) -> Result<Token, LexError> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.advance();
            } else if c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let value = digits.parse::<i64>().map_err(|_| LexError {
            message: format!("invalid integer literal '{}'", digits),
            line,
            col,
        })?;

        Ok(self.token(TokenKind::IntLiteral(value), line, col))
    }

    fn lex_word(&mut self, line: u32, col: u32) -> Token {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match word.as_str() {
            "var" => TokenKind::Var,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "case" => TokenKind::Case,
            "of" => TokenKind::Of,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "block" => TokenKind::Block,
            "try" => TokenKind::Try,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "when" => TokenKind::When,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "proc" => TokenKind::Proc,
            "func" => TokenKind::Func,
            "method" => TokenKind::Method,
            "iterator" => TokenKind::Iterator,
            "debug" => TokenKind::Debug,
            "noDebug" => TokenKind::NoDebug,
            "echo" => TokenKind::Echo,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => TokenKind::Ident(word),
        };

        self.token(kind, line, col)
    }

    fn lex_string(&mut self, line: u32, col: u32) -> Result<Token, LexError> {
        self.advance(); // opening quote
        let mut text = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => match self.advance() {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    other => {
                        return Err(LexError {
                            message: format!("invalid escape '\\{}'", other.unwrap_or(' ')),
                            line,
                            col,
                        });
                    }
                },
                Some(c) => text.push(c),
                None => {
                    return Err(LexError {
                        message: "unterminated string literal".to_string(),
                        line,
                        col,
                    });
                }
            }
        }

        Ok(self.token(TokenKind::StringLiteral(text), line, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_declaration() {
        assert_eq!(
            kinds("var x = 10"),
            vec![
                TokenKind::Var,
                TokenKind::Ident("x".to_string()),
                TokenKind::Eq,
                TokenKind::IntLiteral(10),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_range_after_integer() {
        assert_eq!(
            kinds("1..3"),
            vec![
                TokenKind::IntLiteral(1),
                TokenKind::DotDot,
                TokenKind::IntLiteral(3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_pragma_brackets() {
        assert_eq!(
            kinds("x {.threadvar.}"),
            vec![
                TokenKind::Ident("x".to_string()),
                TokenKind::PragmaOpen,
                TokenKind::Ident("threadvar".to_string()),
                TokenKind::PragmaClose,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_numbers() {
        let tokens = Lexer::new("var x = 1\nx = 2").tokenize().expect("tokenize");
        let second_x = tokens
            .iter()
            .find(|t| t.line == 2)
            .expect("no token on line 2");
        assert_eq!(second_x.kind, TokenKind::Ident("x".to_string()));
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("# a comment\necho 1"),
            vec![
                TokenKind::Newline,
                TokenKind::Echo,
                TokenKind::IntLiteral(1),
                TokenKind::Eof,
            ]
        );
    }
}
