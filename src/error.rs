use std::{io, result};
use thiserror::Error;

use crate::token::Token;

pub type Result<T> = result::Result<T, Error>;

/// Any failure the pipeline can surface to a host.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lexical(#[from] LexError),
    #[error(transparent)]
    Syntactic(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Error {
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Lexical(e) => Some(e.line()),
            Error::Syntactic(e) => Some(e.token().line),
            Error::Runtime(e) => e.line(),
        }
    }

    pub fn is_runtime_error(&self) -> bool {
        matches!(self, Error::Runtime(_))
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LexError {
    #[error("[line {line}] Error: Unexpected character '{character}'.")]
    UnexpectedCharacter { line: usize, character: char },
    #[error("[line {line}] Error: Unterminated string.")]
    UnterminatedString { line: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnexpectedCharacter { line, .. } | LexError::UnterminatedString { line } => *line,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("[line {}] Error at {}: {}", .token.line, .token, .message)]
    ExpectedToken { token: Token, message: String },
    #[error("[line {}] Error at {}: Invalid assignment target.", .equals.line, .equals)]
    InvalidAssignmentTarget { equals: Token },
    #[error("[line {}] Error at {}: Can't have more than {} arguments.", .token.line, .token, .limit)]
    TooManyArguments { token: Token, limit: usize },
    #[error("[line {}] Error at {}: Can't use 'break' outside of a loop.", .token.line, .token)]
    BreakOutsideLoop { token: Token },
    #[error("[line {}] Error at {}: Can't return from top-level code.", .token.line, .token)]
    ReturnOutsideFunction { token: Token },
}

impl ParseError {
    pub fn expected<S: Into<String>>(token: Token, message: S) -> Self {
        ParseError::ExpectedToken { token, message: message.into() }
    }

    /// The token the parser was looking at when it gave up.
    pub fn token(&self) -> &Token {
        use ParseError::*;
        match self {
            ExpectedToken { token, .. }
            | TooManyArguments { token, .. }
            | BreakOutsideLoop { token }
            | ReturnOutsideFunction { token } => token,
            InvalidAssignmentTarget { equals } => equals,
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {}] Error at {}: Undefined variable '{}'.", .name.line, .name, .name.lexeme)]
    UndefinedVariable { name: Token },
    #[error("[line {}] Error at {}: Can only call functions.", .paren.line, .paren)]
    NotCallable { paren: Token },
    #[error("[line {}] Error at {}: Expected {} arguments but got {}.", .paren.line, .paren, .expected, .got)]
    ArityMismatch { paren: Token, expected: usize, got: usize },
    #[error("[line {}] Error at {}: Division by zero.", .op.line, .op)]
    DivisionByZero { op: Token },
    #[error("[line {}] Error at {}: {}", .op.line, .op, .message)]
    InvalidOperandType { op: Token, message: &'static str },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    pub fn line(&self) -> Option<usize> {
        use RuntimeError::*;
        match self {
            UndefinedVariable { name: token }
            | NotCallable { paren: token }
            | ArityMismatch { paren: token, .. }
            | DivisionByZero { op: token }
            | InvalidOperandType { op: token, .. } => Some(token.line),
            Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn lexical_errors_have_no_location() {
        let e = LexError::UnexpectedCharacter { line: 3, character: '#' };
        assert_eq!("[line 3] Error: Unexpected character '#'.", e.to_string());
    }

    #[test]
    fn syntax_errors_point_at_the_token() {
        let token = Token::new(TokenKind::Identifier, "x", 2);
        let e = ParseError::expected(token, "Expected ';' after expression.");
        assert_eq!("[line 2] Error at 'x': Expected ';' after expression.", e.to_string());
    }

    #[test]
    fn syntax_errors_at_end_of_input() {
        let token = Token::new(TokenKind::EndOfFile, "", 7);
        let e = ParseError::expected(token, "Expected expression.");
        assert_eq!("[line 7] Error at end: Expected expression.", e.to_string());
    }

    #[test]
    fn arity_mismatch_reports_counts() {
        let paren = Token::new(TokenKind::RightParen, ")", 1);
        let e = Error::from(RuntimeError::ArityMismatch { paren, expected: 2, got: 1 });
        assert!(e.is_runtime_error());
        assert_eq!(Some(1), e.line());
        assert_eq!("[line 1] Error at ')': Expected 2 arguments but got 1.", e.to_string());
    }
}
