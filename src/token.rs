use std::fmt::{self, Display};

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum TokenKind {
    LeftParen, RightParen, LeftBrace, RightBrace,
    Comma, Dot, Minus, Plus, Semicolon, Slash, Star, Percent,

    Bang, BangEqual,
    Equal, EqualEqual,
    Greater, GreaterEqual,
    Less, LessEqual,
    PlusPlus, MinusMinus,

    Identifier, String(String), Number(f64),

    And, Break, Else, False, Fun, For, If, Nil, Or,
    Print, Return, True, Var, While,

    EndOfFile,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, lexeme: S, line: usize) -> Self {
        Token { kind, lexeme: lexeme.into(), line }
    }

    /// The literal value carried by this token, if it denotes one.
    pub fn literal(&self) -> Option<Literal> {
        use TokenKind::*;
        match &self.kind {
            Number(n) => Some(Literal::Number(*n)),
            String(s) => Some(Literal::String(s.clone())),
            True => Some(Literal::Bool(true)),
            False => Some(Literal::Bool(false)),
            Nil => Some(Literal::Nil),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::EndOfFile
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_end() {
            write!(f, "end")
        } else {
            write!(f, "'{}'", self.lexeme)
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Bool(bool),
    Nil,
    Number(f64),
    String(String),
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Literal::*;
        match self {
            Bool(b) => write!(f, "{}", b),
            Nil => write!(f, "nil"),
            Number(n) => write!(f, "{}", n),
            String(s) => write!(f, "{}", s),
        }
    }
}
