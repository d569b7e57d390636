use crate::{
    error::LexError,
    token::{Token, TokenKind},
};
use peekmore::{PeekMore, PeekMoreIterator};
use phf::phf_map;
use std::{mem, str::Chars};

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "and" => TokenKind::And,
    "break" => TokenKind::Break,
    "else" => TokenKind::Else,
    "false" => TokenKind::False,
    "for" => TokenKind::For,
    "fun" => TokenKind::Fun,
    "if" => TokenKind::If,
    "nil" => TokenKind::Nil,
    "or" => TokenKind::Or,
    "print" => TokenKind::Print,
    "return" => TokenKind::Return,
    "true" => TokenKind::True,
    "var" => TokenKind::Var,
    "while" => TokenKind::While,
};

type Result<T> = std::result::Result<T, LexError>;

/// Single pass, left-to-right scanner over a source string.
///
/// The iterator yields tokens until the input is exhausted; it does not
/// emit the trailing `EndOfFile` token, `scan_tokens` does.
pub struct Scanner<'a> {
    src: PeekMoreIterator<Chars<'a>>,
    lexeme_buffer: String,
    line: usize,
}

impl <'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Result<Token>> {
        while let Some(next_char) = self.src.next() {
            self.lexeme_buffer.push(next_char);

            let kind = self.token_kind_from_char(next_char);
            let lexeme = mem::take(&mut self.lexeme_buffer);

            if let Some(kind) = kind {
                let line = self.line;
                return Some(kind.map(|kind| Token { kind, lexeme, line }));
            }
        }
        None
    }
}

impl <'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.chars().peekmore(),
            lexeme_buffer: String::new(),
            line: 1,
        }
    }

    /// Scans the whole source, stopping at the first lexical error.
    pub fn scan_tokens(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        for token in &mut self {
            tokens.push(token?);
        }
        tokens.push(Token::new(TokenKind::EndOfFile, "", self.line));
        Ok(tokens)
    }

    fn token_kind_from_char(&mut self, c: char) -> Option<Result<TokenKind>> {
        use TokenKind::*;
        match c {
            '(' => Some(Ok(LeftParen)),
            ')' => Some(Ok(RightParen)),
            '{' => Some(Ok(LeftBrace)),
            '}' => Some(Ok(RightBrace)),
            ',' => Some(Ok(Comma)),
            '.' => Some(Ok(Dot)),
            ';' => Some(Ok(Semicolon)),
            '*' => Some(Ok(Star)),
            '%' => Some(Ok(Percent)),
            '-' => Some(Ok(if self.does_next_match('-') { MinusMinus } else { Minus })),
            '+' => Some(Ok(if self.does_next_match('+') { PlusPlus } else { Plus })),
            '!' => Some(Ok(if self.does_next_match('=') { BangEqual } else { Bang })),
            '=' => Some(Ok(if self.does_next_match('=') { EqualEqual } else { Equal })),
            '<' => Some(Ok(if self.does_next_match('=') { LessEqual } else { Less })),
            '>' => Some(Ok(if self.does_next_match('=') { GreaterEqual } else { Greater })),
            // A lone '&' or '|' produces nothing.
            '&' => if self.does_next_match('&') { Some(Ok(And)) } else { None },
            '|' => if self.does_next_match('|') { Some(Ok(Or)) } else { None },
            '/' => {
                if self.does_next_match('/') { // is this a comment?
                    self.advance_until_match('\n');
                    None
                } else {
                    Some(Ok(Slash))
                }
            },
            ' ' | '\r' | '\t' => None,
            '\n' => {
                self.line += 1;
                None
            },
            '"' => Some(self.extract_string()),
            c if c.is_ascii_digit() => Some(self.extract_number()),
            c if can_start_identifier(&c) => Some(self.extract_identifier()),
            character => Some(Err(LexError::UnexpectedCharacter { line: self.line, character })),
        }
    }

    fn does_next_match(&mut self, c: char) -> bool {
        match self.src.peek() {
            Some(next) if c == *next => {
                self.advance_by_one();
                true
            }
            _ => false,
        }
    }

    fn extract_string(&mut self) -> Result<TokenKind> {
        let mut value = String::new();
        loop {
            let next = match self.src.next() {
                None => return Err(LexError::UnterminatedString { line: self.line }),
                Some(next) => next,
            };
            self.lexeme_buffer.push(next);
            match next {
                '"' => return Ok(TokenKind::String(value)),
                '\\' => {
                    let escaped = match self.src.next() {
                        None => return Err(LexError::UnterminatedString { line: self.line }),
                        Some(escaped) => escaped,
                    };
                    self.lexeme_buffer.push(escaped);
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        '"' | '\\' => value.push(escaped),
                        other => {
                            if other == '\n' { self.line += 1 }
                            value.push('\\');
                            value.push(other);
                        }
                    }
                },
                '\n' => {
                    self.line += 1;
                    value.push(next);
                },
                _ => value.push(next),
            }
        }
    }

    fn extract_number(&mut self) -> Result<TokenKind> {
        self.advance_until(|n| !n.is_ascii_digit());

        if let Some(&'.') = self.src.peek() {
            if let Some(maybe_digit) = self.src.peek_nth(1) {
                if maybe_digit.is_ascii_digit() {
                    self.advance_by_one();
                    self.advance_until(|n| !n.is_ascii_digit());
                }
            }
        }

        let line = self.line;
        let first = self.lexeme_buffer.chars().next().unwrap_or('0');
        self.lexeme_buffer.parse()
            .map(TokenKind::Number)
            .map_err(|_| LexError::UnexpectedCharacter { line, character: first })
    }

    fn extract_identifier(&mut self) -> Result<TokenKind> {
        self.advance_until(|n| !is_part_of_valid_identifier(n));

        let text = self.lexeme_buffer.as_str();
        match KEYWORDS.get(text) {
            Some(token) => Ok(token.clone()),
            None => Ok(TokenKind::Identifier)
        }
    }

    fn advance_by_one(&mut self) {
        if let Some(next) = self.src.next() {
            self.lexeme_buffer.push(next);
        }
    }

    fn advance_until_match(&mut self, c: char) {
        self.advance_until(|n| n == &c)
    }

    fn advance_until(&mut self, should_stop: impl Fn(&char) -> bool) {
        while let Some(next) = self.src.peek() {
            if should_stop(next) { break }
            self.advance_by_one();
        }
    }
}

fn can_start_identifier(c: &char) -> bool {
    c.is_ascii_alphabetic() || c == &'_'
}

fn is_part_of_valid_identifier(c: &char) -> bool {
    can_start_identifier(c) || c.is_ascii_digit()
}
