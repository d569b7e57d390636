mod callable;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

pub use crate::error::{Error, Result};
pub use crate::interpreter::{Interpreter, Outcome};
pub use crate::value::Value;

use std::io::Write;

use log::debug;

use crate::{
    parser::Parser,
    scanner::Scanner,
    stmt::Stmt,
    token::Token,
};

/// Lexes `source`, stopping at the first bad character.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let tokens = Scanner::new(source).scan_tokens()?;
    debug!("scanned {} token(s)", tokens.len());
    Ok(tokens)
}

/// Lexes and parses `source` into a program.
pub fn parse(source: &str) -> Result<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    let statements = Parser::new(tokens.into_iter()).parse()?;
    debug!("parsed {} statement(s)", statements.len());
    Ok(statements)
}

/// A session that keeps its globals between runs.
pub struct Lox<W> {
    interpreter: Interpreter<W>,
}

impl <W: Write> Lox<W> {
    pub fn new(out: W) -> Self {
        Self { interpreter: Interpreter::new(out) }
    }

    /// Runs one program. A lex or parse error means nothing ran; otherwise
    /// there is one outcome per top-level statement.
    pub fn run(&mut self, source: &str) -> Result<Vec<Outcome>> {
        let statements = parse(source)?;
        let outcomes = self.interpreter.interpret(&statements);
        debug!(
            "ran {} statement(s), {} failed",
            outcomes.len(),
            outcomes.iter().filter(|o| o.is_err()).count(),
        );
        Ok(outcomes)
    }

    pub fn into_writer(self) -> W {
        self.interpreter.into_writer()
    }
}
