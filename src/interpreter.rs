use std::{
    cell::RefCell,
    io::Write,
    mem,
    rc::Rc,
};

use log::{debug, trace, warn};

use crate::{
    callable::Arguments,
    environment::Environment,
    error::RuntimeError,
    expr::{self, Expr},
    printer,
    stmt::{self, Stmt},
    token::{Token, TokenKind},
    value::{NativeFn, Value},
};

type Result<T> = std::result::Result<T, RuntimeError>;

/// What one top-level statement produced.
pub type Outcome = std::result::Result<Value, RuntimeError>;

/// How a statement finished. `Break` and `Return` unwind to the nearest
/// loop and call respectively.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Break,
    Return(Value),
}

pub struct Interpreter<W> {
    environment: Rc<RefCell<Environment>>,
    writer: W,
}

impl <W: Write> Interpreter<W> {
    pub fn new(writer: W) -> Self {
        let mut globals = Environment::new();
        for native in NativeFn::ALL.iter() {
            globals.define(native.name(), Value::NativeFn(*native));
        }
        Interpreter { environment: Rc::new(RefCell::new(globals)), writer }
    }

    /// Runs each statement in order. A runtime error ends only the
    /// statement that raised it.
    ///
    /// Statements must come from `Parser`: a `break` or `return` that is not
    /// enclosed by a loop or function panics.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Vec<Outcome> {
        statements.iter()
            .map(|s| {
                trace!("executing {}", printer::print_stmt(s));
                let outcome = self.execute_top_level(s);
                if let Err(e) = &outcome {
                    warn!("{}", e);
                }
                outcome
            })
            .collect()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    pub(crate) fn environment(&self) -> &Rc<RefCell<Environment>> {
        &self.environment
    }

    pub(crate) fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    fn execute_top_level(&mut self, s: &Stmt) -> Outcome {
        if let Stmt::Expression(e) = s {
            return self.evaluate(&e.expression)
        }
        match self.execute(s)? {
            Flow::Normal => Ok(Value::Nil),
            flow => unreachable!("{:?} escaped to top level", flow),
        }
    }

    fn execute(&mut self, s: &Stmt) -> Result<Flow> {
        match s {
            Stmt::Block(b) => {
                let environment = Environment::from(&self.environment);
                self.execute_block(&b.statements, environment)
            },
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Expression(e) => {
                self.evaluate(&e.expression)?;
                Ok(Flow::Normal)
            },
            Stmt::Function(f) => {
                let function = Value::new_function(
                    Rc::clone(&f.declaration),
                    Rc::clone(&self.environment),
                );
                self.environment.borrow_mut().define(f.declaration.name(), function);
                Ok(Flow::Normal)
            },
            Stmt::If(i) => self.execute_if(i),
            Stmt::Print(p) => {
                let value = self.evaluate(&p.expression)?;
                writeln!(self.writer, "{}", value)?;
                Ok(Flow::Normal)
            },
            Stmt::Return(r) => {
                let value = match &r.value {
                    Some(v) => self.evaluate(v)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            },
            Stmt::Var(v) => {
                let value = match &v.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(v.name.lexeme.clone(), value);
                Ok(Flow::Normal)
            },
            Stmt::While(w) => self.execute_while(w),
        }
    }

    /// Runs `statements` in `environment`, restoring the current scope
    /// afterwards whether or not they succeed.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt], environment: Environment) -> Result<Flow> {
        debug!("entering scope");
        let previous = mem::replace(&mut self.environment, Rc::new(RefCell::new(environment)));
        let result = self.execute_sequence(statements);
        self.environment = previous;
        debug!("leaving scope");
        result
    }

    fn execute_sequence(&mut self, statements: &[Stmt]) -> Result<Flow> {
        for statement in statements {
            match self.execute(statement)? {
                Flow::Normal => {},
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_if(&mut self, i: &stmt::If) -> Result<Flow> {
        if self.evaluate(&i.condition)?.is_truthy() {
            self.execute(&i.then_branch)
        } else if let Some(else_branch) = &i.else_branch {
            self.execute(else_branch)
        } else {
            Ok(Flow::Normal)
        }
    }

    fn execute_while(&mut self, w: &stmt::While) -> Result<Flow> {
        while self.evaluate(&w.condition)?.is_truthy() {
            match self.execute(&w.body)? {
                Flow::Normal => {},
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn evaluate(&mut self, e: &Expr) -> Result<Value> {
        match e {
            Expr::Assign(a) => {
                let value = self.evaluate(&a.value)?;
                self.environment.borrow_mut().assign(&a.name, value.clone())?;
                Ok(value)
            },
            Expr::Binary(b) => self.evaluate_binary(b),
            Expr::Call(c) => self.evaluate_call(c),
            Expr::Decrement(d) => self.step(&d.target, &d.name, -1.0),
            Expr::Grouping(g) => self.evaluate(&g.expression),
            Expr::Increment(i) => self.step(&i.target, &i.name, 1.0),
            Expr::Lambda(l) => Ok(Value::new_function(
                Rc::clone(&l.declaration),
                Rc::clone(&self.environment),
            )),
            Expr::Literal(l) => Ok(Value::from(l.value.clone())),
            Expr::Logical(l) => self.evaluate_logical(l),
            Expr::Unary(u) => self.evaluate_unary(u),
            Expr::Variable(v) => self.environment.borrow().get(&v.name),
        }
    }

    fn evaluate_binary(&mut self, e: &expr::Binary) -> Result<Value> {
        let left = self.evaluate(e.left.as_ref())?;
        let right = self.evaluate(e.right.as_ref())?;
        let numbers = left.as_number().zip(right.as_number());

        use Value::{Nil, String};
        match e.op.kind {
            TokenKind::Plus => {
                if let Some((l, r)) = numbers {
                    return Ok(Value::from(l + r))
                }
                match (left, right) {
                    (String(mut l), String(r)) => {
                        l.push_str(&r);
                        Ok(String(l))
                    },
                    _ => Ok(Nil),
                }
            },
            TokenKind::Minus => Ok(numbers.map_or(Nil, |(l, r)| Value::from(l - r))),
            TokenKind::Star => Ok(numbers.map_or(Nil, |(l, r)| Value::from(l * r))),
            TokenKind::Slash => {
                check_divisor(&e.op, &right, |r| r)?;
                Ok(numbers.map_or(Nil, |(l, r)| Value::from(l / r)))
            },
            TokenKind::Percent => {
                check_divisor(&e.op, &right, f64::trunc)?;
                Ok(numbers.map_or(Nil, |(l, r)| Value::from(l.trunc() % r.trunc())))
            },
            TokenKind::Greater => compare(&e.op, numbers, |l, r| l > r),
            TokenKind::GreaterEqual => compare(&e.op, numbers, |l, r| l >= r),
            TokenKind::Less => compare(&e.op, numbers, |l, r| l < r),
            TokenKind::LessEqual => compare(&e.op, numbers, |l, r| l <= r),
            TokenKind::EqualEqual => Ok(Value::from(left.is_equal(&right))),
            TokenKind::BangEqual => Ok(Value::from(!left.is_equal(&right))),
            _ => unreachable!("{:?} is not a binary operator", e.op.kind),
        }
    }

    fn evaluate_call(&mut self, c: &expr::Call) -> Result<Value> {
        let callee = self.evaluate(&c.callee)?;
        let callable = callee.callable::<W>()
            .ok_or_else(|| RuntimeError::NotCallable { paren: c.paren.clone() })?;
        let params = match &callee {
            Value::Function(f) => f.declaration.params.as_slice(),
            _ => &[],
        };

        let mut args = Arguments::default();
        for (index, argument) in c.arguments.iter().enumerate() {
            let value = self.evaluate(argument)?;
            if value.is_callable() && index < params.len() {
                args.named.push((index, value));
            } else {
                args.positional.push(value);
            }
        }

        if !callable.is_variadic() && args.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                paren: c.paren.clone(),
                expected: callable.arity(),
                got: args.len(),
            })
        }

        debug!("calling {} with {} argument(s)", callee, args.len());
        callable.call(self, args)
    }

    fn evaluate_logical(&mut self, e: &expr::Logical) -> Result<Value> {
        let left = self.evaluate(&e.left)?;

        use TokenKind::*;
        Ok(match (&e.op.kind, left.is_truthy()) {
            (Or, true) | (And, false) => left,
            (Or, false) | (And, true) => self.evaluate(&e.right)?,
            _ => unreachable!("Logical expression must be either And or Or.")
        })
    }

    fn evaluate_unary(&mut self, e: &expr::Unary) -> Result<Value> {
        let right = self.evaluate(e.right.as_ref())?;

        match e.op.kind {
            TokenKind::Minus => right.as_number()
                .map(|n| Value::from(-n))
                .ok_or_else(|| operand_error(&e.op, "Operand must be a number.")),
            TokenKind::Bang => Ok(Value::from(!right.is_truthy())),
            _ => unreachable!("{:?} is not a unary operator", e.op.kind),
        }
    }

    /// Shared body of `++` and `--`: writes `target + delta` back to `name`.
    fn step(&mut self, target: &Expr, name: &Token, delta: f64) -> Result<Value> {
        let current = self.evaluate(target)?;
        let n = current.as_number()
            .ok_or_else(|| operand_error(name, "Operand must be a number."))?;
        let updated = Value::from(n + delta);
        self.environment.borrow_mut().assign(name, updated.clone())?;
        Ok(updated)
    }
}

fn operand_error(op: &Token, message: &'static str) -> RuntimeError {
    RuntimeError::InvalidOperandType { op: op.clone(), message }
}

fn compare(
    op: &Token,
    numbers: Option<(f64, f64)>,
    f: impl Fn(f64, f64) -> bool
) -> Result<Value> {
    numbers
        .map(|(l, r)| Value::from(f(l, r)))
        .ok_or_else(|| operand_error(op, "Operands must be numbers."))
}

/// Fails when the right-hand side is numeric and, after `normalise`, zero.
fn check_divisor(op: &Token, divisor: &Value, normalise: impl Fn(f64) -> f64) -> Result<()> {
    match divisor.as_number() {
        Some(d) if normalise(d) == 0.0 => Err(RuntimeError::DivisionByZero { op: op.clone() }),
        _ => Ok(()),
    }
}
