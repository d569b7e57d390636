use std::{
    io::Write,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::{
    environment::Environment,
    error::RuntimeError,
    interpreter::{Flow, Interpreter},
    value::{Function, NativeFn, Value},
};

type Result<T> = std::result::Result<T, RuntimeError>;

pub(crate) trait Callable<W: Write> {
    fn arity(&self) -> usize;

    /// Variadic callables accept any number of arguments.
    fn is_variadic(&self) -> bool {
        false
    }

    fn call(&self, interpreter: &mut Interpreter<W>, args: Arguments) -> Result<Value>;
}

/// Evaluated call arguments.
///
/// A callable passed to a user function is bound straight to the parameter
/// at its position (`named`); every other value is bound positionally to
/// the parameters left over.
#[derive(Debug, Default)]
pub(crate) struct Arguments {
    pub(crate) named: Vec<(usize, Value)>,
    pub(crate) positional: Vec<Value>,
}

impl Arguments {
    pub(crate) fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    /// All values back in call order.
    pub(crate) fn into_values(self) -> Vec<Value> {
        let Arguments { named, positional } = self;
        let mut named = named.into_iter().peekable();
        let mut positional = positional.into_iter();
        let mut values = Vec::new();
        loop {
            let index = values.len();
            let next = match named.peek() {
                Some((i, _)) if *i == index => named.next().map(|(_, v)| v),
                _ => positional.next().or_else(|| named.next().map(|(_, v)| v)),
            };
            match next {
                Some(v) => values.push(v),
                None => break values,
            }
        }
    }
}

impl Value {
    pub(crate) fn callable<W: Write>(&self) -> Option<&dyn Callable<W>> {
        match self {
            Value::Function(f) => Some(f.as_ref()),
            Value::NativeFn(n) => Some(n),
            _ => None,
        }
    }
}

impl <W: Write> Callable<W> for Function {
    fn arity(&self) -> usize {
        self.declaration.arity()
    }

    /// Runs the body in a fresh scope enclosed by the closure, not by the
    /// caller's scope.
    fn call(&self, interpreter: &mut Interpreter<W>, args: Arguments) -> Result<Value> {
        let mut environment = Environment::from(&self.closure);
        let params = &self.declaration.params;

        let Arguments { named, positional } = args;
        let mut bound = vec![false; params.len()];
        for (index, value) in named {
            if let Some(param) = params.get(index) {
                environment.define(param.lexeme.clone(), value);
                bound[index] = true;
            }
        }
        let unbound = params.iter()
            .zip(bound)
            .filter(|(_, is_bound)| !is_bound)
            .map(|(param, _)| param);
        for (param, value) in unbound.zip(positional) {
            environment.define(param.lexeme.clone(), value);
        }

        match interpreter.execute_block(&self.declaration.body, environment)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
            Flow::Break => unreachable!("'break' escaped the body of {}", self),
        }
    }
}

impl <W: Write> Callable<W> for NativeFn {
    fn arity(&self) -> usize {
        0
    }

    fn is_variadic(&self) -> bool {
        *self == NativeFn::Println
    }

    fn call(&self, interpreter: &mut Interpreter<W>, args: Arguments) -> Result<Value> {
        match self {
            NativeFn::Clock => {
                let seconds = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs_f64())
                    .unwrap_or_default();
                Ok(Value::from(seconds))
            },
            NativeFn::Env => Ok(Value::Environment(interpreter.environment().clone())),
            NativeFn::Println => {
                let writer = interpreter.writer_mut();
                for value in args.into_values() {
                    write!(writer, "{}", value)?;
                }
                writeln!(writer)?;
                Ok(Value::Nil)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arguments_keep_call_order() {
        let args = Arguments {
            named: vec![(1, Value::from("f"))],
            positional: vec![Value::Number(0.0), Value::Number(2.0)],
        };
        assert_eq!(3, args.len());
        assert_eq!(
            vec![Value::Number(0.0), Value::from("f"), Value::Number(2.0)],
            args.into_values(),
        );
    }

    #[test]
    fn trailing_named_arguments_are_kept() {
        let args = Arguments {
            named: vec![(0, Value::from("a")), (1, Value::from("b"))],
            positional: vec![],
        };
        assert_eq!(vec![Value::from("a"), Value::from("b")], args.into_values());
    }

    #[test]
    fn clock_returns_seconds() {
        let mut interpreter = Interpreter::new(Vec::new());
        let now = NativeFn::Clock.call(&mut interpreter, Arguments::default()).unwrap();
        let seconds = now.as_number().unwrap();
        // Any time after 2020 and well short of millisecond magnitudes.
        assert!(seconds > 1.5e9 && seconds < 1.0e11);
    }

    #[test]
    fn println_concatenates_without_separators() {
        let mut interpreter = Interpreter::new(Vec::new());
        let args = Arguments {
            named: vec![],
            positional: vec![Value::from("a"), Value::Number(1.0), Value::Nil],
        };
        let result = NativeFn::Println.call(&mut interpreter, args).unwrap();
        assert_eq!(Value::Nil, result);
        assert_eq!("a1nil\n", String::from_utf8(interpreter.into_writer()).unwrap());
    }

    #[test]
    fn only_println_is_variadic() {
        assert!(Callable::<Vec<u8>>::is_variadic(&NativeFn::Println));
        assert!(!Callable::<Vec<u8>>::is_variadic(&NativeFn::Clock));
        assert!(!Callable::<Vec<u8>>::is_variadic(&NativeFn::Env));
    }
}
