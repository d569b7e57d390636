use std::{
    cell::RefCell,
    collections::HashMap,
    fmt::{self, Debug},
    rc::Rc,
};
use crate::{
    error::RuntimeError,
    token::Token,
    value::Value,
};

type Result<T> = std::result::Result<T, RuntimeError>;

/// One level of lexical scope. Lookups and assignments walk outwards
/// through `enclosing` until the name is found.
#[derive(Default)]
pub struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self { enclosing: None, values: HashMap::new() }
    }

    pub fn from(e: &Rc<RefCell<Environment>>) -> Self {
        Self { enclosing: Some(Rc::clone(e)), values: HashMap::new() }
    }

    pub fn get(&self, name: &Token) -> Result<Value> {
        self.values.get(&name.lexeme)
            .map(|v| Ok(v.clone()))
            .unwrap_or_else(|| {
                self.enclosing.as_ref()
                    .map(|e| e.borrow().get(name))
                    .unwrap_or_else(|| Err(undefined_var_error(name)))
            })
    }

    /// Rebinds `name` at the innermost level that already defines it.
    /// Never creates a binding.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        match self.values.get_mut(&name.lexeme) {
            Some(v) => {
                *v = value;
                Ok(())
            },
            None => self.enclosing.as_ref()
                .map(|e| e.borrow_mut().assign(name, value))
                .unwrap_or_else(|| Err(undefined_var_error(name))),
        }
    }

    /// Binds `name` at this level, replacing any existing binding here.
    pub fn define<S: Into<String>>(&mut self, name: S, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Names bound at this level only, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names())
            .field("enclosed", &self.enclosing.is_some())
            .finish()
    }
}

fn undefined_var_error(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable { name: name.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use pretty_assertions::assert_eq;

    fn name(s: &str) -> Token {
        Token::new(TokenKind::Identifier, s, 1)
    }

    fn shared(e: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(e))
    }

    #[test]
    fn lookup_walks_outwards() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let inner = Environment::from(&global);
        assert_eq!(Value::Number(1.0), inner.get(&name("a")).unwrap());
    }

    #[test]
    fn inner_definition_shadows_outer() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let mut inner = Environment::from(&global);
        inner.define("a", Value::Number(2.0));
        assert_eq!(Value::Number(2.0), inner.get(&name("a")).unwrap());
        assert_eq!(Value::Number(1.0), global.borrow().get(&name("a")).unwrap());
    }

    #[test]
    fn redefinition_in_same_scope_overwrites() {
        let mut env = Environment::new();
        env.define("a", Value::Number(1.0));
        env.define("a", Value::from("x"));
        assert_eq!(Value::from("x"), env.get(&name("a")).unwrap());
    }

    #[test]
    fn assign_mutates_defining_level() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let mut inner = Environment::from(&global);
        inner.assign(&name("a"), Value::Number(3.0)).unwrap();
        assert_eq!(Value::Number(3.0), global.borrow().get(&name("a")).unwrap());
        assert!(inner.names().is_empty());
    }

    #[test]
    fn assign_never_declares() {
        let mut env = Environment::new();
        let err = env.assign(&name("ghost"), Value::Nil).unwrap_err();
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
        assert!(env.get(&name("ghost")).is_err());
    }

    #[test]
    fn undefined_lookup_names_the_variable() {
        let env = Environment::new();
        let err = env.get(&name("nope")).unwrap_err();
        assert_eq!("[line 1] Error at 'nope': Undefined variable 'nope'.", err.to_string());
    }
}
