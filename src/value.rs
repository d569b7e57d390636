use std::{
    cell::RefCell,
    fmt::{self, Debug, Display},
    rc::Rc,
};

use crate::{
    environment::Environment,
    stmt::FunctionDecl,
    token::Literal,
};

#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    /// An opaque handle on a scope, as returned by the `env` builtin.
    Environment(Rc<RefCell<Environment>>),
    Function(Rc<Function>),
    NativeFn(NativeFn),
    Nil,
    Number(f64),
    String(String),
}

impl Value {
    pub(crate) fn new_function(declaration: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Value::Function(Rc::new(Function { declaration, closure }))
    }

    /// Numeric view of a value. Text written in decimal notation counts as
    /// a number; `inf` and `nan` spellings do not.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_decimal(s.trim()),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        use Value::*;
        !matches!(self, Bool(false) | Nil)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::NativeFn(_))
    }

    /// Equality as the language sees it: numerically when both sides are
    /// numeric, textually when both are strings, by identity for functions
    /// and scopes.
    pub fn is_equal(&self, other: &Value) -> bool {
        use Value::*;
        if let (Some(s), Some(o)) = (self.as_number(), other.as_number()) {
            // NaN == NaN holds here, unlike IEEE 754.
            return (s.is_nan() && o.is_nan()) || s == o
        }
        match (self, other) {
            (Nil, Nil) => true,
            (Bool(s), Bool(o)) => s == o,
            (String(s), String(o)) => s == o,
            (Function(s), Function(o)) => Rc::ptr_eq(s, o),
            (NativeFn(s), NativeFn(o)) => s == o,
            (Environment(s), Environment(o)) => Rc::ptr_eq(s, o),
            _ => false,
        }
    }
}

/// Accepts `[+-]digits[.digits][(e|E)[+-]digits]`, with digits required on
/// at least one side of the point.
fn parse_decimal(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let skip_digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() { i += 1 }
        i
    };

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') { i += 1 }
    let int_end = skip_digits(i);
    let mut mantissa_digits = int_end - i;
    i = int_end;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_end = skip_digits(i + 1);
        mantissa_digits += frac_end - (i + 1);
        i = frac_end;
    }
    if mantissa_digits == 0 {
        return None
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') { j += 1 }
        let exp_end = skip_digits(j);
        if exp_end == j {
            return None
        }
        i = exp_end;
    }

    if i == bytes.len() { s.parse().ok() } else { None }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Number(s), Number(o)) => s == o,
            (String(s), String(o)) => s == o,
            (Number(_), _) | (_, Number(_)) | (String(_), _) | (_, String(_)) => false,
            _ => self.is_equal(other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<Literal> for Value {
    fn from(l: Literal) -> Self {
        match l {
            Literal::Bool(b) => Value::Bool(b),
            Literal::Nil => Value::Nil,
            Literal::Number(n) => Value::Number(n),
            Literal::String(s) => Value::String(s),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;
        match self {
            Bool(b) => write!(f, "{}", b),
            Environment(e) => write!(f, "<env {}>", e.borrow().names().join(", ")),
            Function(fnc) => write!(f, "{}", fnc),
            NativeFn(n) => write!(f, "<native fn {}>", n.name()),
            Nil => write!(f, "nil"),
            Number(n) => write!(f, "{}", n),
            String(s) => write!(f, "{}", s),
        }
    }
}

/// Functions provided by the host rather than declared in a script.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NativeFn {
    Clock,
    Env,
    Println,
}

impl NativeFn {
    pub(crate) const ALL: [NativeFn; 3] = [NativeFn::Clock, NativeFn::Env, NativeFn::Println];

    pub fn name(&self) -> &'static str {
        match self {
            NativeFn::Clock => "clock",
            NativeFn::Env => "env",
            NativeFn::Println => "println",
        }
    }
}

/// A user function or lambda together with the scope it was declared in.
pub struct Function {
    pub(crate) declaration: Rc<FunctionDecl>,
    pub(crate) closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn name(&self) -> &str {
        self.declaration.name()
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_nil_and_false_are_falsy() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(0.0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn numeric_text_counts_as_a_number() {
        assert_eq!(Some(5.0), Value::from("5").as_number());
        assert_eq!(Some(2.5), Value::from(" 2.5 ").as_number());
        assert_eq!(None, Value::from("five").as_number());
        assert_eq!(None, Value::Bool(true).as_number());
        assert_eq!(None, Value::Nil.as_number());
    }

    #[test]
    fn only_decimal_text_is_numeric() {
        for text in &["12", "-3.5", "+.5", "7.", "1e3", "2.5E-2"] {
            assert!(Value::from(*text).as_number().is_some(), "{} should be numeric", text);
        }
        for text in &["inf", "-Infinity", "NaN", "nan", ".", "1e", "0x10", "1_000", ""] {
            assert_eq!(None, Value::from(*text).as_number(), "{} should not be numeric", text);
        }
    }

    #[test]
    fn infinity_and_nan_words_compare_as_text() {
        assert!(!Value::from("inf").is_equal(&Value::from("INFINITY")));
        assert!(Value::from("nan").is_equal(&Value::from("nan")));
        assert!(!Value::from("nan").is_equal(&Value::Number(f64::NAN)));
    }

    #[test]
    fn language_equality() {
        assert!(Value::Nil.is_equal(&Value::Nil));
        assert!(!Value::Nil.is_equal(&Value::Bool(false)));
        assert!(Value::from("5").is_equal(&Value::Number(5.0)));
        assert!(Value::from("a").is_equal(&Value::from("a")));
        assert!(!Value::from("a").is_equal(&Value::from("b")));
        assert!(Value::Number(f64::NAN).is_equal(&Value::Number(f64::NAN)));
        assert!(!Value::Bool(true).is_equal(&Value::Number(1.0)));
    }

    #[test]
    fn host_equality_does_not_coerce() {
        assert_ne!(Value::from("5"), Value::Number(5.0));
        assert_eq!(Value::Number(5.0), Value::Number(5.0));
    }

    #[test]
    fn display_forms() {
        assert_eq!("3", Value::Number(3.0).to_string());
        assert_eq!("2.5", Value::Number(2.5).to_string());
        assert_eq!("nil", Value::Nil.to_string());
        assert_eq!("true", Value::Bool(true).to_string());
        assert_eq!("raw text", Value::from("raw text").to_string());
        assert_eq!("<native fn clock>", Value::NativeFn(NativeFn::Clock).to_string());
    }

    #[test]
    fn environment_displays_binding_names() {
        let mut env = Environment::new();
        env.define("b", Value::Nil);
        env.define("a", Value::Nil);
        let v = Value::Environment(Rc::new(RefCell::new(env)));
        assert_eq!("<env a, b>", v.to_string());
    }
}
