use std::rc::Rc;

use crate::expr::Expr;
use crate::token::Token;
use astgen::generate_ast;

generate_ast!(
    Stmt,
    [
        Block      => { statements: Vec<Stmt> };
        Break      => { keyword: Token };
        Expression => { expression: Expr };
        Function   => { declaration: Rc<FunctionDecl> };
        If         => { condition: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> };
        Print      => { expression: Expr };
        Return     => { keyword: Token, value: Option<Expr> };
        Var        => { name: Token, initializer: Option<Expr> };
        While      => { condition: Expr, body: Box<Stmt> };
    ]
);

/// Parameters and body shared by named functions and lambdas.
/// Lambdas have no `name`.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Option<Token>,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn name(&self) -> &str {
        self.name.as_ref().map(|n| n.lexeme.as_str()).unwrap_or("anonymous")
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
