use std::rc::Rc;

use crate::stmt::FunctionDecl;
use crate::token::{self, Token};
use astgen::generate_ast;

generate_ast!(
    Expr,
    [
        Assign    => { name: Token, value: Box<Expr> };
        Binary    => { left: Box<Expr>, op: Token, right: Box<Expr> };
        Call      => { callee: Box<Expr>, paren: Token, arguments: Vec<Expr> };
        Decrement => { target: Box<Expr>, name: Token };
        Grouping  => { expression: Box<Expr> };
        Increment => { target: Box<Expr>, name: Token };
        Lambda    => { declaration: Rc<FunctionDecl> };
        Literal   => { value: token::Literal };
        Logical   => { left: Box<Expr>, op: Token, right: Box<Expr> };
        Unary     => { op: Token, right: Box<Expr> };
        Variable  => { name: Token };
    ]
);
