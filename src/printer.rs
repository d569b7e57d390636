//! Renders syntax trees as S-expressions, mostly for tests and trace logs.

use crate::{
    expr::Expr,
    stmt::{FunctionDecl, Stmt},
    token::{Literal, TokenKind},
};

pub fn print_expr(e: &Expr) -> String {
    match e {
        Expr::Assign(a) => parenthesize(&format!("= {}", a.name.lexeme), &[a.value.as_ref()]),
        Expr::Binary(b) => parenthesize(&b.op.lexeme, &[b.left.as_ref(), b.right.as_ref()]),
        Expr::Call(c) => {
            let mut parts = vec![print_expr(&c.callee)];
            parts.extend(c.arguments.iter().map(print_expr));
            list("call", parts)
        },
        Expr::Decrement(d) => format!("(-- {})", d.name.lexeme),
        Expr::Grouping(g) => parenthesize("group", &[g.expression.as_ref()]),
        Expr::Increment(i) => format!("(++ {})", i.name.lexeme),
        Expr::Lambda(l) => print_function(&l.declaration),
        Expr::Literal(l) => match &l.value {
            Literal::String(s) => format!("\"{}\"", s),
            other => other.to_string(),
        },
        Expr::Logical(l) => {
            let name = if l.op.kind == TokenKind::And { "and" } else { "or" };
            parenthesize(name, &[l.left.as_ref(), l.right.as_ref()])
        },
        Expr::Unary(u) => parenthesize(&u.op.lexeme, &[u.right.as_ref()]),
        Expr::Variable(v) => v.name.lexeme.clone(),
    }
}

pub fn print_stmt(s: &Stmt) -> String {
    match s {
        Stmt::Block(b) => list("block", b.statements.iter().map(print_stmt)),
        Stmt::Break(_) => "(break)".into(),
        Stmt::Expression(e) => parenthesize(";", &[&e.expression]),
        Stmt::Function(f) => print_function(&f.declaration),
        Stmt::If(i) => {
            let mut parts = vec![print_expr(&i.condition), print_stmt(&i.then_branch)];
            parts.extend(i.else_branch.as_deref().map(print_stmt));
            list("if", parts)
        },
        Stmt::Print(p) => parenthesize("print", &[&p.expression]),
        Stmt::Return(r) => list("return", r.value.iter().map(print_expr)),
        Stmt::Var(v) => list(
            &format!("var {}", v.name.lexeme),
            v.initializer.iter().map(print_expr),
        ),
        Stmt::While(w) => list("while", vec![print_expr(&w.condition), print_stmt(&w.body)]),
    }
}

fn print_function(f: &FunctionDecl) -> String {
    let params: Vec<&str> = f.params.iter().map(|p| p.lexeme.as_str()).collect();
    let mut parts = vec![format!("({})", params.join(" "))];
    parts.extend(f.body.iter().map(print_stmt));
    list(&format!("fun {}", f.name()), parts)
}

fn parenthesize(name: &str, exprs: &[&Expr]) -> String {
    list(name, exprs.iter().map(|e| print_expr(e)))
}

fn list<I: IntoIterator<Item = String>>(name: &str, parts: I) -> String {
    let mut s = String::new();
    s.push('(');
    s.push_str(name);

    for part in parts {
        s.push(' ');
        s.push_str(&part);
    }

    s.push(')');
    s
}
