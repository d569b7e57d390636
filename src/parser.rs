use std::{iter::Peekable, mem, rc::Rc};

use crate::{
    error::ParseError,
    expr::Expr,
    stmt::{FunctionDecl, Stmt},
    token::*,
};

/// Upper bound on both call arguments and declared parameters.
pub const MAX_ARGUMENTS: usize = 255;

type Result<T> = std::result::Result<T, ParseError>;

const EQUALITY_TOKENS: &[&TokenKind] = &[
    &TokenKind::BangEqual,
    &TokenKind::EqualEqual,
];

const COMPARISON_TOKENS: &[&TokenKind] = &[
    &TokenKind::Greater,
    &TokenKind::GreaterEqual,
    &TokenKind::Less,
    &TokenKind::LessEqual,
];

const TERM_TOKENS: &[&TokenKind] = &[
    &TokenKind::Minus,
    &TokenKind::Plus,
];

const FACTOR_TOKENS: &[&TokenKind] = &[
    &TokenKind::Star,
    &TokenKind::Slash,
    &TokenKind::Percent,
];

const UNARY_TOKENS: &[&TokenKind] = &[
    &TokenKind::Bang,
    &TokenKind::Minus,
];

const POSTFIX_TOKENS: &[&TokenKind] = &[
    &TokenKind::PlusPlus,
    &TokenKind::MinusMinus,
];

/// Recursive-descent parser. The first error aborts the parse.
pub struct Parser<T> {
    tokens: T,
    line: usize,
    inside_loop: bool,
    inside_function: bool,
}

impl <T: Iterator<Item = Token>> Parser<Peekable<T>> {
    pub fn new(tokens: T) -> Self {
        let tokens = tokens.peekable();
        Parser { tokens, line: 1, inside_loop: false, inside_function: false }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        Ok(statements)
    }

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_single(&TokenKind::Fun).is_some() {
            let name = self.consume(&TokenKind::Identifier, "Expected function name.")?;
            let declaration = self.function(Some(name))?;
            Ok(Stmt::new_function(Rc::new(declaration)))
        } else if self.match_single(&TokenKind::Var).is_some() {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenKind::Identifier, "Expected variable name.")?;

        let initializer = if self.match_single(&TokenKind::Equal).is_some() {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenKind::Semicolon, "Expected ';' after variable declaration.")?;
        Ok(Stmt::new_var(name, initializer))
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_single(&TokenKind::For).is_some() {
            self.for_statement()
        } else if self.match_single(&TokenKind::If).is_some() {
            self.if_statement()
        } else if self.match_single(&TokenKind::Print).is_some() {
            self.print_statement()
        } else if let Some(token) = self.match_single(&TokenKind::Return) {
            self.return_statement(token)
        } else if let Some(token) = self.match_single(&TokenKind::Break) {
            self.break_statement(token)
        } else if self.match_single(&TokenKind::While).is_some() {
            self.while_statement()
        } else if self.match_single(&TokenKind::LeftBrace).is_some() {
            Ok(Stmt::new_block(self.block()?))
        } else {
            self.expression_statement()
        }
    }

    /// `for (init; cond; incr) body` becomes
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'for'.")?;

        let initializer = if self.match_single(&TokenKind::Semicolon).is_some() {
            None
        } else if self.match_single(&TokenKind::Var).is_some() {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check_next(&TokenKind::Semicolon) {
            self.expression()?
        } else { Expr::new_literal(Literal::from(true)) };

        self.consume(&TokenKind::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check_next(&TokenKind::RightParen) {
            Some(Stmt::new_expression(self.expression()?))
        } else { None };

        self.consume(&TokenKind::RightParen, "Expected ')' after for clauses.")?;

        let body = self.loop_body()?;
        let body = Box::new(match increment {
            Some(i) => Stmt::new_block(vec![body, i]),
            None => body,
        });
        let while_loop = Stmt::new_while(condition, body);
        let while_loop = match initializer {
            Some(i) => Stmt::new_block(vec![i, while_loop]),
            None => while_loop,
        };

        Ok(while_loop)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(&TokenKind::RightParen, "Expected ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_single(&TokenKind::Else).is_some() {
            Some(Box::new(self.statement()?))
        } else { None };

        Ok(Stmt::new_if(condition, then_branch, else_branch))
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let expression = self.expression()?;
        self.consume(&TokenKind::Semicolon, "Expected ';' after value.")?;
        Ok(Stmt::new_print(expression))
    }

    fn return_statement(&mut self, keyword: Token) -> Result<Stmt> {
        if !self.inside_function {
            return Err(ParseError::ReturnOutsideFunction { token: keyword })
        }
        let value = if !self.check_next(&TokenKind::Semicolon) {
            Some(self.expression()?)
        } else { None };
        self.consume(&TokenKind::Semicolon, "Expected ';' after return value.")?;
        Ok(Stmt::new_return(keyword, value))
    }

    fn break_statement(&mut self, keyword: Token) -> Result<Stmt> {
        if !self.inside_loop {
            return Err(ParseError::BreakOutsideLoop { token: keyword })
        }
        self.consume(&TokenKind::Semicolon, "Expected ';' after 'break'.")?;
        Ok(Stmt::new_break(keyword))
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenKind::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(&TokenKind::RightParen, "Expected ')' after condition.")?;
        let body = Box::new(self.loop_body()?);

        Ok(Stmt::new_while(condition, body))
    }

    fn loop_body(&mut self) -> Result<Stmt> {
        let enclosing = mem::replace(&mut self.inside_loop, true);
        let body = self.statement();
        self.inside_loop = enclosing;
        body
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expression = self.expression()?;
        self.consume(&TokenKind::Semicolon, "Expected ';' after expression.")?;
        Ok(Stmt::new_expression(expression))
    }

    /// Parses a parameter list and body. `name` is `None` for lambdas.
    fn function(&mut self, name: Option<Token>) -> Result<FunctionDecl> {
        let kind = if name.is_some() { "function name" } else { "'fun'" };
        self.consume(
            &TokenKind::LeftParen,
            format!("Expected '(' after {}.", kind)
        )?;

        let mut params = Vec::new();
        if !self.check_next(&TokenKind::RightParen) {
            loop {
                let param = self.consume(&TokenKind::Identifier, "Expected parameter name.")?;
                if params.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::TooManyArguments { token: param, limit: MAX_ARGUMENTS })
                }
                params.push(param);
                if self.match_single(&TokenKind::Comma).is_none() { break }
            }
        }

        self.consume(&TokenKind::RightParen, "Expected ')' after parameters.")?;
        self.consume(&TokenKind::LeftBrace, "Expected '{' before function body.")?;

        // A function body is a fresh context: `break` cannot reach an
        // enclosing loop and `return` becomes legal.
        let enclosing_loop = mem::replace(&mut self.inside_loop, false);
        let enclosing_function = mem::replace(&mut self.inside_function, true);
        let body = self.block();
        self.inside_loop = enclosing_loop;
        self.inside_function = enclosing_function;

        Ok(FunctionDecl { name, params, body: body? })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check_next(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenKind::RightBrace, "Expected '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.or()?;
        if let Some(equals) = self.match_single(&TokenKind::Equal) {
            if let Expr::Variable(lhs) = expr {
                let value = self.assignment()?;
                Ok(Expr::new_assign(lhs.name, Box::new(value)))
            } else {
                Err(ParseError::InvalidAssignmentTarget { equals })
            }
        } else {
            Ok(expr)
        }
    }

    fn or(&mut self) -> Result<Expr> {
        let mut e = self.and()?;

        while let Some(op) = self.match_single(&TokenKind::Or) {
            let right = Box::new(self.and()?);
            e = Expr::new_logical(Box::new(e), op, right);
        }

        Ok(e)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut e = self.equality()?;

        while let Some(op) = self.match_single(&TokenKind::And) {
            let right = Box::new(self.equality()?);
            e = Expr::new_logical(Box::new(e), op, right);
        }

        Ok(e)
    }

    fn equality(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::comparison,
            EQUALITY_TOKENS
        )
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::term,
            COMPARISON_TOKENS
        )
    }

    fn term(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::factor,
            TERM_TOKENS
        )
    }

    fn factor(&mut self) -> Result<Expr> {
        self.match_binary_precedence_with_tokens(
            Self::unary,
            FACTOR_TOKENS
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        if let Some(token) = self.match_any(UNARY_TOKENS) {
            let right = Box::new(self.unary()?);
            Ok(Expr::new_unary(token, right))
        } else {
            self.postfix()
        }
    }

    fn postfix(&mut self) -> Result<Expr> {
        let e = self.call()?;

        match self.match_any(POSTFIX_TOKENS) {
            Some(op) => {
                let name = match &e {
                    Expr::Variable(v) => v.name.clone(),
                    _ => return Err(ParseError::InvalidAssignmentTarget { equals: op }),
                };
                Ok(if op.kind == TokenKind::PlusPlus {
                    Expr::new_increment(Box::new(e), name)
                } else {
                    Expr::new_decrement(Box::new(e), name)
                })
            },
            None => Ok(e),
        }
    }

    fn call(&mut self) -> Result<Expr> {
        let mut e = self.primary()?;

        while self.match_single(&TokenKind::LeftParen).is_some() {
            e = self.finish_call(e)?;
        }

        Ok(e)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut args = Vec::new();

        if !self.check_next(&TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGUMENTS {
                    let token = self.advance();
                    return Err(ParseError::TooManyArguments { token, limit: MAX_ARGUMENTS })
                }
                args.push(self.argument()?);
                if self.match_single(&TokenKind::Comma).is_none() { break }
            }
        }
        let paren = self.consume(
            &TokenKind::RightParen,
            "Expected ')' after arguments."
        )?;

        Ok(Expr::new_call(Box::new(callee), paren, args))
    }

    /// Arguments are the one place a `fun` lambda may appear.
    fn argument(&mut self) -> Result<Expr> {
        if self.match_single(&TokenKind::Fun).is_some() {
            let declaration = self.function(None)?;
            Ok(Expr::new_lambda(Rc::new(declaration)))
        } else {
            self.expression()
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let next = self.advance();

        if let Some(literal) = next.literal() {
            return Ok(Expr::new_literal(literal))
        }

        match next.kind {
            TokenKind::Identifier => Ok(Expr::new_variable(next)),
            TokenKind::LeftParen => {
                let expression = Box::new(self.expression()?);
                self.consume(&TokenKind::RightParen, "Expected ')' after expression.")?;
                Ok(Expr::new_grouping(expression))
            },
            _ => Err(ParseError::expected(next, "Expected expression.")),
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.tokens.peek()
            .map(Token::is_end)
            .unwrap_or(true)
    }

    /// Takes the next token; past the end of the stream this keeps
    /// producing an end-of-file token.
    fn advance(&mut self) -> Token {
        match self.tokens.next() {
            Some(token) => {
                self.line = token.line;
                token
            },
            None => Token::new(TokenKind::EndOfFile, "", self.line),
        }
    }

    fn check_next(&mut self, kind: &TokenKind) -> bool {
        self.tokens.peek()
            .map(|t| &t.kind == kind)
            .unwrap_or(false)
    }

    fn consume<S: Into<String>>(&mut self, kind: &TokenKind, error_msg: S) -> Result<Token> {
        if let Some(token) = self.match_single(kind) {
            Ok(token)
        } else {
            Err(ParseError::expected(self.advance(), error_msg))
        }
    }

    fn match_binary_precedence_with_tokens(
        &mut self,
        parse: impl Fn(&mut Self) -> Result<Expr>,
        kinds: &[&TokenKind]
    ) -> Result<Expr> {
        let mut e = parse(self)?;

        while let Some(token) = self.match_any(kinds) {
            let right = Box::new(parse(self)?);
            e = Expr::new_binary(Box::new(e), token, right)
        }

        Ok(e)
    }

    fn match_single(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check_next(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn match_any(&mut self, kinds: &[&TokenKind]) -> Option<Token> {
        kinds.iter().find_map(|k| self.match_single(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{printer, scanner::Scanner};
    use pretty_assertions::assert_eq;

    fn assert_tokens_parse_to_expr(tokens: Vec<Token>, expr: Expr) -> Result<()> {
        let mut parser = Parser::new(tokens.into_iter());
        let parsed = parser.expression()?;
        assert_eq!(expr, parsed);
        Ok(())
    }

    fn parse_source(src: &str) -> Result<Vec<Stmt>> {
        let tokens = Scanner::new(src).scan_tokens().expect("source should scan");
        Parser::new(tokens.into_iter()).parse()
    }

    fn render(src: &str) -> Vec<String> {
        parse_source(src)
            .expect("source should parse")
            .iter()
            .map(printer::print_stmt)
            .collect()
    }

    #[test]
    fn string_literal_token() -> Result<()> {
        assert_tokens_parse_to_expr(
            vec![
                Token { kind: TokenKind::String("abc".into()), lexeme: "".into(), line: 1 },
            ],
            Expr::new_literal(Literal::String("abc".into()))
        )
    }

    #[test]
    fn number_literal_token() -> Result<()> {
        assert_tokens_parse_to_expr(
            vec![
                Token { kind: TokenKind::Number(5.1), lexeme: "".into(), line: 1 },
            ],
            Expr::new_literal(Literal::Number(5.1))
        )
    }

    #[test]
    fn nil_literal_token() -> Result<()> {
        assert_tokens_parse_to_expr(
            vec![
                Token { kind: TokenKind::Nil, lexeme: "".into(), line: 1 },
            ],
            Expr::new_literal(Literal::Nil)
        )
    }

    #[test]
    fn bool_literal_tokens() -> Result<()> {
        for (kind, expected) in [(TokenKind::True, Literal::Bool(true)), (TokenKind::False, Literal::Bool(false))].iter() {
            assert_tokens_parse_to_expr(
                vec![
                    Token { kind: kind.clone(), lexeme: "".into(), line: 1 },
                ],
                Expr::new_literal(expected.clone())
            )?;
        }
        Ok(())
    }

    #[test]
    fn unary_op_tokens() -> Result<()> {
        let not = Token::make(TokenKind::Bang);
        assert_tokens_parse_to_expr(
            vec![
                not.clone(),
                Token::make(TokenKind::True),
            ],
            Expr::new_unary(not, Box::new(Expr::make(true)))
        )
    }

    #[test]
    fn unary_binds_tighter_than_factor_and_term() {
        assert_eq!(vec!["(; (+ (- 2) (* 3 (- 4))))"], render("-2 + 3 * -4;"));
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_eq!(vec!["(; (- (- 1 2) 3))"], render("1 - 2 - 3;"));
        assert_eq!(vec!["(; (% (* 8 3) 5))"], render("8 * 3 % 5;"));
    }

    #[test]
    fn logical_operators_layer_below_equality() {
        assert_eq!(
            vec!["(; (or (== a 1) (and b c)))"],
            render("a == 1 || b && c;"),
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(vec!["(; (= a (= b 1)))"], render("a = b = 1;"));
    }

    #[test]
    fn invalid_assignment_target() {
        let err = parse_source("1 + 2 = 3;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAssignmentTarget { .. }));
    }

    #[test]
    fn postfix_increment_needs_a_variable() {
        assert_eq!(vec!["(; (++ i))", "(; (-- j))"], render("i++; j--;"));
        let err = parse_source("5++;").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAssignmentTarget { .. }));
    }

    #[test]
    fn chained_calls() {
        assert_eq!(vec!["(; (call (call f) 1 2))"], render("f()(1, 2);"));
    }

    #[test]
    fn lambda_in_argument_position() {
        assert_eq!(
            vec!["(; (call apply (fun anonymous (x) (return x)) 3))"],
            render("apply(fun (x) { return x; }, 3);"),
        );
    }

    #[test]
    fn lambda_outside_argument_position_is_rejected() {
        let err = parse_source("var f = fun (x) { return x; };").unwrap_err();
        assert!(matches!(err, ParseError::ExpectedToken { .. }));
    }

    #[test]
    fn too_many_arguments() {
        let args = vec!["1"; MAX_ARGUMENTS + 1].join(", ");
        let err = parse_source(&format!("f({});", args)).unwrap_err();
        assert!(matches!(err, ParseError::TooManyArguments { limit: MAX_ARGUMENTS, .. }));
    }

    #[test]
    fn max_arguments_is_allowed() {
        let args = vec!["1"; MAX_ARGUMENTS].join(", ");
        assert!(parse_source(&format!("f({});", args)).is_ok());
    }

    #[test]
    fn too_many_parameters() {
        let params: Vec<String> = (0..=MAX_ARGUMENTS).map(|i| format!("p{}", i)).collect();
        let err = parse_source(&format!("fun f({}) {{}}", params.join(", "))).unwrap_err();
        assert!(matches!(err, ParseError::TooManyArguments { .. }));
    }

    #[test]
    fn for_desugars_to_while() {
        assert_eq!(
            vec!["(block (var i 0) (while (< i 3) (block (block (print i)) (; (= i (+ i 1))))))"],
            render("for (var i = 0; i < 3; i = i + 1) { print i; }"),
        );
    }

    #[test]
    fn for_without_clauses_loops_on_true() {
        assert_eq!(
            vec!["(while true (block (break)))"],
            render("for (;;) { break; }"),
        );
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let err = parse_source("break;").unwrap_err();
        assert!(matches!(err, ParseError::BreakOutsideLoop { .. }));
    }

    #[test]
    fn break_after_nested_loop_is_still_inside_outer_loop() {
        assert!(parse_source("while (true) { while (false) {} break; }").is_ok());
    }

    #[test]
    fn break_cannot_cross_a_function_boundary() {
        let err = parse_source("while (true) { fun f() { break; } }").unwrap_err();
        assert!(matches!(err, ParseError::BreakOutsideLoop { .. }));
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let err = parse_source("return 1;").unwrap_err();
        assert!(matches!(err, ParseError::ReturnOutsideFunction { .. }));
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        assert_eq!(
            vec!["(if a (if b (print 1) (print 2)))"],
            render("if (a) if (b) print 1; else print 2;"),
        );
    }

    #[test]
    fn missing_semicolon_points_at_end() {
        let err = parse_source("print 1").unwrap_err();
        assert_eq!("[line 1] Error at end: Expected ';' after value.", err.to_string());
    }

    #[test]
    fn parsing_is_a_pure_function_of_tokens() {
        let src = "fun f(a, b) { var c = a; while (c < b) { c++; } return c; } print f(1, 3);";
        let tokens = Scanner::new(src).scan_tokens().unwrap();
        let first = Parser::new(tokens.clone().into_iter()).parse().unwrap();
        let second = Parser::new(tokens.into_iter()).parse().unwrap();
        assert_eq!(first, second);
    }

    impl Token {
        fn make(kind: TokenKind) -> Token {
            Token { kind, lexeme: "".into(), line: 0 }
        }
    }

    impl Expr {
        fn make(b: bool) -> Expr {
            Expr::new_literal(Literal::Bool(b))
        }
    }
}
