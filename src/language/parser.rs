use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    lexer::lex,
    token::{Token, TokenKind},
};
use std::mem::discriminant;
use std::rc::Rc;

#[derive(Debug)]
pub struct Parse {
    pub statements: Vec<Stmt>,
    /// First unused expression id; feed back in as `base_id` when parsing
    /// further source against the same interpreter.
    pub next_id: ExprId,
}

pub fn parse_source(source: &str, base_id: ExprId) -> Result<Parse, SyntaxErrors> {
    let tokens = match lex(source) {
        Ok(tokens) => tokens,
        Err(errors) => {
            let errs = errors
                .into_iter()
                .map(|err| SyntaxError::new(err.message, err.span, err.line))
                .collect();
            return Err(SyntaxErrors::new(errs));
        }
    };
    Parser::new(tokens, base_id).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: ExprId,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>, base_id: ExprId) -> Self {
        Self {
            tokens,
            pos: 0,
            next_id: base_id,
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Parse, SyntaxErrors> {
        let mut statements = Vec::new();
        while !self.is_eof() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(Parse {
                statements,
                next_id: self.next_id,
            })
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn declaration(&mut self) -> Result<Stmt, SyntaxError> {
        if self.matches(TokenKind::Class) {
            return self.class_declaration();
        }
        if self.matches(TokenKind::Fun) {
            return Ok(Stmt::Function(Rc::new(self.function("function")?)));
        }
        if self.matches(TokenKind::Var) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> Result<Stmt, SyntaxError> {
        let name = self.expect_identifier("Expected class name")?;
        self.expect(TokenKind::LeftBrace, "Expected '{' before class body")?;
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            methods.push(Rc::new(self.function("method")?));
        }
        self.expect(TokenKind::RightBrace, "Expected '}' after class body")?;
        Ok(Stmt::Class(ClassStmt { name, methods }))
    }

    fn function(&mut self, kind: &str) -> Result<FunctionStmt, SyntaxError> {
        let name = self.expect_identifier(&format!("Expected {kind} name"))?;
        self.expect(TokenKind::LeftParen, &format!("Expected '(' after {kind} name"))?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier("Expected parameter name")?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "Expected ')' after parameters")?;
        self.expect(TokenKind::LeftBrace, &format!("Expected '{{' before {kind} body"))?;
        let body = self.block()?;
        Ok(FunctionStmt { name, params, body })
    }

    fn var_declaration(&mut self) -> Result<Stmt, SyntaxError> {
        let name = self.expect_identifier("Expected variable name")?;
        let initializer = if self.matches(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after variable declaration")?;
        Ok(Stmt::Var(VarStmt { name, initializer }))
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        if self.matches(TokenKind::For) {
            return self.for_statement();
        }
        if self.matches(TokenKind::If) {
            return self.if_statement();
        }
        if self.matches(TokenKind::While) {
            return self.while_statement();
        }
        if self.matches(TokenKind::Print) {
            return self.print_statement();
        }
        if self.matches(TokenKind::Return) {
            return self.return_statement();
        }
        if self.matches(TokenKind::Break) {
            let keyword = self.previous().clone();
            self.expect(TokenKind::Semicolon, "Expected ';' after 'break'")?;
            return Ok(Stmt::Break(keyword));
        }
        if self.matches(TokenKind::Continue) {
            let keyword = self.previous().clone();
            self.expect(TokenKind::Semicolon, "Expected ';' after 'continue'")?;
            return Ok(Stmt::Continue(keyword));
        }
        if self.matches(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    // The initializer runs in the surrounding environment; wrapping a
    // declaring `for` in a synthetic block keeps the loop variable from
    // leaking out of the statement.
    fn for_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect(TokenKind::LeftParen, "Expected '(' after 'for'")?;
        let initializer = if self.matches(TokenKind::Semicolon) {
            None
        } else if self.matches(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            Expr::Literal(LiteralValue::Bool(true))
        } else {
            self.expression()?
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after loop condition")?;

        let increment = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::RightParen, "Expected ')' after for clauses")?;

        let declares = matches!(initializer, Some(Stmt::Var(_)));
        let body = self.statement()?;
        let stmt = Stmt::For(Box::new(ForStmt {
            initializer,
            condition,
            increment,
            body,
        }));
        if declares {
            Ok(Stmt::Block(vec![stmt]))
        } else {
            Ok(stmt)
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "Expected ')' after if condition")?;
        let then_branch = self.statement()?;
        let else_branch = if self.matches(TokenKind::Else) {
            Some(self.statement()?)
        } else {
            None
        };
        Ok(Stmt::If(Box::new(IfStmt {
            condition,
            then_branch,
            else_branch,
        })))
    }

    fn while_statement(&mut self) -> Result<Stmt, SyntaxError> {
        self.expect(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "Expected ')' after while condition")?;
        let body = self.statement()?;
        Ok(Stmt::While(Box::new(WhileStmt { condition, body })))
    }

    // `,` after `print` separates arguments rather than forming a comma
    // expression, so each value is parsed at assignment level.
    fn print_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let mut values = vec![self.assignment()?];
        while self.matches(TokenKind::Comma) {
            values.push(self.assignment()?);
        }
        self.expect(TokenKind::Semicolon, "Expected ';' after print arguments")?;
        Ok(Stmt::Print(values))
    }

    fn return_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let keyword = self.previous().clone();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(TokenKind::Semicolon, "Expected ';' after return value")?;
        Ok(Stmt::Return(ReturnStmt { keyword, value }))
    }

    fn expression_statement(&mut self) -> Result<Stmt, SyntaxError> {
        let expr = self.expression()?;
        self.expect(TokenKind::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> Result<Vec<Stmt>, SyntaxError> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_eof() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        self.expect(TokenKind::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        self.comma()
    }

    fn comma(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.assignment()?;
        while self.matches(TokenKind::Comma) {
            let op = self.previous().clone();
            let right = self.assignment()?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn assignment(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.ternary()?;
        if self.matches(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;
            return Ok(match expr {
                Expr::Variable(var) => Expr::Assign(Box::new(AssignExpr {
                    id: var.id,
                    name: var.name,
                    value,
                })),
                Expr::Get(get) => Expr::Set(Box::new(SetExpr {
                    object: get.object,
                    name: get.name,
                    value,
                })),
                Expr::ArrayGet(get) => Expr::ArraySet(Box::new(ArraySetExpr {
                    array: get.array,
                    bracket: get.bracket,
                    index: get.index,
                    value,
                })),
                other => {
                    self.errors
                        .push(SyntaxError::at_token(&equals, "Invalid assignment target"));
                    other
                }
            });
        }
        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr, SyntaxError> {
        let expr = self.or()?;
        if self.matches(TokenKind::Question) {
            let on_true = self.expression()?;
            self.expect(TokenKind::Colon, "Expected ':' in ternary expression")?;
            let on_false = self.assignment()?;
            return Ok(Expr::Ternary(Box::new(TernaryExpr {
                condition: expr,
                on_true,
                on_false,
            })));
        }
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.and()?;
        while self.matches(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.equality()?;
        while self.matches(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(Box::new(LogicalExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.comparison()?;
        while self.matches_any(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.term()?;
        while self.matches_any(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.factor()?;
        while self.matches_any(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.unary()?;
        while self.matches_any(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary(Box::new(BinaryExpr {
                left: expr,
                op,
                right,
            }));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        if self.matches_any(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary(Box::new(UnaryExpr { op, right })));
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            if self.matches(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenKind::Dot) {
                let name = self.expect_identifier("Expected property name after '.'")?;
                expr = Expr::Get(Box::new(GetExpr { object: expr, name }));
            } else if self.matches(TokenKind::LeftBracket) {
                let bracket = self.previous().clone();
                let index = self.expression()?;
                self.expect(TokenKind::RightBracket, "Expected ']' after index")?;
                expr = Expr::ArrayGet(Box::new(ArrayGetExpr {
                    array: expr,
                    bracket,
                    index,
                }));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr, SyntaxError> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.assignment()?);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.expect(TokenKind::RightParen, "Expected ')' after arguments")?;
        Ok(Expr::Call(Box::new(CallExpr {
            callee,
            paren,
            args,
        })))
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let token = self.peek().clone();
        match &token.kind {
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Bool(false)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Bool(true)))
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Literal(LiteralValue::Nil))
            }
            TokenKind::Number(value) => {
                let value = *value;
                self.advance();
                Ok(Expr::Literal(LiteralValue::Number(value)))
            }
            TokenKind::String(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::Literal(LiteralValue::String(value)))
            }
            TokenKind::Identifier => {
                self.advance();
                Ok(Expr::Variable(VariableExpr {
                    id: self.fresh_id(),
                    name: token,
                }))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This(token))
            }
            TokenKind::Super => {
                self.advance();
                self.expect(TokenKind::Dot, "Expected '.' after 'super'")?;
                let method = self.expect_identifier("Expected method name after 'super.'")?;
                Ok(Expr::Super(SuperExpr {
                    keyword: token,
                    method,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(Expr::Grouping(Box::new(expr)))
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut values = Vec::new();
                if !self.check(&TokenKind::RightBracket) {
                    loop {
                        values.push(self.assignment()?);
                        if !self.matches(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RightBracket, "Expected ']' after array elements")?;
                Ok(Expr::Array(ArrayExpr {
                    bracket: token,
                    values,
                }))
            }
            _ => Err(SyntaxError::at_token(&token, "Expected expression")),
        }
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn is_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        if !self.is_eof() {
            self.pos += 1;
        }
        self.previous().clone()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(&self.peek().kind) == discriminant(kind)
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn matches_any(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, SyntaxError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(SyntaxError::at_token(self.peek(), message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<Token, SyntaxError> {
        self.expect(TokenKind::Identifier, message)
    }

    fn synchronize(&mut self) {
        self.advance();
        while !self.is_eof() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return
                | TokenKind::Break
                | TokenKind::Continue => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Parse {
        parse_source(source, 0).expect("parse")
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let parse = parse("1 + 2 * 3;");
        let Stmt::Expression(Expr::Binary(add)) = &parse.statements[0] else {
            panic!("expected binary expression statement");
        };
        assert_eq!(add.op.kind, TokenKind::Plus);
        let Expr::Binary(mul) = &add.right else {
            panic!("expected nested multiplication");
        };
        assert_eq!(mul.op.kind, TokenKind::Star);
    }

    #[test]
    fn comma_expression_groups_left() {
        let parse = parse("1, 2, 3;");
        let Stmt::Expression(Expr::Binary(outer)) = &parse.statements[0] else {
            panic!("expected comma expression");
        };
        assert_eq!(outer.op.kind, TokenKind::Comma);
        assert!(matches!(outer.left, Expr::Binary(_)));
    }

    #[test]
    fn ternary_is_right_associative() {
        let parse = parse("a ? 1 : b ? 2 : 3;");
        let Stmt::Expression(Expr::Ternary(outer)) = &parse.statements[0] else {
            panic!("expected ternary");
        };
        assert!(matches!(outer.on_false, Expr::Ternary(_)));
    }

    #[test]
    fn print_takes_an_argument_list() {
        let parse = parse("print 1, 2, 3;");
        let Stmt::Print(values) = &parse.statements[0] else {
            panic!("expected print statement");
        };
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn assignment_targets_are_converted() {
        let parse = parse("a = 1; a.b = 2; a[0] = 3;");
        assert!(matches!(
            parse.statements[0],
            Stmt::Expression(Expr::Assign(_))
        ));
        assert!(matches!(parse.statements[1], Stmt::Expression(Expr::Set(_))));
        assert!(matches!(
            parse.statements[2],
            Stmt::Expression(Expr::ArraySet(_))
        ));
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        let errors = parse_source("1 = 2;", 0).expect_err("should fail");
        assert!(
            errors.errors[0]
                .message
                .contains("Invalid assignment target")
        );
    }

    #[test]
    fn declaring_for_loop_gets_a_synthetic_block() {
        let parse = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        let Stmt::Block(inner) = &parse.statements[0] else {
            panic!("expected synthetic block around declaring for");
        };
        assert!(matches!(inner[0], Stmt::For(_)));
    }

    #[test]
    fn non_declaring_for_loop_is_bare() {
        let parse = parse("for (; i < 3;) print i;");
        assert!(matches!(parse.statements[0], Stmt::For(_)));
    }

    #[test]
    fn recovery_reports_multiple_errors() {
        let errors = parse_source("var = 1; print 2;\nvar = 3;", 0).expect_err("should fail");
        assert_eq!(errors.errors.len(), 2);
    }

    #[test]
    fn expression_ids_resume_from_base() {
        let first = parse("a; b;");
        assert_eq!(first.next_id, 2);
        let second = parse_source("c;", first.next_id).expect("parse");
        let Stmt::Expression(Expr::Variable(var)) = &second.statements[0] else {
            panic!("expected variable");
        };
        assert_eq!(var.id, 2);
    }

    #[test]
    fn class_body_collects_methods() {
        let parse = parse("class Point { x() { return 1; } y() { return 2; } }");
        let Stmt::Class(class) = &parse.statements[0] else {
            panic!("expected class");
        };
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].name.lexeme, "x");
    }
}
