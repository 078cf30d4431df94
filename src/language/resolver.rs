use crate::language::{
    ast::*,
    errors::{SyntaxError, SyntaxErrors},
    token::Token,
};
use crate::runtime::interpreter::Interpreter;
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionContext {
    None,
    Function,
}

/// Walks the parsed program once, reporting each variable use's lexical
/// distance to the interpreter and rejecting constructs that can be ruled
/// out before execution.
pub struct Resolver<'a> {
    interpreter: &'a mut Interpreter,
    scopes: Vec<HashMap<String, bool>>,
    context: FunctionContext,
    loop_depth: usize,
    errors: Vec<SyntaxError>,
}

impl<'a> Resolver<'a> {
    pub fn new(interpreter: &'a mut Interpreter) -> Self {
        Self {
            interpreter,
            scopes: Vec::new(),
            context: FunctionContext::None,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> Result<(), SyntaxErrors> {
        for statement in statements {
            self.resolve_stmt(statement);
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SyntaxErrors::new(self.errors))
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(expr) => self.resolve_expr(expr),
            Stmt::Print(values) => {
                for value in values {
                    self.resolve_expr(value);
                }
            }
            Stmt::Var(var) => {
                self.declare(&var.name);
                if let Some(initializer) = &var.initializer {
                    self.resolve_expr(initializer);
                }
                self.define(&var.name);
            }
            Stmt::Block(statements) => {
                self.begin_scope();
                for statement in statements {
                    self.resolve_stmt(statement);
                }
                self.end_scope();
            }
            Stmt::If(stmt) => {
                self.resolve_expr(&stmt.condition);
                self.resolve_stmt(&stmt.then_branch);
                if let Some(else_branch) = &stmt.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(stmt) => {
                self.resolve_expr(&stmt.condition);
                self.loop_depth += 1;
                self.resolve_stmt(&stmt.body);
                self.loop_depth -= 1;
            }
            Stmt::For(stmt) => {
                if let Some(initializer) = &stmt.initializer {
                    self.resolve_stmt(initializer);
                }
                self.resolve_expr(&stmt.condition);
                if let Some(increment) = &stmt.increment {
                    self.resolve_expr(increment);
                }
                self.loop_depth += 1;
                self.resolve_stmt(&stmt.body);
                self.loop_depth -= 1;
            }
            Stmt::Break(keyword) => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Cannot use 'break' outside of a loop");
                }
            }
            Stmt::Continue(keyword) => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Cannot use 'continue' outside of a loop");
                }
            }
            Stmt::Return(stmt) => {
                if self.context == FunctionContext::None {
                    self.error(&stmt.keyword, "Cannot return from top-level code");
                }
                if let Some(value) = &stmt.value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl);
            }
            Stmt::Class(class) => {
                self.declare(&class.name);
                self.define(&class.name);
                for method in &class.methods {
                    self.resolve_function(method);
                }
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunctionStmt) {
        let enclosing_context = std::mem::replace(&mut self.context, FunctionContext::Function);
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        for statement in &decl.body {
            self.resolve_stmt(statement);
        }
        self.end_scope();
        self.context = enclosing_context;
        self.loop_depth = enclosing_loops;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Variable(var) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&var.name.lexeme) == Some(&false) {
                        self.error(
                            &var.name,
                            "Cannot read local variable in its own initializer",
                        );
                    }
                }
                self.resolve_local(var.id, &var.name);
            }
            Expr::Assign(assign) => {
                self.resolve_expr(&assign.value);
                self.resolve_local(assign.id, &assign.name);
            }
            Expr::Unary(unary) => self.resolve_expr(&unary.right),
            Expr::Binary(binary) => {
                self.resolve_expr(&binary.left);
                self.resolve_expr(&binary.right);
            }
            Expr::Logical(logical) => {
                self.resolve_expr(&logical.left);
                self.resolve_expr(&logical.right);
            }
            Expr::Ternary(ternary) => {
                self.resolve_expr(&ternary.condition);
                self.resolve_expr(&ternary.on_true);
                self.resolve_expr(&ternary.on_false);
            }
            Expr::Call(call) => {
                self.resolve_expr(&call.callee);
                for arg in &call.args {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get(get) => self.resolve_expr(&get.object),
            Expr::Set(set) => {
                self.resolve_expr(&set.object);
                self.resolve_expr(&set.value);
            }
            Expr::This(keyword) => {
                self.error(keyword, "Cannot use 'this' outside of a class");
            }
            Expr::Super(sup) => {
                self.error(&sup.keyword, "Cannot use 'super' outside of a class");
            }
            Expr::Array(array) => {
                for value in &array.values {
                    self.resolve_expr(value);
                }
            }
            Expr::ArrayGet(get) => {
                self.resolve_expr(&get.array);
                self.resolve_expr(&get.index);
            }
            Expr::ArraySet(set) => {
                self.resolve_expr(&set.array);
                self.resolve_expr(&set.index);
                self.resolve_expr(&set.value);
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.interpreter.resolve(id, depth);
                return;
            }
        }
        // Not found locally: the global frame handles it at runtime.
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.contains_key(&name.lexeme) {
            self.errors.push(SyntaxError::at_token(
                name,
                "Already a variable with this name in this scope",
            ));
            return;
        }
        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(SyntaxError::at_token(token, message));
    }
}
