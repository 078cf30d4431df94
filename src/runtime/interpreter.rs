use crate::language::ast::*;
use crate::language::token::{Token, TokenKind};
use crate::runtime::callable::{Callable, Function, install_natives};
use crate::runtime::class::Class;
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

/// Non-local control transfer. Every statement frame threads it outward
/// until the nearest loop (break/continue) or call frame (return) claims it.
pub enum FlowSignal {
    Break(Token),
    Continue(Token),
    Return(Token, Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    env: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        let mut globals = Environment::new();
        install_natives(&mut globals);
        let globals = Rc::new(RefCell::new(globals));
        Self {
            env: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Records a resolver result: `id` refers to a slot `depth` frames up.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn resolved_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> RuntimeResult<()> {
        for statement in statements {
            if let Some(signal) = self.execute(statement)? {
                return Err(stray_signal(signal));
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> RuntimeResult<Option<FlowSignal>> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(None)
            }
            Stmt::Print(values) => {
                for value in values {
                    let value = self.evaluate(value)?;
                    let _ = write!(self.out, "{value} ");
                }
                let _ = writeln!(self.out);
                let _ = self.out.flush();
                Ok(None)
            }
            Stmt::Var(var) => {
                let value = match &var.initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.env.borrow_mut().define(var.name.lexeme.clone(), value);
                Ok(None)
            }
            Stmt::Block(statements) => {
                let env = Environment::with_enclosing(Rc::clone(&self.env));
                self.execute_block(statements, env)
            }
            Stmt::If(stmt) => {
                if self.evaluate(&stmt.condition)?.is_truthy() {
                    self.execute(&stmt.then_branch)
                } else if let Some(else_branch) = &stmt.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(None)
                }
            }
            Stmt::While(stmt) => {
                while self.evaluate(&stmt.condition)?.is_truthy() {
                    match self.execute(&stmt.body)? {
                        None | Some(FlowSignal::Continue(_)) => {}
                        Some(FlowSignal::Break(_)) => break,
                        Some(signal @ FlowSignal::Return(..)) => return Ok(Some(signal)),
                    }
                }
                Ok(None)
            }
            Stmt::For(stmt) => {
                if let Some(initializer) = &stmt.initializer {
                    if let Some(signal) = self.execute(initializer)? {
                        return Ok(Some(signal));
                    }
                }
                loop {
                    if !self.evaluate(&stmt.condition)?.is_truthy() {
                        break;
                    }
                    match self.execute(&stmt.body)? {
                        // A caught continue still runs the increment below.
                        None | Some(FlowSignal::Continue(_)) => {}
                        Some(FlowSignal::Break(_)) => break,
                        Some(signal @ FlowSignal::Return(..)) => return Ok(Some(signal)),
                    }
                    if let Some(increment) = &stmt.increment {
                        self.evaluate(increment)?;
                    }
                }
                Ok(None)
            }
            Stmt::Break(keyword) => Ok(Some(FlowSignal::Break(keyword.clone()))),
            Stmt::Continue(keyword) => Ok(Some(FlowSignal::Continue(keyword.clone()))),
            Stmt::Return(stmt) => {
                let value = match &stmt.value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Some(FlowSignal::Return(stmt.keyword.clone(), value)))
            }
            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.env));
                self.env
                    .borrow_mut()
                    .define(decl.name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(None)
            }
            Stmt::Class(class) => {
                // Two steps: the slot exists before the class object is built,
                // so bodies referencing the class by name resolve against it.
                self.env
                    .borrow_mut()
                    .define(class.name.lexeme.clone(), Value::Nil);
                let value = Value::Class(Rc::new(Class::new(class.name.lexeme.clone())));
                self.env.borrow_mut().assign(&class.name, value)?;
                Ok(None)
            }
        }
    }

    /// Runs `statements` in `env`, restoring the previous environment on
    /// every exit path: normal completion, flow signal, or runtime error.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        env: Environment,
    ) -> RuntimeResult<Option<FlowSignal>> {
        let previous = std::mem::replace(&mut self.env, Rc::new(RefCell::new(env)));
        let result = self.execute_all(statements);
        self.env = previous;
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> RuntimeResult<Option<FlowSignal>> {
        for statement in statements {
            if let Some(signal) = self.execute(statement)? {
                return Ok(Some(signal));
            }
        }
        Ok(None)
    }

    fn evaluate(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Nil => Value::Nil,
                LiteralValue::Bool(value) => Value::Bool(*value),
                LiteralValue::Number(value) => Value::Number(*value),
                LiteralValue::String(value) => Value::String(value.clone()),
            }),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Variable(var) => self.look_up_variable(&var.name, var.id),
            Expr::Assign(assign) => {
                let value = self.evaluate(&assign.value)?;
                match self.locals.get(&assign.id) {
                    Some(&distance) => Environment::assign_at(
                        &self.env,
                        distance,
                        &assign.name,
                        value.clone(),
                    )?,
                    None => self.globals.borrow_mut().assign(&assign.name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Unary(unary) => {
                let value = self.evaluate(&unary.right)?;
                match unary.op.kind {
                    TokenKind::Minus => match value {
                        Value::Number(value) => Ok(Value::Number(-value)),
                        _ => Err(type_error(&unary.op, "Operand must be a number.")),
                    },
                    TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
                    _ => Err(type_error(&unary.op, "Unknown unary operator.")),
                }
            }
            Expr::Binary(binary) => self.eval_binary(binary),
            Expr::Logical(logical) => {
                let left = self.evaluate(&logical.left)?;
                let short_circuits = match logical.op.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(&logical.right)
                }
            }
            Expr::Ternary(ternary) => {
                if self.evaluate(&ternary.condition)?.is_truthy() {
                    self.evaluate(&ternary.on_true)
                } else {
                    self.evaluate(&ternary.on_false)
                }
            }
            Expr::Call(call) => self.eval_call(call),
            Expr::Get(get) => {
                let object = self.evaluate(&get.object)?;
                match object {
                    Value::Instance(instance) => instance.get(&get.name),
                    _ => Err(type_error(&get.name, "Only instances have properties.")),
                }
            }
            Expr::Set(set) => {
                let object = self.evaluate(&set.object)?;
                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(&set.value)?;
                        instance.set(&set.name, value.clone());
                        Ok(value)
                    }
                    _ => Err(type_error(&set.name, "Only instances have fields.")),
                }
            }
            Expr::This(keyword) => Err(RuntimeError::Unimplemented {
                token: keyword.clone(),
                what: "'this' expressions",
            }),
            Expr::Super(sup) => Err(RuntimeError::Unimplemented {
                token: sup.keyword.clone(),
                what: "'super' expressions",
            }),
            Expr::Array(array) => Err(RuntimeError::Unimplemented {
                token: array.bracket.clone(),
                what: "array literals",
            }),
            Expr::ArrayGet(get) => Err(RuntimeError::Unimplemented {
                token: get.bracket.clone(),
                what: "array indexing",
            }),
            Expr::ArraySet(set) => Err(RuntimeError::Unimplemented {
                token: set.bracket.clone(),
                what: "array element assignment",
            }),
        }
    }

    fn eval_binary(&mut self, binary: &BinaryExpr) -> RuntimeResult<Value> {
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;
        let op = &binary.op;
        match op.kind {
            TokenKind::Comma => Ok(right),
            TokenKind::Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(type_error(op, "Operands must be two numbers or two strings.")),
            },
            TokenKind::Minus => numeric(op, left, right, |a, b| a - b),
            TokenKind::Star => numeric(op, left, right, |a, b| a * b),
            TokenKind::Slash => {
                let (a, b) = numbers(op, left, right)?;
                if b == 0.0 {
                    return Err(RuntimeError::DivisionByZero { token: op.clone() });
                }
                Ok(Value::Number(a / b))
            }
            TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => compare(op, left, right),
            TokenKind::EqualEqual => Ok(Value::Bool(left.equals(&right))),
            TokenKind::BangEqual => Ok(Value::Bool(!left.equals(&right))),
            _ => Err(type_error(op, "Unknown binary operator.")),
        }
    }

    fn eval_call(&mut self, call: &CallExpr) -> RuntimeResult<Value> {
        let callee = self.evaluate(&call.callee)?;
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate(arg)?);
        }

        let callable: Rc<dyn Callable> = match callee {
            Value::Function(function) => function,
            Value::Native(native) => native,
            Value::Class(class) => class,
            _ => {
                return Err(type_error(
                    &call.paren,
                    "Can only call functions and classes.",
                ));
            }
        };
        if args.len() != callable.arity() {
            return Err(RuntimeError::Arity {
                token: call.paren.clone(),
                expected: callable.arity(),
                received: args.len(),
            });
        }
        callable.call(self, args)
    }

    fn look_up_variable(&self, name: &Token, id: ExprId) -> RuntimeResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.env, distance, name),
            None => self.globals.borrow().get(name),
        }
    }
}

fn stray_signal(signal: FlowSignal) -> RuntimeError {
    let (token, message) = match signal {
        FlowSignal::Break(token) => (token, "'break' outside a loop."),
        FlowSignal::Continue(token) => (token, "'continue' outside a loop."),
        FlowSignal::Return(token, _) => (token, "'return' outside a function."),
    };
    RuntimeError::Control {
        token,
        message: message.to_string(),
    }
}

fn type_error(token: &Token, message: &str) -> RuntimeError {
    RuntimeError::Type {
        token: token.clone(),
        message: message.to_string(),
    }
}

fn numbers(op: &Token, left: Value, right: Value) -> RuntimeResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),
        _ => Err(type_error(op, "Operands must be numbers.")),
    }
}

fn numeric(op: &Token, left: Value, right: Value, apply: fn(f64, f64) -> f64) -> RuntimeResult<Value> {
    let (a, b) = numbers(op, left, right)?;
    Ok(Value::Number(apply(a, b)))
}

fn compare(op: &Token, left: Value, right: Value) -> RuntimeResult<Value> {
    let ordering = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(type_error(op, "Operands must be two numbers or two strings."));
        }
    };
    let satisfied = match ordering {
        Some(ordering) => match op.kind {
            TokenKind::Greater => ordering == Ordering::Greater,
            TokenKind::GreaterEqual => ordering != Ordering::Less,
            TokenKind::Less => ordering == Ordering::Less,
            TokenKind::LessEqual => ordering != Ordering::Greater,
            _ => false,
        },
        // NaN compares false against everything.
        None => false,
    };
    Ok(Value::Bool(satisfied))
}
