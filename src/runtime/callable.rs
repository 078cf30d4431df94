use crate::language::ast::FunctionStmt;
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::interpreter::{FlowSignal, Interpreter};
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Anything that can sit left of a call's `(...)`. The evaluator checks
/// arity before dispatching.
pub trait Callable {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> RuntimeResult<Value>;
}

/// A user function: parameter list and body shared with the AST, plus the
/// environment it closed over at its definition.
pub struct Function {
    declaration: Rc<FunctionStmt>,
    closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionStmt>, closure: Rc<RefCell<Environment>>) -> Self {
        Self {
            declaration,
            closure,
        }
    }
}

impl Callable for Function {
    fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let mut env = Environment::with_enclosing(Rc::clone(&self.closure));
        for (param, value) in self.declaration.params.iter().zip(args) {
            env.define(param.lexeme.clone(), value);
        }
        match interpreter.execute_block(&self.declaration.body, env)? {
            Some(FlowSignal::Return(_, value)) => Ok(value),
            Some(FlowSignal::Break(token)) => Err(RuntimeError::Control {
                token,
                message: "'break' crossed a function boundary.".to_string(),
            }),
            Some(FlowSignal::Continue(token)) => Err(RuntimeError::Control {
                token,
                message: "'continue' crossed a function boundary.".to_string(),
            }),
            None => Ok(Value::Nil),
        }
    }
}

// Closures can be reachable from their own captured frame; Debug prints the
// tag only instead of walking that cycle.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

pub type NativeFn = fn(&mut Interpreter, Vec<Value>) -> RuntimeResult<Value>;

#[derive(Debug)]
pub struct NativeFunction {
    pub name: &'static str,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, func: NativeFn) -> Self {
        Self { name, arity, func }
    }
}

impl Callable for NativeFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        self: Rc<Self>,
        interpreter: &mut Interpreter,
        args: Vec<Value>,
    ) -> RuntimeResult<Value> {
        (self.func)(interpreter, args)
    }
}

/// Installs the built-in functions into the global frame.
pub fn install_natives(globals: &mut Environment) {
    let natives = [
        NativeFunction::new("clock", 0, native_clock),
        NativeFunction::new("str", 1, native_str),
    ];
    for native in natives {
        globals.define(native.name, Value::Native(Rc::new(native)));
    }
}

fn native_clock(_interpreter: &mut Interpreter, _args: Vec<Value>) -> RuntimeResult<Value> {
    let seconds = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or_default();
    Ok(Value::Number(seconds))
}

fn native_str(_interpreter: &mut Interpreter, args: Vec<Value>) -> RuntimeResult<Value> {
    let value = args.into_iter().next().unwrap_or(Value::Nil);
    Ok(Value::String(value.to_string()))
}
