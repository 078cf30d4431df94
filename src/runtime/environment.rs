use crate::language::token::Token;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A binding frame: name-to-value slots plus a link to the enclosing frame.
/// Frames are shared (`Rc<RefCell<_>>`) because closures keep their defining
/// frame alive and observe later assignments to it.
pub struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, Value>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            enclosing: None,
            values: HashMap::new(),
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            enclosing: Some(enclosing),
            values: HashMap::new(),
        }
    }

    /// Creates or overwrites a slot in this frame, shadowing outer frames.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Name-only lookup: this frame first, then up the chain.
    pub fn get(&self, name: &Token) -> RuntimeResult<Value> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }
        let mut next = self.enclosing.clone();
        while let Some(env) = next {
            let env = env.borrow();
            if let Some(value) = env.values.get(&name.lexeme) {
                return Ok(value.clone());
            }
            next = env.enclosing.clone();
        }
        Err(undefined(name))
    }

    /// Overwrites the first slot found walking up the chain.
    pub fn assign(&mut self, name: &Token, value: Value) -> RuntimeResult<()> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            return Ok(());
        }
        let mut next = self.enclosing.clone();
        while let Some(env) = next {
            if env.borrow().values.contains_key(&name.lexeme) {
                env.borrow_mut().values.insert(name.lexeme.clone(), value);
                return Ok(());
            }
            let enclosing = env.borrow().enclosing.clone();
            next = enclosing;
        }
        Err(undefined(name))
    }

    /// Reads from the frame exactly `distance` hops up. The resolver
    /// guarantees the slot exists; a miss still fails precisely rather than
    /// walking further.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
    ) -> RuntimeResult<Value> {
        let frame = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let value = frame.borrow().values.get(&name.lexeme).cloned();
        value.ok_or_else(|| undefined(name))
    }

    /// Writes to the frame exactly `distance` hops up.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &Token,
        value: Value,
    ) -> RuntimeResult<()> {
        let frame = Self::ancestor(env, distance).ok_or_else(|| undefined(name))?;
        let mut frame = frame.borrow_mut();
        if frame.values.contains_key(&name.lexeme) {
            frame.values.insert(name.lexeme.clone(), value);
            Ok(())
        } else {
            Err(undefined(name))
        }
    }

    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);
        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }
        Some(current)
    }
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::UndefinedVariable {
        token: name.clone(),
        name: name.lexeme.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::Span;
    use crate::language::token::TokenKind;

    fn token(name: &str) -> Token {
        Token {
            kind: TokenKind::Identifier,
            lexeme: name.to_string(),
            line: 1,
            span: Span::new(0, name.len()),
        }
    }

    fn shared(env: Environment) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(env))
    }

    #[test]
    fn define_then_get() {
        let mut env = Environment::new();
        env.define("a", Value::Number(1.0));
        assert!(env.get(&token("a")).expect("get").equals(&Value::Number(1.0)));
    }

    #[test]
    fn get_walks_the_chain() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let child = Environment::with_enclosing(Rc::clone(&global));
        assert!(
            child
                .get(&token("a"))
                .expect("get")
                .equals(&Value::Number(1.0))
        );
    }

    #[test]
    fn define_shadows_without_touching_outer() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let mut child = Environment::with_enclosing(Rc::clone(&global));
        child.define("a", Value::Number(2.0));
        assert!(
            child
                .get(&token("a"))
                .expect("get")
                .equals(&Value::Number(2.0))
        );
        assert!(
            global
                .borrow()
                .get(&token("a"))
                .expect("get")
                .equals(&Value::Number(1.0))
        );
    }

    #[test]
    fn assign_overwrites_first_slot_found() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let mut child = Environment::with_enclosing(Rc::clone(&global));
        child.assign(&token("a"), Value::Number(5.0)).expect("assign");
        assert!(
            global
                .borrow()
                .get(&token("a"))
                .expect("get")
                .equals(&Value::Number(5.0))
        );
    }

    #[test]
    fn assign_to_unknown_name_fails() {
        let mut env = Environment::new();
        let err = env.assign(&token("ghost"), Value::Nil).expect_err("fail");
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn get_at_reads_the_exact_frame() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let middle = shared(Environment::with_enclosing(Rc::clone(&global)));
        middle.borrow_mut().define("a", Value::Number(2.0));
        let inner = shared(Environment::with_enclosing(Rc::clone(&middle)));

        let at0 = Environment::get_at(&middle, 0, &token("a")).expect("get_at");
        assert!(at0.equals(&Value::Number(2.0)));
        let at2 = Environment::get_at(&inner, 2, &token("a")).expect("get_at");
        assert!(at2.equals(&Value::Number(1.0)));
    }

    #[test]
    fn assign_at_writes_the_exact_frame() {
        let global = shared(Environment::new());
        global.borrow_mut().define("a", Value::Number(1.0));
        let inner = shared(Environment::with_enclosing(Rc::clone(&global)));
        Environment::assign_at(&inner, 1, &token("a"), Value::Number(9.0)).expect("assign_at");
        assert!(
            global
                .borrow()
                .get(&token("a"))
                .expect("get")
                .equals(&Value::Number(9.0))
        );
    }

    #[test]
    fn get_at_past_the_chain_fails() {
        let global = shared(Environment::new());
        let err = Environment::get_at(&global, 3, &token("a")).expect_err("fail");
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
    }
}
