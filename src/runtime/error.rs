use crate::language::token::Token;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Every runtime fault carries the token it was raised at so the driver can
/// report the offending line.
#[derive(Debug, Error, Clone)]
pub enum RuntimeError {
    #[error("{message}")]
    Type { token: Token, message: String },
    #[error("Expected {expected} arguments but got {received}.")]
    Arity {
        token: Token,
        expected: usize,
        received: usize,
    },
    #[error("Division by zero.")]
    DivisionByZero { token: Token },
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { token: Token, name: String },
    #[error("Undefined property '{name}'.")]
    UndefinedProperty { token: Token, name: String },
    #[error("{message}")]
    Control { token: Token, message: String },
    #[error("Unsupported construct: {what}.")]
    Unimplemented { token: Token, what: &'static str },
}

impl RuntimeError {
    pub fn token(&self) -> &Token {
        match self {
            RuntimeError::Type { token, .. }
            | RuntimeError::Arity { token, .. }
            | RuntimeError::DivisionByZero { token }
            | RuntimeError::UndefinedVariable { token, .. }
            | RuntimeError::UndefinedProperty { token, .. }
            | RuntimeError::Control { token, .. }
            | RuntimeError::Unimplemented { token, .. } => token,
        }
    }

    pub fn line(&self) -> usize {
        self.token().line
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RuntimeError::Type { .. } => "type error",
            RuntimeError::Arity { .. } => "arity error",
            RuntimeError::DivisionByZero { .. } => "division by zero",
            RuntimeError::UndefinedVariable { .. } => "undefined variable",
            RuntimeError::UndefinedProperty { .. } => "undefined property",
            RuntimeError::Control { .. } => "control flow error",
            RuntimeError::Unimplemented { .. } => "unsupported construct",
        }
    }
}
