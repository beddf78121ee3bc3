//! Error types for the IR.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
    #[error("Illegal set operation: {0}")]
    IllegalSetOperation(String),
    #[error("Unsupported expression: {0}")]
    Unsupported(String),
    #[error("Division by zero in {0}")]
    DivisionByZero(String),
    #[error("Domain {name} not found in registry")]
    DomainNotFound { name: String },
    #[error("Domain {name} already exists in registry")]
    DomainAlreadyExists { name: String },
    #[error("Random variable {name} not found in signature registry")]
    UndeclaredRandomVariable { name: String },
    #[error("Random variable {name} arity mismatch: expected {expected}, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, IrError>;
