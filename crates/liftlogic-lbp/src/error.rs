//! Error types for lifted belief propagation.

use liftlogic_ir::IrError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LbpError {
    /// A rewriter received an argument of the wrong shape or arity.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// The model admits no value of a random variable with nonzero weight.
    #[error("Model admits no consistent assignment: {0}")]
    ModelInconsistency(String),

    #[error("Illegal set operation: {0}")]
    IllegalSetOperation(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The query's cancellation token was triggered.
    #[error("Query {query_id} was cancelled")]
    Cancelled { query_id: u64 },

    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Coarse classification of failures reported by a belief query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedInput,
    ModelInconsistency,
    IllegalSetOperation,
    InvalidModel,
    InvalidConfiguration,
    Unsupported,
    Cancelled,
}

impl LbpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LbpError::IllegalArgument(_) => ErrorKind::MalformedInput,
            LbpError::ModelInconsistency(_) => ErrorKind::ModelInconsistency,
            LbpError::IllegalSetOperation(_) => ErrorKind::IllegalSetOperation,
            LbpError::InvalidModel(_) => ErrorKind::InvalidModel,
            LbpError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            LbpError::Cancelled { .. } => ErrorKind::Cancelled,
            LbpError::Ir(inner) => match inner {
                IrError::IllegalSetOperation(_) => ErrorKind::IllegalSetOperation,
                IrError::Unsupported(_) => ErrorKind::Unsupported,
                IrError::DivisionByZero(_) => ErrorKind::ModelInconsistency,
                IrError::DomainNotFound { .. }
                | IrError::DomainAlreadyExists { .. }
                | IrError::UndeclaredRandomVariable { .. }
                | IrError::ArityMismatch { .. } => ErrorKind::InvalidModel,
                IrError::IllegalArgument(_) => ErrorKind::MalformedInput,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LbpError>;
