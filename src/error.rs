//! Error types for the rule engine

use thiserror::Error;

use crate::rule::Operator;
use crate::store::RuleId;

/// Main error type for the rule engine
#[derive(Error, Debug)]
pub enum RuleEngineError {
    #[error("Lex error at {position}: {message}")]
    Lex { position: usize, message: String },

    #[error("Parse error at {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch on field '{field}': operator {operator} cannot compare {found} with {expected}")]
    TypeMismatch {
        field: String,
        operator: Operator,
        found: &'static str,
        expected: &'static str,
    },

    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl RuleEngineError {
    pub(crate) fn lex(position: usize, message: impl Into<String>) -> Self {
        Self::Lex {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<RuleEngineError> for pyo3::PyErr {
    fn from(err: RuleEngineError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyKeyError, PyTypeError, PyValueError};

        match err {
            RuleEngineError::TypeMismatch { .. } => PyTypeError::new_err(err.to_string()),
            RuleEngineError::RuleNotFound(_) => PyKeyError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Result type alias for the rule engine
pub type Result<T> = std::result::Result<T, RuleEngineError>;
