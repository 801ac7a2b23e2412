//! Domain error types

use thiserror::Error;

/// Errors from parsing domain values out of model output or config
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown agent type: {0}")]
    UnknownAgentType(String),

    #[error("Unknown complexity: {0}")]
    UnknownComplexity(String),
}
