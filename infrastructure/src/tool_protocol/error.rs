//! Error types for the tool protocol client

use super::session::SessionState;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolProtocolError>;

#[derive(Error, Debug)]
pub enum ToolProtocolError {
    #[error("Tool server '{server}' failed to start: {reason}")]
    Startup { server: String, reason: String },

    #[error("Call '{method}' timed out after {after:?}")]
    Timeout { method: String, after: Duration },

    #[error("Tool server connection lost: {0}")]
    Connection(String),

    #[error("Tool session is {0}; start() it first")]
    NotReady(SessionState),

    #[error("JSON-RPC error (code {code}): {message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid tool server configuration: {0}")]
    Config(String),
}

impl ToolProtocolError {
    /// Failures of the session rather than of the call itself; the caller
    /// may run a local implementation instead.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            ToolProtocolError::Startup { .. }
                | ToolProtocolError::Timeout { .. }
                | ToolProtocolError::Connection(_)
                | ToolProtocolError::NotReady(_)
        )
    }
}
