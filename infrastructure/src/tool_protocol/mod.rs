//! Tool protocol client: JSON-RPC 2.0 sessions with external tool servers.
//!
//! A [`ToolSession`] speaks to one server over a child process's
//! stdin/stdout ([`PipeTransport`], newline-framed) or over HTTP
//! ([`HttpTransport`]). Several calls may be in flight on one session;
//! responses are matched to callers by request id.

mod config;
mod connection;
mod error;
mod http;
mod message;
mod pending;
mod pipe;
mod session;

pub use config::{DEFAULT_CALL_TIMEOUT, DEFAULT_STARTUP_TIMEOUT, ToolServerConfig, TransportConfig};
pub use connection::LineConnection;
pub use error::{Result, ToolProtocolError};
pub use http::HttpTransport;
pub use message::{
    ContentBlock, JsonRpcRequest, JsonRpcResponse, MessageKind, RemoteTool, RpcError,
    ToolCallOutput, classify_message,
};
pub use pipe::{PipeCommand, PipeTransport};
pub use session::{SessionState, ToolSession};
