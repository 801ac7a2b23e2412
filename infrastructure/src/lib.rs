//! Infrastructure layer for foreman
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: the Ollama backend, local and protocol-backed tools,
//! project documentation retrieval, the JSONL run log, and configuration
//! file loading.

pub mod config;
pub mod context;
pub mod logging;
pub mod ollama;
pub mod tool_protocol;
pub mod tools;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, ConfigValidationError, FileConfig};
pub use context::ProjectDocsRetriever;
pub use logging::JsonlRunLogger;
pub use ollama::{OllamaCapabilities, OllamaGateway, OllamaSession};
pub use tool_protocol::{SessionState, ToolProtocolError, ToolServerConfig, ToolSession};
pub use tools::{LocalToolExecutor, ProtocolToolExecutor, default_tool_spec};
