//! Tool implementations behind [`ToolExecutorPort`](foreman_application::ports::tool_executor::ToolExecutorPort).
//!
//! - [`LocalToolExecutor`]: file, search, and command tools run in-process
//! - [`ProtocolToolExecutor`]: routes selected tools to external tool
//!   servers, falling back to the local implementation

pub mod command;
pub mod executor;
pub mod file;
pub mod project_root;
pub mod protocol_backed;
pub mod search;

pub use executor::{LocalToolExecutor, default_tool_spec};
pub use project_root::ProjectRoot;
pub use protocol_backed::ProtocolToolExecutor;
