//! Tool execution port
//!
//! Agents see one flat tool catalog; whether a call runs in-process or on a
//! tool server is the adapter's business.

use async_trait::async_trait;
use foreman_domain::{ToolCall, ToolResult, ToolSpec};

#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Catalog offered to agents, local tools and server tools merged
    fn tool_spec(&self) -> &ToolSpec;

    /// Run one call. Failures come back inside the [`ToolResult`]; dropping
    /// the future abandons the call.
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
