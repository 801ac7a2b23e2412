//! Model capability lookup port

use async_trait::async_trait;
use foreman_domain::Model;

/// Answers whether a model accepts structured tool definitions.
///
/// When it does not, tool schemas are described in the system prompt and
/// tool calls are extracted from the reply text instead.
#[async_trait]
pub trait ModelCapabilities: Send + Sync {
    async fn supports_tool_calls(&self, model: &Model) -> bool;
}

/// Fixed answer for every model.
pub struct StaticCapabilities {
    native_tools: bool,
}

impl StaticCapabilities {
    pub fn native() -> Self {
        Self { native_tools: true }
    }

    pub fn text_only() -> Self {
        Self {
            native_tools: false,
        }
    }
}

#[async_trait]
impl ModelCapabilities for StaticCapabilities {
    async fn supports_tool_calls(&self, _model: &Model) -> bool {
        self.native_tools
    }
}
