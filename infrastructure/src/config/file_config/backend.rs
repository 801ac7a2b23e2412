//! Inference backend configuration (`[backend]` section)

use serde::{Deserialize, Serialize};

/// ```toml
/// [backend]
/// url = "http://localhost:11434"
/// native_tools = false   # skip the capability lookup, force text tool calls
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBackendConfig {
    pub url: String,
    /// Overrides the per-model tool-calling lookup when set
    pub native_tools: Option<bool>,
}

impl Default for FileBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            native_tools: None,
        }
    }
}
