//! Tool domain value objects: results and errors
//!
//! Every call an agent makes ends as a [`ToolResult`], whether the tool ran
//! in-process or on a tool server. Failures never escape as Rust errors:
//! they are carried inside the result so the agent loop can feed them back
//! to the model and keep going.

use serde::{Deserialize, Serialize};

/// Error that occurred during tool execution.
///
/// The code tells the model what kind of mistake it made:
///
/// | Code | Raised by | Meaning for the model |
/// |------|-----------|-----------------------|
/// | `INVALID_ARGUMENT` | local tools | fix the arguments and call again |
/// | `NOT_FOUND` | agent loop, local tools | unknown tool, or a path that does not exist |
/// | `PERMISSION_DENIED` | agent loop, project root guard | the agent type may not use this tool, or the path leaves the project |
/// | `EXECUTION_FAILED` | local tools, tool servers | the tool ran and failed |
/// | `TIMEOUT` | `run_command` | the command exceeded its time limit |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "PERMISSION_DENIED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            "NOT_FOUND",
            format!("Resource not found: {}", resource.into()),
        )
    }

    pub fn permission_denied(resource: impl Into<String>) -> Self {
        Self::new(
            "PERMISSION_DENIED",
            format!("Permission denied: {}", resource.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("INVALID_ARGUMENT", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("EXECUTION_FAILED", message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            "TIMEOUT",
            format!("Operation timed out: {}", operation.into()),
        )
    }

}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution.
///
/// Exactly one of `output` and `error` is set, matching `success`. Remote
/// results record the serving tool server in [`ToolResultMetadata::server`];
/// a local fallback after a server failure leaves it empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Output content (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Error information (for failed execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Metadata about the execution
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

/// Structured metadata about tool execution.
///
/// Handed to progress observers with the result; the model only ever sees
/// [`ToolResult::to_context`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Wall time of the call, including any tool server round trip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Size of the content read, written or captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Project-relative path the call touched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Exit status of `run_command` (`-1` when killed by a signal)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Hits reported by the search tools
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
    /// Tool server that served the call, when not run locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: Some(output.into()),
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    /// Tag a result as served by the named tool server.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.metadata.server = Some(server.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Text fed back to the model after the call.
    ///
    /// Output is cut at `max_bytes` on a character boundary with a `...`
    /// marker; errors are never truncated.
    pub fn to_context(&self, max_bytes: usize) -> String {
        match (&self.output, &self.error) {
            (_, Some(error)) => format!("[{}] ERROR {}", self.tool_name, error),
            (Some(output), None) => format!(
                "[{}] OK\n{}",
                self.tool_name,
                crate::util::truncate(output, max_bytes)
            ),
            (None, None) => format!("[{}] OK (no output)", self.tool_name),
        }
    }
}
