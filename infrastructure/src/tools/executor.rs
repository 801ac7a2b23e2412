//! Local tool executor: the concrete implementation of [`ToolExecutorPort`].
//!
//! [`LocalToolExecutor`] runs the primitive tools on this machine, resolved
//! against the project directory:
//!
//! ```text
//! ToolExecutorPort::execute()
//!   ├─ unknown name / missing argument → failure result
//!   ├─ read_file, write_file, edit_file, run_command → async (tokio fs/process)
//!   └─ glob_search, grep_search → spawn_blocking
//! ```

use super::project_root::ProjectRoot;
use super::{command, file, search};
use async_trait::async_trait;
use foreman_application::ports::tool_executor::ToolExecutorPort;
use foreman_domain::{ToolCall, ToolDefinition, ToolError, ToolResult, ToolSpec};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Every primitive tool, with the aliases small models tend to reach for
pub fn default_tool_spec() -> ToolSpec {
    ToolSpec::new()
        .register(file::read_file_definition())
        .register(file::write_file_definition())
        .register(file::edit_file_definition())
        .register(command::run_command_definition())
        .register(search::glob_search_definition())
        .register(search::grep_search_definition())
        .register_aliases([
            ("cat", file::READ_FILE),
            ("read", file::READ_FILE),
            ("write", file::WRITE_FILE),
            ("edit", file::EDIT_FILE),
            ("bash", command::RUN_COMMAND),
            ("shell", command::RUN_COMMAND),
            ("glob", search::GLOB_SEARCH),
            ("find_files", search::GLOB_SEARCH),
            ("grep", search::GREP_SEARCH),
            ("search", search::GREP_SEARCH),
        ])
}

/// Executor that runs tools on the local machine
#[derive(Debug, Clone)]
pub struct LocalToolExecutor {
    tool_spec: ToolSpec,
    root: ProjectRoot,
}

impl LocalToolExecutor {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            tool_spec: default_tool_spec(),
            root: ProjectRoot::new(project_dir),
        }
    }

    pub fn project_root(&self) -> &ProjectRoot {
        &self.root
    }

    fn validate(call: &ToolCall, definition: &ToolDefinition) -> Result<(), ToolError> {
        let missing: Vec<&str> = definition
            .parameters
            .iter()
            .filter(|p| p.required && !call.arguments.contains_key(&p.name))
            .map(|p| p.name.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ToolError::invalid_argument(format!(
                "Missing required argument(s) for {}: {}",
                definition.name,
                missing.join(", ")
            )))
        }
    }

    /// Run a call whose name is already canonical.
    async fn run(&self, call: &ToolCall) -> ToolResult {
        match call.tool_name.as_str() {
            file::READ_FILE => file::execute_read_file(&self.root, call).await,
            file::WRITE_FILE => file::execute_write_file(&self.root, call).await,
            file::EDIT_FILE => file::execute_edit_file(&self.root, call).await,
            command::RUN_COMMAND => command::execute_run_command(&self.root, call).await,
            search::GLOB_SEARCH | search::GREP_SEARCH => {
                let root = self.root.clone();
                let owned = call.clone();
                let name = call.tool_name.clone();
                tokio::task::spawn_blocking(move || {
                    if owned.tool_name == search::GLOB_SEARCH {
                        search::execute_glob_search(&root, &owned)
                    } else {
                        search::execute_grep_search(&root, &owned)
                    }
                })
                .await
                .unwrap_or_else(|e| {
                    ToolResult::failure(
                        name,
                        ToolError::execution_failed(format!("Search task failed: {}", e)),
                    )
                })
            }
            other => ToolResult::failure(other, ToolError::not_found(format!("tool {}", other))),
        }
    }
}

impl Default for LocalToolExecutor {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl ToolExecutorPort for LocalToolExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        &self.tool_spec
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(definition) = self.tool_spec.get_resolved(&call.tool_name) else {
            return ToolResult::failure(
                &call.tool_name,
                ToolError::not_found(format!("tool {}", call.tool_name)),
            );
        };

        let mut call = call.clone();
        call.tool_name = definition.name.clone();
        if let Err(e) = Self::validate(&call, definition) {
            return ToolResult::failure(&call.tool_name, e);
        }

        let start = Instant::now();
        let result = self.run(&call).await;
        debug!(
            "LocalTools: {} -> {} in {}ms",
            call.describe(),
            if result.is_success() { "ok" } else { "failed" },
            start.elapsed().as_millis()
        );
        result
    }
}
