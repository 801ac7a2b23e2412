//! Command execution tool: run_command

use super::project_root::ProjectRoot;
use foreman_domain::{
    Permission, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata, util::truncate_str,
};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

pub const RUN_COMMAND: &str = "run_command";

const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_TIMEOUT_SECS: u64 = 600;

/// Maximum output kept (1 MB)
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

pub fn run_command_definition() -> ToolDefinition {
    ToolDefinition::new(
        RUN_COMMAND,
        "Run a shell command in the project directory and return its output",
        Permission::Bash,
    )
    .with_parameter(ToolParameter::new("command", "The command line to run", true))
    .with_parameter(
        ToolParameter::new("working_dir", "Directory to run in (default: project root)", false)
            .with_type("path"),
    )
    .with_parameter(
        ToolParameter::new("timeout_secs", "Timeout in seconds (default: 60)", false)
            .with_type("number"),
    )
}

fn shell(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    }
}

/// Run the command; the child is killed if the future is dropped.
pub async fn execute_run_command(root: &ProjectRoot, call: &ToolCall) -> ToolResult {
    let start = Instant::now();
    let command = match call.require_string("command") {
        Ok(c) => c,
        Err(e) => return ToolResult::failure(RUN_COMMAND, ToolError::invalid_argument(e)),
    };
    let dir = match call.get_string("working_dir").map(|d| root.resolve(d)) {
        Some(Ok(dir)) => dir,
        Some(Err(e)) => return ToolResult::failure(RUN_COMMAND, e),
        None => root.path().to_path_buf(),
    };
    if !dir.is_dir() {
        return ToolResult::failure(
            RUN_COMMAND,
            ToolError::not_found(format!("Working directory {}", dir.display())),
        );
    }
    let timeout_secs = call
        .get_i64("timeout_secs")
        .map(|t| t.clamp(1, MAX_TIMEOUT_SECS as i64) as u64)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let child = shell(command)
        .current_dir(&dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let child = match child {
        Ok(c) => c,
        Err(e) => {
            return ToolResult::failure(
                RUN_COMMAND,
                ToolError::execution_failed(format!("Failed to spawn command: {}", e)),
            );
        }
    };

    let output = match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        child.wait_with_output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return ToolResult::failure(
                RUN_COMMAND,
                ToolError::execution_failed(format!("Failed to wait for command: {}", e)),
            );
        }
        Err(_) => {
            return ToolResult::failure(
                RUN_COMMAND,
                ToolError::timeout(format!("{} (after {}s)", command, timeout_secs)),
            );
        }
    };

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut combined = stdout.into_owned();
    if !stderr.is_empty() {
        if !combined.is_empty() {
            combined.push_str("\n--- stderr ---\n");
        }
        combined.push_str(&stderr);
    }
    if combined.len() > MAX_OUTPUT_SIZE {
        combined = format!(
            "{}\n... (output truncated)",
            truncate_str(&combined, MAX_OUTPUT_SIZE)
        );
    }

    let metadata = ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(combined.len()),
        exit_code: Some(exit_code),
        ..Default::default()
    };

    // A non-zero exit is still a tool success; the agent reads the code.
    let text = if output.status.success() {
        combined
    } else {
        format!("Command exited with code {}\n{}", exit_code, combined)
    };
    ToolResult::success(RUN_COMMAND, text).with_metadata(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_in_project_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let root = ProjectRoot::new(dir.path());

        let result =
            execute_run_command(&root, &ToolCall::new(RUN_COMMAND).with_arg("command", "ls")).await;
        assert!(result.is_success());
        assert!(result.output().unwrap().contains("marker.txt"));
        assert_eq!(result.metadata.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let root = ProjectRoot::default();
        let result = execute_run_command(
            &root,
            &ToolCall::new(RUN_COMMAND).with_arg("command", "echo oops >&2; exit 3"),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(result.metadata.exit_code, Some(3));
        let output = result.output().unwrap();
        assert!(output.starts_with("Command exited with code 3"));
        assert!(output.contains("oops"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let root = ProjectRoot::default();
        let result = execute_run_command(
            &root,
            &ToolCall::new(RUN_COMMAND)
                .with_arg("command", "sleep 5")
                .with_arg("timeout_secs", 1),
        )
        .await;
        assert_eq!(result.error().unwrap().code, "TIMEOUT");
    }

    #[tokio::test]
    async fn test_missing_working_dir() {
        let root = ProjectRoot::default();
        let result = execute_run_command(
            &root,
            &ToolCall::new(RUN_COMMAND)
                .with_arg("command", "true")
                .with_arg("working_dir", "/nonexistent/dir"),
        )
        .await;
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");
    }
}
