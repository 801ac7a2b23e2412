//! File operation tools: read_file, write_file, edit_file

use super::project_root::ProjectRoot;
use foreman_domain::{
    Permission, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata,
};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Instant;
use tokio::fs;

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const EDIT_FILE: &str = "edit_file";

/// Maximum file size to read (10 MB)
const MAX_READ_SIZE: u64 = 10 * 1024 * 1024;

pub fn read_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        READ_FILE,
        "Read a file. Lines are numbered; use offset/limit for large files.",
        Permission::Read,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to read", true).with_type("path"))
    .with_parameter(
        ToolParameter::new("offset", "First line to read (0-indexed)", false).with_type("number"),
    )
    .with_parameter(
        ToolParameter::new("limit", "Maximum number of lines to read", false).with_type("number"),
    )
}

pub fn write_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        WRITE_FILE,
        "Write content to a file, creating it (and missing parent directories) or replacing it.",
        Permission::Write,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to write", true).with_type("path"))
    .with_parameter(ToolParameter::new("content", "Full new content of the file", true))
}

pub fn edit_file_definition() -> ToolDefinition {
    ToolDefinition::new(
        EDIT_FILE,
        "Replace one exact occurrence of old_string with new_string in a file.",
        Permission::Write,
    )
    .with_parameter(ToolParameter::new("path", "Path to the file to edit", true).with_type("path"))
    .with_parameter(ToolParameter::new(
        "old_string",
        "Exact text to replace; must occur exactly once unless replace_all is set",
        true,
    ))
    .with_parameter(ToolParameter::new("new_string", "Replacement text", true))
    .with_parameter(
        ToolParameter::new("replace_all", "Replace every occurrence", false).with_type("boolean"),
    )
}

fn io_failure(tool: &str, path: &str, e: std::io::Error) -> ToolResult {
    let error = match e.kind() {
        ErrorKind::NotFound => ToolError::not_found(path),
        ErrorKind::PermissionDenied => ToolError::permission_denied(path),
        _ => ToolError::execution_failed(format!("{}: {}", path, e)),
    };
    ToolResult::failure(tool, error)
}

async fn read_text(tool: &str, path: &Path, shown: &str) -> Result<String, ToolResult> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| io_failure(tool, shown, e))?;
    if !metadata.is_file() {
        return Err(ToolResult::failure(
            tool,
            ToolError::invalid_argument(format!("'{}' is not a file", shown)),
        ));
    }
    if metadata.len() > MAX_READ_SIZE {
        return Err(ToolResult::failure(
            tool,
            ToolError::invalid_argument(format!(
                "File too large ({} bytes, limit {})",
                metadata.len(),
                MAX_READ_SIZE
            )),
        ));
    }
    fs::read_to_string(path)
        .await
        .map_err(|e| io_failure(tool, shown, e))
}

pub async fn execute_read_file(root: &ProjectRoot, call: &ToolCall) -> ToolResult {
    let start = Instant::now();
    let raw = match call.require_string("path") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(READ_FILE, ToolError::invalid_argument(e)),
    };
    let path = match root.resolve(raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(READ_FILE, e),
    };
    let content = match read_text(READ_FILE, &path, raw).await {
        Ok(c) => c,
        Err(failure) => return failure,
    };

    let offset = call.get_i64("offset").unwrap_or(0).max(0) as usize;
    let limit = call.get_i64("limit").map(|l| l.max(0) as usize);
    let output: String = content
        .lines()
        .enumerate()
        .skip(offset)
        .take(limit.unwrap_or(usize::MAX))
        .map(|(n, line)| format!("{:>5}\t{}\n", n + 1, line))
        .collect();

    ToolResult::success(READ_FILE, output.clone()).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(output.len()),
        path: Some(root.display(&path)),
        ..Default::default()
    })
}

pub async fn execute_write_file(root: &ProjectRoot, call: &ToolCall) -> ToolResult {
    let start = Instant::now();
    let (raw, content) = match (call.require_string("path"), call.require_string("content")) {
        (Ok(p), Ok(c)) => (p, c),
        (Err(e), _) | (_, Err(e)) => {
            return ToolResult::failure(WRITE_FILE, ToolError::invalid_argument(e));
        }
    };
    let path = match root.resolve(raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(WRITE_FILE, e),
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent).await
    {
        return io_failure(WRITE_FILE, raw, e);
    }
    if let Err(e) = fs::write(&path, content).await {
        return io_failure(WRITE_FILE, raw, e);
    }

    ToolResult::success(
        WRITE_FILE,
        format!("Wrote {} bytes to {}", content.len(), root.display(&path)),
    )
    .with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(content.len()),
        path: Some(root.display(&path)),
        ..Default::default()
    })
}

pub async fn execute_edit_file(root: &ProjectRoot, call: &ToolCall) -> ToolResult {
    let start = Instant::now();
    let args = (
        call.require_string("path"),
        call.require_string("old_string"),
        call.require_string("new_string"),
    );
    let (raw, old, new) = match args {
        (Ok(p), Ok(o), Ok(n)) => (p, o, n),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => {
            return ToolResult::failure(EDIT_FILE, ToolError::invalid_argument(e));
        }
    };
    if old.is_empty() {
        return ToolResult::failure(
            EDIT_FILE,
            ToolError::invalid_argument("old_string must not be empty"),
        );
    }
    let path = match root.resolve(raw) {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(EDIT_FILE, e),
    };
    let content = match read_text(EDIT_FILE, &path, raw).await {
        Ok(c) => c,
        Err(failure) => return failure,
    };

    let occurrences = content.matches(old).count();
    let replace_all = call.get_bool("replace_all").unwrap_or(false);
    let updated = match occurrences {
        0 => {
            return ToolResult::failure(
                EDIT_FILE,
                ToolError::invalid_argument(format!("old_string not found in {}", raw)),
            );
        }
        1 => content.replacen(old, new, 1),
        _ if replace_all => content.replace(old, new),
        n => {
            return ToolResult::failure(
                EDIT_FILE,
                ToolError::invalid_argument(format!(
                    "old_string occurs {} times in {}; add context or set replace_all",
                    n, raw
                )),
            );
        }
    };

    if let Err(e) = fs::write(&path, &updated).await {
        return io_failure(EDIT_FILE, raw, e);
    }
    ToolResult::success(
        EDIT_FILE,
        format!(
            "Replaced {} occurrence(s) in {}",
            occurrences,
            root.display(&path)
        ),
    )
    .with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        bytes: Some(updated.len()),
        path: Some(root.display(&path)),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_file_numbers_lines_and_windows() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "one\ntwo\nthree\nfour\n").unwrap();
        let root = ProjectRoot::new(dir.path());

        let all = execute_read_file(&root, &ToolCall::new(READ_FILE).with_arg("path", "a.txt")).await;
        assert!(all.is_success());
        assert!(all.output().unwrap().contains("    1\tone"));
        assert_eq!(all.metadata.path.as_deref(), Some("a.txt"));

        let window = execute_read_file(
            &root,
            &ToolCall::new(READ_FILE)
                .with_arg("path", "a.txt")
                .with_arg("offset", 1)
                .with_arg("limit", 2),
        )
        .await;
        assert_eq!(window.output().unwrap(), "    2\ttwo\n    3\tthree\n");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempdir().unwrap();
        let root = ProjectRoot::new(dir.path());
        let result =
            execute_read_file(&root, &ToolCall::new(READ_FILE).with_arg("path", "nope.rs")).await;
        assert_eq!(result.error().unwrap().code, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let root = ProjectRoot::new(dir.path());
        let result = execute_write_file(
            &root,
            &ToolCall::new(WRITE_FILE)
                .with_arg("path", "src/new/mod.rs")
                .with_arg("content", "pub fn f() {}\n"),
        )
        .await;
        assert!(result.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/new/mod.rs")).unwrap(),
            "pub fn f() {}\n"
        );
    }

    #[tokio::test]
    async fn test_edit_requires_unique_match() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("c.rs"), "let a = 1;\nlet b = 1;\n").unwrap();
        let root = ProjectRoot::new(dir.path());

        let ambiguous = execute_edit_file(
            &root,
            &ToolCall::new(EDIT_FILE)
                .with_arg("path", "c.rs")
                .with_arg("old_string", "= 1")
                .with_arg("new_string", "= 2"),
        )
        .await;
        assert_eq!(ambiguous.error().unwrap().code, "INVALID_ARGUMENT");

        let unique = execute_edit_file(
            &root,
            &ToolCall::new(EDIT_FILE)
                .with_arg("path", "c.rs")
                .with_arg("old_string", "let b = 1")
                .with_arg("new_string", "let b = 2"),
        )
        .await;
        assert!(unique.is_success());

        let all = execute_edit_file(
            &root,
            &ToolCall::new(EDIT_FILE)
                .with_arg("path", "c.rs")
                .with_arg("old_string", "let")
                .with_arg("new_string", "const")
                .with_arg("replace_all", true),
        )
        .await;
        assert!(all.is_success());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("c.rs")).unwrap(),
            "const a = 1;\nconst b = 2;\n"
        );
    }
}
