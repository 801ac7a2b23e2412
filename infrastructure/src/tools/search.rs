//! Search tools: glob_search, grep_search
//!
//! Both walk the filesystem synchronously, so the executor runs them on the
//! blocking pool.

use super::project_root::ProjectRoot;
use foreman_domain::{
    Permission, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolResultMetadata,
};
use glob::glob;
use regex::RegexBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const GLOB_SEARCH: &str = "glob_search";
pub const GREP_SEARCH: &str = "grep_search";

const MAX_RESULTS: usize = 500;

/// Files larger than this are not grepped (5 MB)
const MAX_GREP_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules", ".venv", "__pycache__"];

pub fn glob_search_definition() -> ToolDefinition {
    ToolDefinition::new(
        GLOB_SEARCH,
        "Find files matching a glob pattern (e.g. '**/*.rs', 'src/*.toml')",
        Permission::Search,
    )
    .with_parameter(ToolParameter::new("pattern", "Glob pattern to match files", true))
    .with_parameter(
        ToolParameter::new("base_dir", "Directory to search from (default: project root)", false)
            .with_type("path"),
    )
}

pub fn grep_search_definition() -> ToolDefinition {
    ToolDefinition::new(
        GREP_SEARCH,
        "Search file contents with a regular expression",
        Permission::Search,
    )
    .with_parameter(ToolParameter::new("pattern", "Regex pattern to search for", true))
    .with_parameter(
        ToolParameter::new("path", "File or directory to search (default: project root)", false)
            .with_type("path"),
    )
    .with_parameter(ToolParameter::new(
        "file_pattern",
        "Glob filter for file names (e.g. '*.rs')",
        false,
    ))
    .with_parameter(
        ToolParameter::new("case_insensitive", "Ignore case", false).with_type("boolean"),
    )
}

fn is_skipped(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
    })
}

pub fn execute_glob_search(root: &ProjectRoot, call: &ToolCall) -> ToolResult {
    let start = Instant::now();
    let pattern = match call.require_string("pattern") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(GLOB_SEARCH, ToolError::invalid_argument(e)),
    };
    let base = match call.get_string("base_dir").map(|d| root.resolve(d)) {
        Some(Ok(dir)) => dir,
        Some(Err(e)) => return ToolResult::failure(GLOB_SEARCH, e),
        None => root.path().to_path_buf(),
    };

    let full_pattern = base.join(pattern);
    let entries = match glob(&full_pattern.to_string_lossy()) {
        Ok(paths) => paths,
        Err(e) => {
            return ToolResult::failure(
                GLOB_SEARCH,
                ToolError::invalid_argument(format!("Invalid glob pattern: {}", e)),
            );
        }
    };

    let mut matches: Vec<String> = entries
        .flatten()
        .filter(|p| !is_skipped(p.strip_prefix(root.path()).unwrap_or(p)))
        .take(MAX_RESULTS + 1)
        .map(|p| root.display(&p))
        .collect();
    let truncated = matches.len() > MAX_RESULTS;
    matches.truncate(MAX_RESULTS);
    let count = matches.len();

    let output = if matches.is_empty() {
        format!("No files match {}", pattern)
    } else if truncated {
        format!("{}\n... (limited to {} results)", matches.join("\n"), MAX_RESULTS)
    } else {
        matches.join("\n")
    };

    ToolResult::success(GLOB_SEARCH, output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        match_count: Some(count),
        ..Default::default()
    })
}

pub fn execute_grep_search(root: &ProjectRoot, call: &ToolCall) -> ToolResult {
    let start = Instant::now();
    let pattern = match call.require_string("pattern") {
        Ok(p) => p,
        Err(e) => return ToolResult::failure(GREP_SEARCH, ToolError::invalid_argument(e)),
    };
    let target = match call.get_string("path").map(|p| root.resolve(p)) {
        Some(Ok(path)) => path,
        Some(Err(e)) => return ToolResult::failure(GREP_SEARCH, e),
        None => root.path().to_path_buf(),
    };
    if !target.exists() {
        return ToolResult::failure(GREP_SEARCH, ToolError::not_found(root.display(&target)));
    }

    let regex = match RegexBuilder::new(pattern)
        .case_insensitive(call.get_bool("case_insensitive").unwrap_or(false))
        .build()
    {
        Ok(r) => r,
        Err(e) => {
            return ToolResult::failure(
                GREP_SEARCH,
                ToolError::invalid_argument(format!("Invalid regex: {}", e)),
            );
        }
    };

    let files = if target.is_file() {
        vec![target.clone()]
    } else {
        collect_files(&target, call.get_string("file_pattern"))
    };

    let mut hits = Vec::new();
    'files: for file in files {
        if fs::metadata(&file).is_ok_and(|m| m.len() > MAX_GREP_FILE_SIZE) {
            continue;
        }
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        let shown = root.display(&file);
        for (n, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                if hits.len() == MAX_RESULTS {
                    break 'files;
                }
                hits.push(format!("{}:{}: {}", shown, n + 1, line.trim_end()));
            }
        }
    }

    let count = hits.len();
    let output = match count {
        0 => format!("No matches for {}", pattern),
        MAX_RESULTS => format!("{}\n... (limited to {} matches)", hits.join("\n"), MAX_RESULTS),
        _ => hits.join("\n"),
    };

    ToolResult::success(GREP_SEARCH, output).with_metadata(ToolResultMetadata {
        duration_ms: Some(start.elapsed().as_millis() as u64),
        match_count: Some(count),
        path: Some(root.display(&target)),
        ..Default::default()
    })
}

fn collect_files(dir: &Path, file_pattern: Option<&str>) -> Vec<PathBuf> {
    let pattern = dir.join("**").join(file_pattern.unwrap_or("*"));
    let Ok(paths) = glob(&pattern.to_string_lossy()) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = paths
        .flatten()
        .filter(|p| p.is_file() && !is_skipped(p.strip_prefix(dir).unwrap_or(p)))
        .collect();
    files.sort();
    files
}
