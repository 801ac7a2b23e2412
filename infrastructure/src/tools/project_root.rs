//! Path resolution against the project directory

use foreman_domain::ToolError;
use std::path::{Component, Path, PathBuf};

/// Directory the tools operate in.
///
/// Relative paths from tool calls resolve against it; absolute paths are
/// taken as given.
#[derive(Debug, Clone)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path.
    ///
    /// Relative paths may not climb out of the root with `..`.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf, ToolError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ToolError::invalid_argument("Path is empty"));
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let mut depth: i32 = 0;
        for component in path.components() {
            match component {
                Component::ParentDir => depth -= 1,
                Component::Normal(_) => depth += 1,
                _ => {}
            }
            if depth < 0 {
                return Err(ToolError::permission_denied(format!(
                    "{} (outside the project directory)",
                    raw
                )));
            }
        }
        Ok(self.root.join(path))
    }

    /// Display form of a path: relative to the root when inside it
    pub fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

impl Default for ProjectRoot {
    fn default() -> Self {
        Self::new(".")
    }
}
