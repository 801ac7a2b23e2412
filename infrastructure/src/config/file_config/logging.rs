//! Logging configuration (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL file receiving one line per supervision event
    pub run_log: Option<PathBuf>,
    /// Plain-text log file (same as `--log-file`)
    pub file: Option<PathBuf>,
}
