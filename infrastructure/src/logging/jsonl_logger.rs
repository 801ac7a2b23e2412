//! Append-only JSONL writer for supervision run events.

use chrono::SecondsFormat;
use foreman_application::{RunEvent, RunLogger};
use serde_json::{Map, Value};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Writes each [`RunEvent`] as one JSON object per line.
///
/// Object payloads are flattened next to `type` and `timestamp`; anything
/// else lands under `data`. The file is opened in append mode so successive
/// sessions share one log.
pub struct JsonlRunLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlRunLogger {
    /// Open (or create) the log file. Returns `None` and warns when that fails;
    /// a missing run log never stops the engine.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!("Could not create run log directory {}: {}", parent.display(), e);
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open run log {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(event: RunEvent) -> Value {
        let timestamp = event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        let mut record = Map::new();
        record.insert("type".into(), Value::from(event.event_type));
        record.insert("timestamp".into(), Value::from(timestamp));
        match event.payload {
            Value::Object(fields) => {
                for (key, value) in fields {
                    record.entry(key).or_insert(value);
                }
            }
            Value::Null => {}
            other => {
                record.insert("data".into(), other);
            }
        }
        Value::Object(record)
    }
}

impl RunLogger for JsonlRunLogger {
    fn log(&self, event: RunEvent) {
        let Ok(line) = serde_json::to_string(&Self::record(event)) else {
            return;
        };
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            warn!("Run log write to {} failed: {}", self.path.display(), e);
        }
    }
}

impl Drop for JsonlRunLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_object_payload_is_flattened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/session.jsonl");
        let logger = JsonlRunLogger::open(&path).unwrap();

        logger.log(RunEvent::new(
            "classified",
            json!({"category": "exploration", "lite": true}),
        ));
        logger.log(RunEvent::new(
            "agent_result",
            json!({"agent": "explorer", "success": false, "type": "shadowed"}),
        ));
        drop(logger);

        let records = lines(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["type"], "classified");
        assert_eq!(records[0]["category"], "exploration");
        assert_eq!(records[0]["lite"], true);
        assert!(records[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        // payload keys never replace the envelope
        assert_eq!(records[1]["type"], "agent_result");
        assert_eq!(records[1]["agent"], "explorer");
    }

    #[test]
    fn test_scalar_payload_goes_under_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        let logger = JsonlRunLogger::open(&path).unwrap();
        logger.log(RunEvent::new("note", json!("budget exhausted")));
        logger.log(RunEvent::new("reset", Value::Null));
        drop(logger);

        let records = lines(&path);
        assert_eq!(records[0]["data"], "budget exhausted");
        assert!(records[1].get("data").is_none());
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");

        JsonlRunLogger::open(&path)
            .unwrap()
            .log(RunEvent::new("first", json!({})));
        JsonlRunLogger::open(&path)
            .unwrap()
            .log(RunEvent::new("second", json!({})));

        let types: Vec<Value> = lines(&path).into_iter().map(|r| r["type"].clone()).collect();
        assert_eq!(types, vec![json!("first"), json!("second")]);
    }

    #[test]
    fn test_unopenable_path_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened for appending
        assert!(JsonlRunLogger::open(dir.path()).is_none());
    }
}
