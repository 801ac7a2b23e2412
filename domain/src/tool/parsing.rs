//! Extraction of tool calls embedded in model text
//!
//! Models without native tool calling are asked to emit JSON objects such
//! as `{"name": "read_file", "arguments": {"path": "src/lib.rs"}}`. The
//! helpers here pull those objects out of free text.

use super::entities::ToolCall;
use serde_json::Value;

/// Find every top-level, brace-balanced JSON object in `text` that parses.
///
/// Braces inside JSON strings are ignored so code snippets in arguments do
/// not break the scan.
pub fn extract_json_objects(text: &str) -> Vec<Value> {
    let bytes = text.as_bytes();
    let mut objects = Vec::new();
    let mut start = 0;

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        match balanced_end(bytes, open) {
            Some(end) => {
                if let Ok(value) = serde_json::from_str::<Value>(&text[open..end])
                    && value.is_object()
                {
                    objects.push(value);
                    start = end;
                } else {
                    start = open + 1;
                }
            }
            None => break,
        }
    }

    objects
}

fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Interpret one JSON object as a tool call.
///
/// Accepts `{"name", "arguments"}`, `{"tool", "args"}` and the
/// OpenAI-style `{"function": {"name", "arguments"}}` shapes. String-encoded
/// arguments are decoded; undecodable arguments become empty.
pub fn tool_call_from_json(value: &Value) -> Option<ToolCall> {
    let (name, args) = if let Some(function) = value.get("function").filter(|f| f.is_object()) {
        (function.get("name")?, function.get("arguments"))
    } else {
        let name = value.get("name").or_else(|| value.get("tool"))?;
        let args = value
            .get("arguments")
            .or_else(|| value.get("args"))
            .or_else(|| value.get("parameters"));
        (name, args)
    };

    let mut call = ToolCall::new(name.as_str()?);
    let args = match args {
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw).ok(),
        Some(other) => Some(other.clone()),
        None => None,
    };
    if let Some(Value::Object(map)) = args {
        for (key, value) in map {
            call = call.with_arg(key, value);
        }
    }
    Some(call)
}

/// Extract tool calls from text, keeping only names accepted by `is_known`.
pub fn parse_text_tool_calls(text: &str, is_known: impl Fn(&str) -> bool) -> Vec<ToolCall> {
    extract_json_objects(text)
        .iter()
        .filter_map(tool_call_from_json)
        .filter(|call| is_known(&call.tool_name))
        .collect()
}
