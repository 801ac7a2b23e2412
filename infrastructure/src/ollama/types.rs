//! Ollama HTTP API wire types (`/api/chat`, `/api/tags`, `/api/show`)

use foreman_domain::{StreamEvent, ToolCall, tool::parsing::tool_call_from_json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "no_tools")]
    pub tools: &'a [Value],
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<WireToolCall>,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub function: WireFunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl WireToolCall {
    pub fn to_tool_call(&self) -> Option<ToolCall> {
        tool_call_from_json(&serde_json::json!({
            "name": self.function.name,
            "arguments": self.function.arguments,
        }))
    }
}

/// One line of an `/api/chat` response (the whole body when not streaming)
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatChunk {
    /// Events this chunk carries, in order: text, then tool calls.
    pub fn events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(error) = &self.error {
            events.push(StreamEvent::Error(error.clone()));
            return events;
        }
        if let Some(message) = &self.message {
            if !message.content.is_empty() {
                events.push(StreamEvent::Delta(message.content.clone()));
            }
            events.extend(
                message
                    .tool_calls
                    .iter()
                    .filter_map(WireToolCall::to_tool_call)
                    .map(StreamEvent::ToolCall),
            );
        }
        events
    }
}

#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
pub struct TagEntry {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ShowResponse {
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub template: String,
}

impl ShowResponse {
    /// Newer servers list capabilities; older ones only expose the prompt
    /// template, which mentions `.Tools` when tool calling is supported.
    pub fn supports_tools(&self) -> bool {
        if self.capabilities.is_empty() {
            self.template.contains(".Tools")
        } else {
            self.capabilities.iter().any(|c| c == "tools")
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Splits a byte stream into newline-terminated lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line).trim().to_string();
            if !text.is_empty() {
                lines.push(text);
            }
        }
        lines
    }

    /// Whatever is left once the stream ends without a final newline
    pub fn finish(&mut self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!text.is_empty()).then_some(text)
    }
}
