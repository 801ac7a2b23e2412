//! JSON-RPC 2.0 message types and frame classification.
//!
//! Requests carry an explicit id assigned by the owning
//! [`ToolSession`](super::session::ToolSession); responses are correlated
//! back to callers by that id, in whatever order the server answers.

use super::error::{Result, ToolProtocolError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC code for an unknown method
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

impl JsonRpcResponse {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: u64, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: default_version(),
            id: Some(id),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// The call's result, or its error object as [`ToolProtocolError::Rpc`].
    ///
    /// A response with neither field yields `Value::Null`.
    pub fn into_result(self) -> Result<Value> {
        match (self.error, self.result) {
            (Some(e), _) => Err(ToolProtocolError::Rpc {
                code: e.code,
                message: e.message,
                data: e.data,
            }),
            (None, Some(result)) => Ok(result),
            (None, None) => Ok(Value::Null),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// What an incoming frame is
#[derive(Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// Answer to one of our requests (`id`, no `method`)
    Response,
    /// Request from the server (`id` and `method`); we answer method-not-found
    IncomingRequest { id: u64 },
    /// Anything without an id
    Notification,
}

pub fn classify_message(json: &Value) -> MessageKind {
    let id = json.get("id").and_then(|v| v.as_u64());
    let method = json.get("method").and_then(|v| v.as_str());

    match (id, method) {
        (Some(id), Some(_)) => MessageKind::IncomingRequest { id },
        (Some(_), None) => MessageKind::Response,
        _ => MessageKind::Notification,
    }
}

/// A tool as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolList {
    #[serde(default)]
    pub tools: Vec<RemoteTool>,
}

/// Body of a `tools/call` result
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallOutput {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ToolCallOutput {
    /// Text blocks joined by newlines; other block types are skipped
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_frames() {
        assert_eq!(
            classify_message(&json!({"jsonrpc": "2.0", "id": 4, "result": {}})),
            MessageKind::Response
        );
        assert_eq!(
            classify_message(&json!({"id": 9, "method": "roots/list"})),
            MessageKind::IncomingRequest { id: 9 }
        );
        assert_eq!(
            classify_message(&json!({"method": "notifications/progress"})),
            MessageKind::Notification
        );
        assert_eq!(classify_message(&json!({"data": 1})), MessageKind::Notification);
    }

    #[test]
    fn test_request_omits_missing_params() {
        let line = serde_json::to_string(&JsonRpcRequest::new(3, "tools/list", None)).unwrap();
        assert_eq!(line, r#"{"jsonrpc":"2.0","id":3,"method":"tools/list"}"#);
    }

    #[test]
    fn test_error_response_becomes_rpc_error() {
        let response: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32602, "message": "bad params"}
        }))
        .unwrap();
        match response.into_result() {
            Err(ToolProtocolError::Rpc { code, message, .. }) => {
                assert_eq!(code, -32602);
                assert_eq!(message, "bad params");
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_call_output_joins_text_blocks() {
        let output: ToolCallOutput = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "second"}
            ]
        }))
        .unwrap();
        assert_eq!(output.text(), "first\nsecond");
        assert!(!output.is_error);
    }
}
