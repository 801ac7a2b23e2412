//! LLM Gateway port
//!
//! Defines the interface for communicating with the inference backend.

use async_trait::async_trait;
use foreman_domain::{Model, StreamEvent, ToolCall};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Capacity of the channel between a backend stream task and its consumer
pub const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// True when the backend itself could not be reached.
    ///
    /// This is the only gateway condition that is a hard failure; everything
    /// else is reported back as a failed agent result and reviewed.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GatewayError::ConnectionError(_))
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer talks to the inference
/// backend. Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Create a new chat session with the specified model and system prompt
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;

    /// List the models the backend serves.
    ///
    /// Also used as the reachability check: a connection failure here is
    /// reported as [`GatewayError::ConnectionError`].
    async fn available_models(&self) -> Result<Vec<Model>, GatewayError>;
}

/// Everything one streamed reply carried
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

/// Handle for receiving streaming events from an LLM session.
///
/// Wraps a bounded `mpsc::Receiver<StreamEvent>` and provides convenience
/// methods for consuming the stream.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Create a bounded channel and the handle reading from it.
    pub fn channel() -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        (tx, Self::new(rx))
    }

    /// Consume the stream and collect all text into a single string.
    pub async fn collect_text(self) -> Result<String, GatewayError> {
        self.collect_with(|_| {}).await.map(|reply| reply.text)
    }

    /// Consume the whole stream, calling `on_delta` for every text chunk.
    ///
    /// Tool calls are gathered from every event, not just the last one.
    pub async fn collect_with(
        mut self,
        mut on_delta: impl FnMut(&str),
    ) -> Result<StreamReply, GatewayError> {
        let mut reply = StreamReply::default();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => {
                    on_delta(&chunk);
                    reply.text.push_str(&chunk);
                }
                StreamEvent::ToolCall(call) => reply.tool_calls.push(call),
                StreamEvent::Completed(text) => {
                    if reply.text.is_empty() {
                        reply.text = text;
                    }
                    return Ok(reply);
                }
                StreamEvent::Error(e) => {
                    return Err(GatewayError::RequestFailed(e));
                }
            }
        }
        // Channel closed without Completed: return what we have
        Ok(reply)
    }
}

/// An active LLM session.
///
/// A session keeps its own message history, so successive sends form one
/// conversation.
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the model used by this session
    fn model(&self) -> &Model;

    /// Send a message and get the full response text
    async fn send(&self, content: &str) -> Result<String, GatewayError>;

    /// Send a message offering `tools` (JSON schemas) and stream the reply.
    ///
    /// Default implementation calls `send()` and wraps the result in a single
    /// `Completed` event, ignoring the tools.
    async fn send_streaming(
        &self,
        content: &str,
        _tools: &[Value],
    ) -> Result<StreamHandle, GatewayError> {
        let result = self.send(content).await?;
        let (tx, handle) = StreamHandle::channel();
        // If the receiver is dropped, that's fine
        let _ = tx.send(StreamEvent::Completed(result)).await;
        Ok(handle)
    }
}
