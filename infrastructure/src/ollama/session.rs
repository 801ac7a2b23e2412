//! Ollama chat session.
//!
//! `/api/chat` is stateless, so the session keeps the message history and
//! sends all of it with every request. Streaming replies are read line by
//! line (NDJSON) in a background task that feeds a bounded channel; the
//! exchange is appended to the history only once the reply completes.

use super::types::{ChatChunk, ChatMessage, ChatRequest, ErrorBody, LineBuffer};
use async_trait::async_trait;
use foreman_application::ports::llm_gateway::{GatewayError, LlmSession, StreamHandle};
use foreman_domain::{Model, StreamEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, trace, warn};

pub struct OllamaSession {
    client: reqwest::Client,
    base_url: String,
    model: Model,
    history: Arc<Mutex<Vec<ChatMessage>>>,
}

impl OllamaSession {
    pub fn new(client: reqwest::Client, base_url: &str, model: Model, system_prompt: &str) -> Self {
        let mut history = Vec::new();
        if !system_prompt.is_empty() {
            history.push(ChatMessage::new("system", system_prompt));
        }
        Self {
            client,
            base_url: base_url.to_string(),
            model,
            history: Arc::new(Mutex::new(history)),
        }
    }

    /// History plus the new user turn
    async fn with_user_turn(&self, content: &str) -> Vec<ChatMessage> {
        let mut messages = self.history.lock().await.clone();
        messages.push(ChatMessage::new("user", content));
        messages
    }

    async fn post(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
        stream: bool,
    ) -> Result<reqwest::Response, GatewayError> {
        let request = ChatRequest {
            model: self.model.as_str(),
            messages,
            stream,
            tools,
        };
        debug!(
            "OllamaSession[{}]: chat ({} messages, {} tools, stream={})",
            self.model,
            messages.len(),
            tools.len(),
            stream
        );
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(e, &self.base_url))?;
        check_status(response, &self.model).await
    }
}

#[async_trait]
impl LlmSession for OllamaSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        let messages = self.with_user_turn(content).await;
        let response = self.post(&messages, &[], false).await?;
        let chunk: ChatChunk = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(format!("invalid chat response: {}", e)))?;
        if let Some(error) = chunk.error {
            return Err(GatewayError::RequestFailed(error));
        }
        let reply = chunk.message.unwrap_or_else(|| ChatMessage::new("assistant", ""));
        let text = reply.content.clone();

        let mut history = self.history.lock().await;
        history.push(ChatMessage::new("user", content));
        history.push(reply);
        Ok(text)
    }

    async fn send_streaming(
        &self,
        content: &str,
        tools: &[Value],
    ) -> Result<StreamHandle, GatewayError> {
        let messages = self.with_user_turn(content).await;
        let response = self.post(&messages, tools, true).await?;

        let (tx, handle) = StreamHandle::channel();
        let history = Arc::clone(&self.history);
        let model = self.model.clone();
        let user_turn = ChatMessage::new("user", content);
        tokio::spawn(async move {
            if let Some(reply) = pump(response, &tx, &model).await {
                let mut history = history.lock().await;
                history.push(user_turn);
                history.push(reply);
            }
        });
        Ok(handle)
    }
}

enum Flow {
    More,
    Done,
    Stop,
}

/// Forward one NDJSON stream to `tx`. Returns the assembled assistant
/// message when the stream completed normally.
async fn pump(
    mut response: reqwest::Response,
    tx: &mpsc::Sender<StreamEvent>,
    model: &Model,
) -> Option<ChatMessage> {
    let mut buffer = LineBuffer::default();
    let mut reply = ChatMessage::new("assistant", "");

    'read: loop {
        let (lines, last) = match response.chunk().await {
            Ok(Some(bytes)) => (buffer.push(&bytes), false),
            Ok(None) => (buffer.finish().into_iter().collect(), true),
            Err(e) => {
                warn!("OllamaSession[{}]: stream broke: {}", model, e);
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return None;
            }
        };
        for line in lines {
            match forward(&line, tx, &mut reply).await {
                Flow::More => {}
                Flow::Done => break 'read,
                Flow::Stop => return None,
            }
        }
        if last {
            break;
        }
    }

    if tx
        .send(StreamEvent::Completed(reply.content.clone()))
        .await
        .is_err()
    {
        return None;
    }
    Some(reply)
}

async fn forward(line: &str, tx: &mpsc::Sender<StreamEvent>, reply: &mut ChatMessage) -> Flow {
    trace!("ollama chunk: {}", line);
    let chunk: ChatChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("Ollama: skipping unparseable chunk ({}): {}", e, line);
            return Flow::More;
        }
    };

    for event in chunk.events() {
        let stop = matches!(event, StreamEvent::Error(_));
        if let StreamEvent::Delta(text) = &event {
            reply.content.push_str(text);
        }
        // a dropped receiver means the caller gave up; dropping the
        // response closes the connection
        if tx.send(event).await.is_err() || stop {
            return Flow::Stop;
        }
    }
    if let Some(message) = chunk.message {
        reply.tool_calls.extend(message.tool_calls);
    }
    if chunk.done { Flow::Done } else { Flow::More }
}

pub(crate) fn request_error(e: reqwest::Error, base_url: &str) -> GatewayError {
    if e.is_connect() {
        GatewayError::ConnectionError(format!("cannot reach {}: {}", base_url, e))
    } else if e.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &Model,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    if status == reqwest::StatusCode::NOT_FOUND {
        Err(GatewayError::ModelNotAvailable(format!("{}: {}", model, message)))
    } else {
        Err(GatewayError::RequestFailed(format!(
            "HTTP {}: {}",
            status.as_u16(),
            message
        )))
    }
}
