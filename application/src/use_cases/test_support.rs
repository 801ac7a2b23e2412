//! Scripted collaborators for use case tests.

use crate::context::EngineContext;
use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession, StreamHandle};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::regulator::{RegulatorConfig, ResourceRegulator};
use async_trait::async_trait;
use foreman_domain::{
    Model, Permission, StreamEvent, ToolCall, ToolDefinition, ToolParameter, ToolResult, ToolSpec,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a scripted session does for one send
pub(crate) enum Script {
    Reply(String),
    /// Structured tool calls (sent before any text), then text
    Calls(Vec<ToolCall>, String),
    Fail(String),
    Unreachable,
    Hang,
}

impl Script {
    pub fn reply(text: impl Into<String>) -> Self {
        Script::Reply(text.into())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub model: Model,
    pub system: String,
    pub prompt: String,
    pub tools: usize,
}

type Responder = dyn Fn(&RecordedCall) -> Script + Send + Sync;

struct Shared {
    responder: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

pub(crate) struct ScriptedGateway {
    shared: Arc<Shared>,
}

impl ScriptedGateway {
    pub fn new(responder: impl Fn(&RecordedCall) -> Script + Send + Sync + 'static) -> Self {
        Self::with_delay(responder, Duration::ZERO)
    }

    pub fn with_delay(
        responder: impl Fn(&RecordedCall) -> Script + Send + Sync + 'static,
        delay: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                responder: Box::new(responder),
                calls: Mutex::new(Vec::new()),
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Replies handed out in send order; "done" once the script runs out
    pub fn queued(replies: Vec<Script>) -> Self {
        let queue = Mutex::new(VecDeque::from(replies));
        Self::new(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Script::reply("done"))
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        Ok(Box::new(ScriptedSession {
            model: model.clone(),
            system: system_prompt.to_string(),
            shared: self.shared.clone(),
        }))
    }

    async fn available_models(&self) -> Result<Vec<Model>, GatewayError> {
        Ok(vec![Model::new("qwen2.5-coder:7b"), Model::new("llama3.2:3b")])
    }
}

struct ScriptedSession {
    model: Model,
    system: String,
    shared: Arc<Shared>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl LlmSession for ScriptedSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, content: &str) -> Result<String, GatewayError> {
        self.send_streaming(content, &[]).await?.collect_text().await
    }

    async fn send_streaming(
        &self,
        content: &str,
        tools: &[Value],
    ) -> Result<StreamHandle, GatewayError> {
        let call = RecordedCall {
            model: self.model.clone(),
            system: self.system.clone(),
            prompt: content.to_string(),
            tools: tools.len(),
        };
        let script = (self.shared.responder)(&call);
        self.shared.calls.lock().unwrap().push(call);

        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.shared.in_flight);
        if !self.shared.delay.is_zero() {
            tokio::time::sleep(self.shared.delay).await;
        }

        let (calls, text) = match script {
            Script::Reply(text) => (Vec::new(), text),
            Script::Calls(calls, text) => (calls, text),
            Script::Fail(message) => return Err(GatewayError::RequestFailed(message)),
            Script::Unreachable => {
                return Err(GatewayError::ConnectionError("connection refused".into()));
            }
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        let (tx, handle) = StreamHandle::channel();
        tokio::spawn(async move {
            for call in calls {
                let _ = tx.send(StreamEvent::ToolCall(call)).await;
            }
            if !text.is_empty() {
                let _ = tx.send(StreamEvent::Delta(text)).await;
            }
            let _ = tx.send(StreamEvent::Completed(String::new())).await;
        });
        Ok(handle)
    }
}

/// Tool executor that records calls and always succeeds
pub(crate) struct MockTools {
    spec: ToolSpec,
    executed: Mutex<Vec<ToolCall>>,
}

impl MockTools {
    pub fn new() -> Self {
        let path = || ToolParameter::new("path", "File path", true);
        let spec = ToolSpec::new()
            .register(
                ToolDefinition::new("read_file", "Read a file", Permission::Read)
                    .with_parameter(path()),
            )
            .register(
                ToolDefinition::new("write_file", "Write a file", Permission::Write)
                    .with_parameter(path())
                    .with_parameter(ToolParameter::new("content", "New content", true)),
            )
            .register(
                ToolDefinition::new("run_command", "Run a shell command", Permission::Bash)
                    .with_parameter(ToolParameter::new("command", "Command line", true)),
            )
            .register(
                ToolDefinition::new("grep_search", "Search file contents", Permission::Search)
                    .with_parameter(ToolParameter::new("pattern", "Regex", true)),
            )
            .register_aliases([("cat", "read_file")]);
        Self {
            spec,
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn executed(&self) -> Vec<ToolCall> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutorPort for MockTools {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.executed.lock().unwrap().push(call.clone());
        ToolResult::success(&call.tool_name, format!("ok: {}", call.describe()))
    }
}

pub(crate) fn engine(
    gateway: Arc<ScriptedGateway>,
    tools: Arc<MockTools>,
    regulator: RegulatorConfig,
) -> EngineContext {
    EngineContext::new(gateway, tools, ResourceRegulator::new(regulator))
}
