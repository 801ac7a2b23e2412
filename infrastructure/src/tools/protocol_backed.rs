//! Tool executor that routes tools to configured tool servers.
//!
//! Each [`ToolServerConfig`] names the local tools it takes over. A call to
//! one of those tools goes to the server's [`ToolSession`], started on first
//! use. When the session cannot serve the call (startup failure, timeout,
//! lost connection, or an already dead session) the local implementation
//! runs instead. Dead sessions stay dead until [`ProtocolToolExecutor::restart`].

use super::executor::LocalToolExecutor;
use crate::tool_protocol::{SessionState, ToolProtocolError, ToolServerConfig, ToolSession};
use async_trait::async_trait;
use foreman_application::ports::tool_executor::ToolExecutorPort;
use foreman_domain::{ToolCall, ToolError, ToolResult, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ProtocolToolExecutor {
    local: LocalToolExecutor,
    sessions: Vec<Arc<ToolSession>>,
    /// canonical tool name → index into `sessions`
    routes: HashMap<String, usize>,
}

impl ProtocolToolExecutor {
    pub fn new(local: LocalToolExecutor, servers: Vec<ToolServerConfig>) -> Self {
        let mut routes = HashMap::new();
        let mut sessions = Vec::with_capacity(servers.len());

        for config in servers {
            let index = sessions.len();
            for tool in &config.tools {
                match local.tool_spec().resolve(tool) {
                    Some(canonical) => {
                        if let Some(previous) = routes.insert(canonical.to_string(), index) {
                            warn!(
                                "ToolServers: {} routed to both #{} and '{}'; using '{}'",
                                canonical, previous, config.name, config.name
                            );
                        }
                    }
                    None => warn!(
                        "ToolServers: '{}' lists unknown tool '{}'; ignored",
                        config.name, tool
                    ),
                }
            }
            sessions.push(Arc::new(ToolSession::new(config)));
        }

        Self {
            local,
            sessions,
            routes,
        }
    }

    pub fn sessions(&self) -> &[Arc<ToolSession>] {
        &self.sessions
    }

    pub fn session_for(&self, tool: &str) -> Option<&Arc<ToolSession>> {
        let canonical = self.local.tool_spec().resolve(tool)?;
        self.routes.get(canonical).map(|&i| &self.sessions[i])
    }

    /// Explicitly restart one server's session.
    pub async fn restart(&self, server: &str) -> Result<(), ToolProtocolError> {
        match self.sessions.iter().find(|s| s.name() == server) {
            Some(session) => {
                session.stop().await;
                session.start().await
            }
            None => Err(ToolProtocolError::Config(format!(
                "no tool server named '{}'",
                server
            ))),
        }
    }

    /// Stop every session (children get their stop grace period).
    pub async fn shutdown(&self) {
        for session in &self.sessions {
            session.stop().await;
        }
    }

    async fn call_remote(
        session: &ToolSession,
        call: &ToolCall,
    ) -> Result<ToolResult, ToolProtocolError> {
        if session.state() != SessionState::Ready {
            session.start_if_idle().await?;
        }

        let start = Instant::now();
        let output = session
            .call_tool(&call.tool_name, call.arguments_json())
            .await?;
        let result = if output.is_error {
            ToolResult::failure(&call.tool_name, ToolError::execution_failed(output.text()))
        } else {
            ToolResult::success(&call.tool_name, output.text())
        };
        Ok(result.with_duration(start.elapsed().as_millis() as u64))
    }
}

#[async_trait]
impl ToolExecutorPort for ProtocolToolExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        self.local.tool_spec()
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let Some(session) = self.session_for(&call.tool_name) else {
            return self.local.execute(call).await;
        };

        let mut canonical = call.clone();
        if let Some(name) = self.local.tool_spec().resolve(&call.tool_name) {
            canonical.tool_name = name.to_string();
        }

        match Self::call_remote(session, &canonical).await {
            Ok(result) => {
                debug!("ToolServer[{}]: {} served", session.name(), canonical.describe());
                result.with_server(session.name())
            }
            Err(e) if e.allows_fallback() => {
                warn!(
                    "ToolServer[{}]: {}; running {} locally",
                    session.name(),
                    e,
                    canonical.tool_name
                );
                self.local.execute(&canonical).await
            }
            Err(e) => ToolResult::failure(
                &canonical.tool_name,
                ToolError::execution_failed(e.to_string()),
            )
            .with_server(session.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool_protocol::TransportConfig;
    use std::time::Duration;
    use tempfile::tempdir;

    fn unresponsive_server() -> ToolServerConfig {
        ToolServerConfig::new("sleeper", TransportConfig::pipe("sleep", ["30"]))
            .with_startup_timeout(Duration::from_millis(100))
            .serving(["read_file"])
    }

    #[test]
    fn test_routes_resolve_aliases() {
        let executor = ProtocolToolExecutor::new(
            LocalToolExecutor::default(),
            vec![unresponsive_server().serving(["cat", "made_up"])],
        );
        assert_eq!(executor.session_for("read_file").unwrap().name(), "sleeper");
        assert!(executor.session_for("grep_search").is_none());
    }

    #[tokio::test]
    async fn test_unrouted_tool_runs_locally() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
        let executor = ProtocolToolExecutor::new(
            LocalToolExecutor::new(dir.path()),
            vec![unresponsive_server()],
        );

        let result = executor
            .execute(&ToolCall::new("grep_search").with_arg("pattern", "alpha"))
            .await;
        assert!(result.is_success());
        assert!(result.metadata.server.is_none());
        assert_eq!(executor.sessions()[0].state(), SessionState::Idle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_startup_failure_falls_back_and_stays_dead() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "hello from disk\n").unwrap();
        let executor = ProtocolToolExecutor::new(
            LocalToolExecutor::new(dir.path()),
            vec![unresponsive_server()],
        );

        let first = executor
            .execute(&ToolCall::new("read_file").with_arg("path", "notes.md"))
            .await;
        assert!(first.is_success());
        assert!(first.output().unwrap().contains("hello from disk"));
        assert!(first.metadata.server.is_none());
        assert_eq!(executor.sessions()[0].state(), SessionState::Dead);

        // no implicit restart: the dead session is skipped straight away
        let started = Instant::now();
        let second = executor
            .execute(&ToolCall::new("cat").with_arg("path", "notes.md"))
            .await;
        assert!(second.is_success());
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(executor.sessions()[0].state(), SessionState::Dead);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_first_calls_spawn_the_server_once() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("notes.md"), "hello from disk\n").unwrap();
        let spawns = dir.path().join("spawns.log");
        let script = format!("echo started >> '{}'; exec sleep 30", spawns.display());
        let server = ToolServerConfig::new("sleeper", TransportConfig::pipe("sh", ["-c", script.as_str()]))
            .with_startup_timeout(Duration::from_millis(200))
            .serving(["read_file"]);
        let executor = ProtocolToolExecutor::new(LocalToolExecutor::new(dir.path()), vec![server]);

        let call = ToolCall::new("read_file").with_arg("path", "notes.md");
        let (first, second) = tokio::join!(executor.execute(&call), executor.execute(&call));

        assert!(first.is_success());
        assert!(second.is_success());
        assert_eq!(executor.sessions()[0].state(), SessionState::Dead);
        let log = std::fs::read_to_string(&spawns).unwrap();
        assert_eq!(log.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_restart_unknown_server_is_config_error() {
        let executor = ProtocolToolExecutor::new(LocalToolExecutor::default(), Vec::new());
        assert!(matches!(
            executor.restart("nope").await,
            Err(ToolProtocolError::Config(_))
        ));
    }

    mod with_agent_runner {
        use super::*;
        use foreman_application::{
            AgentRunner, EngineContext, GatewayError, LlmGateway, LlmSession, ModelRoster,
            RegulatorConfig, ResourceRegulator, StreamHandle,
        };
        use foreman_domain::{AgentType, Model, ModelTier, StreamEvent};
        use serde_json::Value;
        use std::sync::Mutex;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tokio_util::sync::CancellationToken;

        /// Asks for notes.md on the first turn, answers on the second.
        #[derive(Default)]
        struct ReadThenAnswer {
            turn: Arc<AtomicUsize>,
            prompts: Arc<Mutex<Vec<String>>>,
        }

        struct Turn {
            model: Model,
            turn: Arc<AtomicUsize>,
            prompts: Arc<Mutex<Vec<String>>>,
        }

        #[async_trait]
        impl LlmGateway for ReadThenAnswer {
            async fn create_session(
                &self,
                model: &Model,
                _system_prompt: &str,
            ) -> Result<Box<dyn LlmSession>, GatewayError> {
                Ok(Box::new(Turn {
                    model: model.clone(),
                    turn: Arc::clone(&self.turn),
                    prompts: Arc::clone(&self.prompts),
                }))
            }

            async fn available_models(&self) -> Result<Vec<Model>, GatewayError> {
                Ok(Vec::new())
            }
        }

        #[async_trait]
        impl LlmSession for Turn {
            fn model(&self) -> &Model {
                &self.model
            }

            async fn send(&self, _content: &str) -> Result<String, GatewayError> {
                Ok(String::new())
            }

            async fn send_streaming(
                &self,
                content: &str,
                _tools: &[Value],
            ) -> Result<StreamHandle, GatewayError> {
                self.prompts.lock().unwrap().push(content.to_string());
                let (tx, handle) = StreamHandle::channel();
                if self.turn.fetch_add(1, Ordering::SeqCst) == 0 {
                    tx.send(StreamEvent::ToolCall(
                        ToolCall::new("read_file").with_arg("path", "notes.md"),
                    ))
                    .await
                    .unwrap();
                    tx.send(StreamEvent::Completed(String::new())).await.unwrap();
                } else {
                    tx.send(StreamEvent::Completed("notes.md says hello".into()))
                        .await
                        .unwrap();
                }
                Ok(handle)
            }
        }

        #[cfg(unix)]
        #[tokio::test]
        async fn test_agent_completes_when_tool_server_never_starts() {
            let dir = tempdir().unwrap();
            std::fs::write(dir.path().join("notes.md"), "hello from disk\n").unwrap();
            let tools = Arc::new(ProtocolToolExecutor::new(
                LocalToolExecutor::new(dir.path()),
                vec![unresponsive_server()],
            ));
            let gateway = Arc::new(ReadThenAnswer::default());
            let prompts = Arc::clone(&gateway.prompts);
            let ctx = EngineContext::new(
                gateway,
                tools.clone(),
                ResourceRegulator::new(RegulatorConfig::default()),
            );
            let runner = AgentRunner::new(Arc::new(ctx));

            let task = ModelRoster::default().task("what do the notes say", AgentType::Explorer, ModelTier::Lite);
            let result = runner.run(task, &CancellationToken::new()).await.unwrap();

            assert!(result.success);
            assert_eq!(result.summary, "notes.md says hello");
            assert_eq!(result.actions_taken.len(), 1);
            assert!(!result.actions_taken[0].contains("[failed]"));
            assert!(prompts.lock().unwrap()[1].contains("hello from disk"));
            assert_eq!(tools.sessions()[0].state(), SessionState::Dead);
        }
    }
}
