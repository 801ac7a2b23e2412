//! Agent Runner
//!
//! Executes one bounded tool-use loop for a single sub-agent task:
//!
//! 1. Take a regulator lease for the task's model (held until return)
//! 2. Retrieve reference snippets and look up native tool support
//! 3. Loop up to `max_agent_iterations`: stream a reply, collect tool calls
//!    from every chunk (or from the text when there are none), run the
//!    permitted ones, and feed the results back
//! 4. A reply without tool calls is the agent's answer
//!
//! Cancellation and the per-agent timeout abort the loop, drop any pending
//! backend or tool call, and release the lease.

mod types;

pub use types::AgentRunError;

use crate::context::EngineContext;
use crate::ports::context_retriever::ContextSnippet;
use crate::ports::llm_gateway::{GatewayError, LlmSession};
use crate::regulator::ResourceLease;
use foreman_domain::{
    AgentPromptTemplate, AgentResult, AgentTask, AgentType, ToolCall, ToolError, ToolResult,
    parse_text_tool_calls,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs sub-agent tasks against the shared engine context
#[derive(Clone)]
pub struct AgentRunner {
    ctx: Arc<EngineContext>,
}

impl AgentRunner {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    /// Run one task to completion, cancellation, timeout, or failure.
    ///
    /// Only an unreachable backend is an `Err`; every other outcome is an
    /// [`AgentResult`], including admission refusal when the regulator's
    /// queue is full.
    pub async fn run(
        &self,
        task: AgentTask,
        cancellation_token: &CancellationToken,
    ) -> Result<AgentResult, AgentRunError> {
        let started = Instant::now();
        let agent_type = task.agent_type;
        self.ctx.progress.on_agent_start(agent_type, &task.task);
        info!(
            "AgentRunner[{}]: starting on {} ({})",
            agent_type, task.model, task.tier
        );

        let result = self.run_leased(&task, cancellation_token).await?;

        let mut result = result.with_duration(started.elapsed().as_millis() as u64);
        if let Some(step) = task.step_num {
            result = result.with_step(step);
        }
        info!(
            "AgentRunner[{}]: {} after {}ms",
            agent_type, result.status, result.duration_ms
        );
        self.ctx.progress.on_agent_complete(&result);
        Ok(result)
    }

    async fn run_leased(
        &self,
        task: &AgentTask,
        cancellation_token: &CancellationToken,
    ) -> Result<AgentResult, AgentRunError> {
        let agent_type = task.agent_type;

        let lease = tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => return Ok(AgentResult::cancelled(agent_type)),
            lease = self.ctx.regulator.acquire(&task.model) => lease,
        };
        let lease = match lease {
            Ok(lease) => lease,
            Err(e) => {
                warn!("AgentRunner[{}]: admission refused: {}", agent_type, e);
                return Ok(AgentResult::admission_rejected(agent_type, e.to_string()));
            }
        };

        let timeout = self.ctx.params.agent_timeout;
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => {
                debug!("AgentRunner[{}]: cancelled", agent_type);
                Ok(AgentResult::cancelled(agent_type))
            }
            outcome = tokio::time::timeout(timeout, self.tool_loop(task, &lease)) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!("AgentRunner[{}]: timed out after {:?}", agent_type, timeout);
                    lease.mark_backend_error();
                    Ok(AgentResult::timed_out(agent_type, timeout.as_secs()))
                }
            },
        }
    }

    async fn tool_loop(
        &self,
        task: &AgentTask,
        lease: &ResourceLease,
    ) -> Result<AgentResult, AgentRunError> {
        let ctx = &self.ctx;
        let agent_type = task.agent_type;

        let snippets: Vec<String> = ctx
            .retriever
            .retrieve(&task.task, ctx.params.context_snippets)
            .await
            .iter()
            .map(ContextSnippet::to_prompt)
            .collect();

        let native = ctx.capabilities.supports_tool_calls(&task.model).await;
        let spec = ctx.tools.tool_spec();
        let permitted = spec.permitted_for(agent_type);
        let schemas: Vec<serde_json::Value> = if native {
            permitted.iter().map(|t| t.json_schema()).collect()
        } else {
            Vec::new()
        };
        let system = AgentPromptTemplate::agent_system(
            agent_type,
            &permitted,
            native,
            &ctx.params.project_dir,
        );

        let session = match ctx.gateway.create_session(&task.model, &system).await {
            Ok(session) => session,
            Err(e) => return backend_failure(agent_type, lease, e),
        };

        let mut prompt = AgentPromptTemplate::agent_task(task, &snippets);
        let mut actions = Vec::new();

        for iteration in 1..=ctx.params.max_agent_iterations {
            let reply = match self.stream_reply(session.as_ref(), &prompt, &schemas).await {
                Ok(reply) => reply,
                Err(e) => return backend_failure(agent_type, lease, e),
            };

            let mut calls = reply.tool_calls;
            if calls.is_empty() {
                calls = parse_text_tool_calls(&reply.text, |name| spec.resolve(name).is_some());
            }

            if calls.is_empty() {
                debug!(
                    "AgentRunner[{}]: final answer after {} iteration(s)",
                    agent_type, iteration
                );
                return Ok(AgentResult::completed(agent_type, reply.text.trim())
                    .with_actions(actions)
                    .with_details(json!({
                        "model": task.model.as_str(),
                        "iterations": iteration,
                        "native_tools": native,
                    })));
            }

            let mut outputs = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = self.execute_tool(agent_type, call).await;
                let marker = if result.is_success() { "" } else { " [failed]" };
                actions.push(format!("{}{}", call.describe(), marker));
                outputs.push(result.to_context(ctx.params.tool_output_limit));
            }
            prompt = AgentPromptTemplate::tool_results(&outputs);
        }

        warn!(
            "AgentRunner[{}]: no final answer within {} iterations",
            agent_type, ctx.params.max_agent_iterations
        );
        Ok(AgentResult::failed(
            agent_type,
            format!(
                "No final answer within {} iterations",
                ctx.params.max_agent_iterations
            ),
        )
        .with_actions(actions))
    }

    async fn stream_reply(
        &self,
        session: &dyn LlmSession,
        prompt: &str,
        schemas: &[serde_json::Value],
    ) -> Result<crate::ports::llm_gateway::StreamReply, GatewayError> {
        let handle = session.send_streaming(prompt, schemas).await?;
        handle
            .collect_with(|chunk| self.ctx.progress.on_llm_chunk(chunk))
            .await
    }

    /// Run one tool call if the agent holds the tool's permission.
    async fn execute_tool(&self, agent_type: AgentType, call: &ToolCall) -> ToolResult {
        let spec = self.ctx.tools.tool_spec();
        let Some(definition) = spec.get_resolved(&call.tool_name) else {
            return ToolResult::failure(
                &call.tool_name,
                ToolError::not_found(format!("tool '{}'", call.tool_name)),
            );
        };

        if let Some(permission) = definition.permission
            && !agent_type.has_permission(permission)
        {
            warn!(
                "AgentRunner[{}]: denied {} (needs {})",
                agent_type,
                definition.name,
                permission.as_str()
            );
            return ToolResult::failure(
                &definition.name,
                ToolError::permission_denied(format!(
                    "{} agents may not call {}",
                    agent_type, definition.name
                )),
            );
        }

        let mut canonical = call.clone();
        canonical.tool_name = definition.name.clone();

        self.ctx.progress.on_tool_call(agent_type, &canonical);
        let result = self.ctx.tools.execute(&canonical).await;
        self.ctx.progress.on_tool_result(agent_type, &result);
        result
    }
}

fn backend_failure(
    agent_type: AgentType,
    lease: &ResourceLease,
    error: GatewayError,
) -> Result<AgentResult, AgentRunError> {
    lease.mark_backend_error();
    if error.is_unreachable() {
        return Err(AgentRunError::BackendUnreachable(error.to_string()));
    }
    warn!("AgentRunner[{}]: backend error: {}", agent_type, error);
    Ok(AgentResult::failed(agent_type, format!("Backend error: {}", error)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineParams;
    use crate::ports::model_capabilities::StaticCapabilities;
    use crate::regulator::RegulatorConfig;
    use crate::use_cases::test_support::{MockTools, Script, ScriptedGateway, engine};
    use foreman_domain::{AgentRunStatus, ModelTier};
    use std::time::Duration;

    fn task(agent_type: AgentType) -> AgentTask {
        crate::config::ModelRoster::default().task("inspect parse_config", agent_type, ModelTier::Lite)
    }

    fn runner(gateway: Arc<ScriptedGateway>, tools: Arc<MockTools>) -> AgentRunner {
        AgentRunner::new(Arc::new(engine(gateway, tools, RegulatorConfig::default())))
    }

    #[tokio::test]
    async fn test_plain_reply_completes() {
        let gateway = Arc::new(ScriptedGateway::queued(vec![Script::reply(
            "parse_config reads foreman.toml",
        )]));
        let runner = runner(gateway.clone(), Arc::new(MockTools::new()));

        let result = runner
            .run(task(AgentType::Explorer), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.summary, "parse_config reads foreman.toml");
        assert!(result.actions_taken.is_empty());
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_structured_tool_call_in_first_chunk_is_executed() {
        let gateway = Arc::new(ScriptedGateway::queued(vec![
            Script::Calls(
                vec![ToolCall::new("read_file").with_arg("path", "src/config.rs")],
                String::new(),
            ),
            Script::reply("It loads the config."),
        ]));
        let tools = Arc::new(MockTools::new());
        let runner = runner(gateway.clone(), tools.clone());

        let result = runner
            .run(task(AgentType::Explorer), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.actions_taken, vec!["read_file(path=src/config.rs)"]);
        assert_eq!(tools.executed().len(), 1);
        let calls = gateway.calls();
        assert!(calls[0].tools > 0);
        assert!(calls[1].prompt.contains("Tool results"));
    }

    #[tokio::test]
    async fn test_text_embedded_calls_without_native_tools() {
        let gateway = Arc::new(ScriptedGateway::queued(vec![
            Script::reply(r#"Let me look. {"name": "cat", "arguments": {"path": "Cargo.toml"}}"#),
            Script::reply("The workspace has four members."),
        ]));
        let tools = Arc::new(MockTools::new());
        let ctx = engine(gateway.clone(), tools.clone(), RegulatorConfig::default())
            .with_capabilities(Arc::new(StaticCapabilities::text_only()));
        let runner = AgentRunner::new(Arc::new(ctx));

        let result = runner
            .run(task(AgentType::Explorer), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.success);
        let executed = tools.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].tool_name, "read_file");
        let calls = gateway.calls();
        assert_eq!(calls[0].tools, 0);
        assert!(calls[0].system.contains("## Tools"));
    }

    #[tokio::test]
    async fn test_denied_tool_is_not_executed() {
        let gateway = Arc::new(ScriptedGateway::queued(vec![
            Script::Calls(
                vec![
                    ToolCall::new("write_file")
                        .with_arg("path", "a.rs")
                        .with_arg("content", ""),
                ],
                String::new(),
            ),
            Script::reply("I cannot write files."),
        ]));
        let tools = Arc::new(MockTools::new());
        let runner = runner(gateway.clone(), tools.clone());

        let result = runner
            .run(task(AgentType::Explorer), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.success);
        assert!(tools.executed().is_empty());
        assert!(result.actions_taken[0].ends_with("[failed]"));
        assert!(gateway.calls()[1].prompt.contains("PERMISSION_DENIED"));
    }

    #[tokio::test]
    async fn test_iteration_limit_fails() {
        let gateway = Arc::new(ScriptedGateway::new(|_| {
            Script::Calls(
                vec![ToolCall::new("grep_search").with_arg("pattern", "fn main")],
                String::new(),
            )
        }));
        let ctx = engine(gateway, Arc::new(MockTools::new()), RegulatorConfig::default())
            .with_params(EngineParams::default().with_max_agent_iterations(3));
        let runner = AgentRunner::new(Arc::new(ctx));

        let result = runner
            .run(task(AgentType::Explorer), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, AgentRunStatus::Failed);
        assert_eq!(result.actions_taken.len(), 3);
    }

    #[tokio::test]
    async fn test_cancellation_releases_lease() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::Hang));
        let ctx = Arc::new(engine(
            gateway,
            Arc::new(MockTools::new()),
            RegulatorConfig::default(),
        ));
        let runner = AgentRunner::new(ctx.clone());
        let token = CancellationToken::new();

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let result = runner.run(task(AgentType::Executor), &token).await.unwrap();
        assert!(result.is_cancelled());

        let status = ctx.regulator.status();
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.grants, status.releases);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_lease() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::Hang));
        let ctx = Arc::new(
            engine(gateway, Arc::new(MockTools::new()), RegulatorConfig::default())
                .with_params(EngineParams::default().with_agent_timeout(Duration::from_secs(5))),
        );
        let runner = AgentRunner::new(ctx.clone());

        let result = runner
            .run(task(AgentType::Executor), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, AgentRunStatus::TimedOut);
        assert_eq!(ctx.regulator.status().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_puts_model_in_cooldown() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::Hang));
        let ctx = Arc::new(
            engine(
                gateway,
                Arc::new(MockTools::new()),
                RegulatorConfig::default().with_cooldown_after_error(Duration::from_secs(30)),
            )
            .with_params(EngineParams::default().with_agent_timeout(Duration::from_secs(5))),
        );
        let runner = AgentRunner::new(ctx.clone());
        let task = task(AgentType::Executor);
        let model = task.model.clone();

        let result = runner.run(task, &CancellationToken::new()).await.unwrap();
        assert_eq!(result.status, AgentRunStatus::TimedOut);

        let retry = tokio::time::timeout(Duration::from_secs(10), ctx.regulator.acquire(&model)).await;
        assert!(retry.is_err());
    }

    #[tokio::test]
    async fn test_model_error_is_recoverable_but_unreachable_is_hard() {
        let gateway = Arc::new(ScriptedGateway::queued(vec![Script::Fail(
            "model not loaded".into(),
        )]));
        let result = runner(gateway, Arc::new(MockTools::new()))
            .run(task(AgentType::Executor), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.status, AgentRunStatus::Failed);
        assert!(result.review_text().starts_with("AGENT ERROR:"));

        let gateway = Arc::new(ScriptedGateway::queued(vec![Script::Unreachable]));
        let err = runner(gateway, Arc::new(MockTools::new()))
            .run(task(AgentType::Executor), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentRunError::BackendUnreachable(_)));
    }

    #[tokio::test]
    async fn test_full_queue_is_admission_rejected() {
        let gateway = Arc::new(ScriptedGateway::queued(vec![]));
        let ctx = Arc::new(engine(
            gateway,
            Arc::new(MockTools::new()),
            RegulatorConfig::default()
                .with_max_concurrent_requests(1)
                .with_request_queue_size(0),
        ));
        let model = task(AgentType::Explorer).model;
        let _held = ctx.regulator.acquire(&model).await.unwrap();

        let result = AgentRunner::new(ctx.clone())
            .run(task(AgentType::Explorer), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, AgentRunStatus::AdmissionRejected);
        assert!(result.status.is_retryable());
    }
}
