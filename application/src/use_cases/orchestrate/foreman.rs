//! Inference calls made by the foreman itself: routing and review.

use super::Orchestrator;
use super::supervision::Supervision;
use super::types::OrchestratorError;
use crate::ports::llm_gateway::StreamReply;
use crate::use_cases::shared::{ConverseError, converse};
use foreman_domain::{
    Advisory, AgentPromptTemplate, AgentResult, AgentType, FollowUp, ReviewContext, ReviewDecision, decide_review,
    extract_follow_up, spawn_tool_definitions,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What the foreman model made of a request the heuristics could not route
pub(super) enum ForemanDecision {
    Answer(String),
    Delegate(FollowUp),
    Cancelled,
}

/// What review made of a round
pub(super) enum ReviewVerdict {
    Decided(ReviewDecision),
    Cancelled,
}

impl Orchestrator {
    /// Foreman system prompt and the spawn tool schemas to offer with it
    async fn foreman_prompt(&self) -> (String, Vec<Value>) {
        let ctx = &self.ctx;
        let spawn_tools = spawn_tool_definitions();
        let mut system = AgentPromptTemplate::foreman_system(&ctx.params.project_dir);

        if ctx
            .capabilities
            .supports_tool_calls(&ctx.roster.orchestration)
            .await
        {
            (system, spawn_tools.iter().map(|t| t.json_schema()).collect())
        } else {
            system.push('\n');
            system.push_str(&AgentPromptTemplate::spawn_instructions(&spawn_tools));
            (system, Vec::new())
        }
    }

    async fn ask(
        &self,
        prompt: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<StreamReply, ConverseError> {
        let (system, tools) = self.foreman_prompt().await;
        converse(
            &self.ctx,
            &self.ctx.roster.orchestration,
            &system,
            prompt,
            &tools,
            cancellation_token,
        )
        .await
    }

    /// Let the foreman answer directly or pick an agent.
    pub(super) async fn route_with_foreman(
        &self,
        request: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<ForemanDecision, OrchestratorError> {
        let prompt = AgentPromptTemplate::foreman_request(request, &self.history.transcript());

        match self.ask(&prompt, cancellation_token).await {
            Ok(reply) => Ok(
                match extract_follow_up(&reply.tool_calls, &reply.text, request) {
                    Some(follow_up) => {
                        info!("Orchestrator: foreman delegated to {}", follow_up.agent_type);
                        ForemanDecision::Delegate(follow_up)
                    }
                    None => ForemanDecision::Answer(reply.text.trim().to_string()),
                },
            ),
            Err(ConverseError::Cancelled) => Ok(ForemanDecision::Cancelled),
            Err(ConverseError::Gateway(e)) if e.is_unreachable() => {
                Err(OrchestratorError::BackendUnreachable(e.to_string()))
            }
            Err(e) => {
                warn!(
                    "Orchestrator: foreman routing failed ({:?}), dispatching an explorer",
                    e
                );
                Ok(ForemanDecision::Delegate(FollowUp {
                    agent_type: AgentType::Explorer,
                    task: request.to_string(),
                }))
            }
        }
    }

    /// Review a round's results and decide the next move.
    ///
    /// A failed review call (other than an unreachable backend) falls back
    /// to the agents' own output.
    pub(super) async fn review_round(
        &self,
        sup: &mut Supervision<'_>,
        results: &[AgentResult],
        cancellation_token: &CancellationToken,
    ) -> Result<ReviewVerdict, OrchestratorError> {
        let max_retries = self.ctx.params.max_retries_per_step;
        let context = ReviewContext {
            all_succeeded: !results.is_empty() && results.iter().all(|r| r.success),
            last_agent: sup.last_agent(),
            retries_left: sup.retries_left(max_retries),
        };

        let prompt = AgentPromptTemplate::review(sup.request, results);
        let (follow_up, review_text) = match self.ask(&prompt, cancellation_token).await {
            Ok(reply) => (
                extract_follow_up(&reply.tool_calls, &reply.text, sup.current_task()),
                reply.text,
            ),
            Err(ConverseError::Cancelled) => return Ok(ReviewVerdict::Cancelled),
            Err(ConverseError::Gateway(e)) if e.is_unreachable() => {
                return Err(OrchestratorError::BackendUnreachable(e.to_string()));
            }
            Err(e) => {
                let detail = match e {
                    ConverseError::Admission(e) => e.to_string(),
                    ConverseError::Gateway(e) => e.to_string(),
                    ConverseError::Cancelled => "cancelled".to_string(),
                };
                warn!("Orchestrator: review failed, using agent output: {}", detail);
                sup.advise(&self.ctx, Advisory::ReviewFallback(detail));
                (None, sup.best_partial())
            }
        };

        Ok(ReviewVerdict::Decided(decide_review(
            follow_up,
            &review_text,
            &context,
        )))
    }
}
