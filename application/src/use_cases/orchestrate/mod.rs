//! Orchestrator use case
//!
//! The foreman: classifies a request, answers it directly or routes it to
//! planning or a single agent, then supervises Dispatch → Review rounds
//! until the review says done, the round budget runs out, or the caller
//! cancels.
//!
//! ```text
//! Received → Classifying ─┬─ Answering ───────────────────────────→ Done
//!                         ├─ Planning ──→ Dispatching
//!                         └─ Dispatching → AwaitingResult → Reviewing
//!                                                              │
//!          Retry / Handoff → Dispatching, Replan → Planning ←──┤
//!                                              Done / Exhausted ┘
//! ```

mod dispatch;
mod foreman;
mod supervision;
mod types;

pub use types::OrchestratorError;

use crate::context::EngineContext;
use crate::ports::llm_gateway::GatewayError;
use crate::regulator::RegulatorStatus;
use crate::use_cases::plan_request::Planner;
use crate::use_cases::run_agent::AgentRunner;
use foreman::{ForemanDecision, ReviewVerdict};
use foreman_domain::{
    Advisory, AgentResult, AgentType, ConversationHistory, Model, OrchestrationOutcome,
    OutcomeStatus, ReviewDecision, Route, SupervisionEvent, SupervisionState, classify,
    route_request,
};
use serde_json::json;
use std::sync::Arc;
use supervision::{Supervision, Work};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Supervises one request at a time and keeps the conversation history
/// across requests.
pub struct Orchestrator {
    ctx: Arc<EngineContext>,
    runner: AgentRunner,
    planner: Planner,
    history: ConversationHistory,
}

impl Orchestrator {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self {
            runner: AgentRunner::new(ctx.clone()),
            planner: Planner::new(ctx.clone()),
            history: ConversationHistory::new(ctx.params.history_limit),
            ctx,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Forget earlier exchanges; the next request starts a new conversation.
    pub fn reset_conversation(&mut self) {
        self.history.clear();
        info!("Orchestrator: conversation reset");
    }

    pub fn status(&self) -> RegulatorStatus {
        self.ctx.regulator.status()
    }

    /// Ask the backend which models it serves.
    pub async fn check_backend(&self) -> Result<Vec<Model>, OrchestratorError> {
        self.ctx
            .gateway
            .available_models()
            .await
            .map_err(|e| match e {
                GatewayError::ConnectionError(_) => {
                    OrchestratorError::BackendUnreachable(e.to_string())
                }
                other => OrchestratorError::Backend(other),
            })
    }

    /// Handle one user request.
    ///
    /// Only an unreachable backend (or an empty request) is an error. Agent
    /// failures, rejected plans, and failed reviews are absorbed into the
    /// outcome and its advisories.
    pub async fn handle(
        &mut self,
        request: &str,
        cancellation_token: &CancellationToken,
    ) -> Result<OrchestrationOutcome, OrchestratorError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(OrchestratorError::EmptyRequest);
        }

        let classification = classify(request);
        let mut sup = Supervision::new(request, classification);
        sup.advance(&self.ctx, SupervisionEvent::Accepted);
        if classification.ambiguous {
            sup.advise(&self.ctx, Advisory::ClassificationAmbiguous);
        }
        info!(
            "Orchestrator: classified as {} (multi-step: {})",
            classification.complexity, classification.multi_step
        );
        self.ctx.log_event(
            "classified",
            json!({
                "request": request,
                "complexity": classification.complexity,
                "ambiguous": classification.ambiguous,
                "multi_step": classification.multi_step,
            }),
        );

        self.route(&mut sup, cancellation_token).await?;
        self.supervise(&mut sup, cancellation_token).await?;

        let outcome = sup.into_outcome();
        info!(
            "Orchestrator: {:?} in state {} after {} round(s)",
            outcome.status, outcome.final_state, outcome.rounds
        );
        self.ctx.log_event(
            "outcome",
            json!({
                "status": outcome.status,
                "final_state": outcome.final_state,
                "rounds": outcome.rounds,
                "dispatches": outcome.dispatch_count(),
                "advisories": &outcome.advisories,
            }),
        );

        if outcome.status != OutcomeStatus::Cancelled {
            self.history.push_exchange(request, outcome.response.clone());
        }
        Ok(outcome)
    }

    /// Leave the Classifying state.
    async fn route(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let route = route_request(sup.request, &sup.classification);
        self.ctx
            .log_event("routed", json!({ "route": format!("{:?}", route) }));

        match route {
            Route::Direct(reply) => {
                sup.advance(&self.ctx, SupervisionEvent::RoutedToAnswer);
                sup.final_summary = Some(reply.text().to_string());
                sup.advance(&self.ctx, SupervisionEvent::Answered);
            }
            Route::Plan => sup.advance(&self.ctx, SupervisionEvent::RoutedToPlan),
            Route::Dispatch(agent_type) => {
                let request = sup.request;
                sup.dispatch_single(agent_type, request);
                sup.advance(&self.ctx, SupervisionEvent::RoutedToDispatch);
            }
            Route::ForemanDecides => {
                match self.route_with_foreman(sup.request, cancellation_token).await? {
                    ForemanDecision::Answer(text) => {
                        sup.advance(&self.ctx, SupervisionEvent::RoutedToAnswer);
                        sup.final_summary = Some(text);
                        sup.advance(&self.ctx, SupervisionEvent::Answered);
                    }
                    ForemanDecision::Delegate(follow_up)
                        if follow_up.agent_type == AgentType::Planner =>
                    {
                        sup.plan_request = follow_up.task;
                        sup.advance(&self.ctx, SupervisionEvent::RoutedToPlan);
                    }
                    ForemanDecision::Delegate(follow_up) => {
                        sup.dispatch_single(follow_up.agent_type, follow_up.task);
                        sup.advance(&self.ctx, SupervisionEvent::RoutedToDispatch);
                    }
                    ForemanDecision::Cancelled => sup.advance(&self.ctx, SupervisionEvent::Cancel),
                }
            }
        }
        Ok(())
    }

    /// Drive the state machine until it reaches a terminal state.
    async fn supervise(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        while !sup.state.is_terminal() {
            if cancellation_token.is_cancelled() {
                sup.advance(&self.ctx, SupervisionEvent::Cancel);
                break;
            }

            match sup.state {
                SupervisionState::Planning => self.plan_phase(sup, cancellation_token).await?,
                SupervisionState::Dispatching => {
                    self.dispatch_phase(sup, cancellation_token).await?
                }
                SupervisionState::Reviewing => self.review_phase(sup, cancellation_token).await?,
                SupervisionState::Retry | SupervisionState::Handoff | SupervisionState::Replan => {
                    sup.advance(&self.ctx, SupervisionEvent::Resume)
                }
                state => {
                    warn!("Orchestrator: no progress possible from {}", state);
                    break;
                }
            }
        }
        Ok(())
    }

    async fn plan_phase(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let plan_request = sup.plan_request.clone();
        match self
            .planner
            .plan(&plan_request, &sup.classification, cancellation_token)
            .await
        {
            Ok(plan) => {
                self.ctx.progress.on_plan(&plan);
                self.ctx.log_event("plan", json!({ "plan": &plan }));
                sup.install_plan(plan);
            }
            Err(e) if e.is_cancelled() => {
                sup.advance(&self.ctx, SupervisionEvent::Cancel);
                return Ok(());
            }
            Err(e) if e.is_unreachable() => {
                return Err(OrchestratorError::BackendUnreachable(e.to_string()));
            }
            Err(e) => {
                warn!("Orchestrator: running unplanned: {}", e);
                sup.advise(&self.ctx, Advisory::PlanRejected(e.to_string()));
                sup.fall_back_unplanned();
            }
        }
        sup.advance(&self.ctx, SupervisionEvent::PlanReady);
        Ok(())
    }

    async fn dispatch_phase(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        sup.round += 1;
        self.ctx
            .progress
            .on_round_start(sup.round, self.ctx.params.max_rounds);
        sup.advance(&self.ctx, SupervisionEvent::Dispatched);

        let results = self.dispatch_round(sup, cancellation_token).await?;
        self.ctx.log_event(
            "round_results",
            json!({ "round": sup.round, "results": &results }),
        );
        let cancelled =
            cancellation_token.is_cancelled() || results.iter().any(AgentResult::is_cancelled);

        sup.last_results = match sup.work {
            Work::Plan => sup.step_results.values().cloned().collect(),
            Work::Single { .. } => results.clone(),
        };
        sup.record_round(results);

        if cancelled {
            sup.advance(&self.ctx, SupervisionEvent::Cancel);
        } else {
            sup.advance(&self.ctx, SupervisionEvent::ResultsReady);
        }
        Ok(())
    }

    async fn review_phase(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let results = sup.last_results.clone();
        let decision = match self.review_round(sup, &results, cancellation_token).await? {
            ReviewVerdict::Decided(decision) => decision,
            ReviewVerdict::Cancelled => {
                sup.advance(&self.ctx, SupervisionEvent::Cancel);
                return Ok(());
            }
        };

        let params = &self.ctx.params;
        let outcome = decision.outcome();
        let budget_left = sup.round < params.max_rounds;
        sup.record_review(outcome);
        info!(
            "Orchestrator: round {}/{} reviewed as {:?}",
            sup.round, params.max_rounds, outcome
        );
        self.ctx.log_event(
            "review",
            json!({ "round": sup.round, "outcome": outcome, "budget_left": budget_left }),
        );

        match decision {
            ReviewDecision::Done { summary } => sup.final_summary = Some(summary),
            _ if !budget_left => {}
            ReviewDecision::Retry { task } => sup.prepare_retry(task, params.max_retries_per_step),
            ReviewDecision::Handoff { agent_type, task } => sup.prepare_handoff(agent_type, task),
            ReviewDecision::Replan { task } => sup.prepare_replan(task),
        }
        sup.advance(
            &self.ctx,
            SupervisionEvent::Reviewed {
                outcome,
                budget_left,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineParams;
    use crate::regulator::RegulatorConfig;
    use crate::use_cases::test_support::{MockTools, RecordedCall, Script, ScriptedGateway, engine};
    use foreman_domain::{DirectReply, ReviewOutcome, ToolCall};
    use std::time::Duration;

    fn is_review(call: &RecordedCall) -> bool {
        call.prompt.starts_with("You are reviewing work")
    }

    fn is_planner(call: &RecordedCall) -> bool {
        call.system.contains("You are a planner agent")
    }

    fn is_agent(call: &RecordedCall, agent: AgentType) -> bool {
        call.system.contains(&format!("You are an {} agent", agent))
    }

    fn regulator() -> RegulatorConfig {
        RegulatorConfig::default().with_cooldown_after_error(Duration::ZERO)
    }

    fn orchestrator(gateway: &Arc<ScriptedGateway>, params: EngineParams) -> Orchestrator {
        orchestrator_with(gateway, params, regulator())
    }

    fn orchestrator_with(
        gateway: &Arc<ScriptedGateway>,
        params: EngineParams,
        regulator: RegulatorConfig,
    ) -> Orchestrator {
        let ctx = engine(gateway.clone(), Arc::new(MockTools::new()), regulator).with_params(params);
        Orchestrator::new(Arc::new(ctx))
    }

    const CALL_SITE_PLAN: &str = r#"{"analysis": "add the field, then fix callers", "steps": [
        {"step_num": 1, "agent_type": "explorer", "description": "Find Config and its call sites", "depends_on": []},
        {"step_num": 2, "agent_type": "executor", "description": "Update src/a.rs", "depends_on": [1]},
        {"step_num": 3, "agent_type": "executor", "description": "Update src/b.rs", "depends_on": [1]},
        {"step_num": 4, "agent_type": "executor", "description": "Update src/c.rs", "depends_on": [1]}
    ]}"#;

    fn call_site_responder(call: &RecordedCall) -> Script {
        if is_review(call) {
            Script::reply("Config now has a timeout field and every call site passes it.")
        } else if is_planner(call) {
            Script::reply(CALL_SITE_PLAN)
        } else if is_agent(call, AgentType::Explorer) {
            Script::reply("Config is in src/config.rs; callers are src/a.rs, src/b.rs, src/c.rs.")
        } else {
            Script::reply("Updated the call site.")
        }
    }

    #[tokio::test]
    async fn test_simple_explain_single_round() {
        let gateway = Arc::new(ScriptedGateway::new(|call| {
            if is_review(call) {
                Script::reply("parse_config loads foreman.toml and applies overrides.")
            } else {
                Script::reply("parse_config reads the file, then merges env overrides.")
            }
        }));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());

        let outcome = orchestrator
            .handle(
                "explain function parse_config in src/config.rs",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.final_state, SupervisionState::Done);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.dispatch_count(), 1);
        assert!(outcome.plan.is_none());
        assert_eq!(
            outcome.response,
            "parse_config loads foreman.toml and applies overrides."
        );

        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(is_agent(&calls[0], AgentType::Explorer));
        assert_eq!(calls[0].model, Model::new("llama3.2:3b"));
        assert!(is_review(&calls[1]));
        assert_eq!(orchestrator.history().messages().len(), 2);
    }

    #[tokio::test]
    async fn test_greeting_makes_no_inference_call() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::reply("unused")));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());

        let outcome = orchestrator
            .handle("hello", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.response, DirectReply::Greeting.text());
        assert_eq!(outcome.rounds, 0);
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_request_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::reply("unused")));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());
        let err = orchestrator
            .handle("   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::EmptyRequest));
    }

    #[tokio::test]
    async fn test_call_site_plan_runs_group_concurrently() {
        let gateway = Arc::new(ScriptedGateway::with_delay(
            call_site_responder,
            Duration::from_millis(30),
        ));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());

        let outcome = orchestrator
            .handle(
                "add field timeout to Config and update 3 call sites",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.rounds, 1);
        assert_eq!(outcome.dispatch_count(), 4);
        let plan = outcome.plan.as_ref().unwrap();
        assert_eq!(plan.parallel_groups(), &[vec![1], vec![2, 3, 4]]);

        // Step 1 ran before any executor started
        let calls = gateway.calls();
        let explorer = calls
            .iter()
            .position(|c| is_agent(c, AgentType::Explorer))
            .unwrap();
        let first_executor = calls
            .iter()
            .position(|c| is_agent(c, AgentType::Executor))
            .unwrap();
        assert!(explorer < first_executor);
        assert_eq!(gateway.peak_in_flight(), 3);

        // Executors saw step 1's findings
        assert!(calls
            .iter()
            .filter(|c| is_agent(c, AgentType::Executor))
            .all(|c| c.prompt.contains("callers are src/a.rs")));
    }

    #[tokio::test]
    async fn test_call_site_plan_respects_concurrency_limit() {
        let gateway = Arc::new(ScriptedGateway::with_delay(
            call_site_responder,
            Duration::from_millis(30),
        ));
        let mut orchestrator = orchestrator_with(
            &gateway,
            EngineParams::default(),
            regulator().with_max_concurrent_requests(2),
        );

        let outcome = orchestrator
            .handle(
                "add field timeout to Config and update 3 call sites",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.dispatch_count(), 4);
        assert!(gateway.peak_in_flight() <= 2);
        assert_eq!(orchestrator.status().in_flight, 0);
    }

    #[tokio::test]
    async fn test_rejected_plan_runs_unplanned() {
        let gateway = Arc::new(ScriptedGateway::new(|call| {
            if is_review(call) {
                Script::reply("The storage layer now uses one trait.")
            } else if is_planner(call) {
                Script::reply(
                    r#"{"steps": [
                        {"step_num": 1, "agent_type": "executor", "description": "edit", "depends_on": [2]},
                        {"step_num": 2, "agent_type": "explorer", "description": "look", "depends_on": []}
                    ]}"#,
                )
            } else {
                Script::reply("Refactored the storage layer.")
            }
        }));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());

        let outcome = orchestrator
            .handle(
                "refactor the storage layer across the codebase",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert!(outcome.plan.is_none());
        assert!(matches!(
            outcome.advisories.as_slice(),
            [Advisory::PlanRejected(_)]
        ));
        let calls = gateway.calls();
        assert!(calls.iter().any(|c| is_agent(c, AgentType::Executor)));
    }

    #[tokio::test]
    async fn test_retry_then_handoff_then_done() {
        let gateway = Arc::new(ScriptedGateway::new(|call| {
            if is_review(call) {
                if call.prompt.contains("AGENT ERROR") {
                    Script::reply("The executor failed.")
                } else {
                    Script::reply("The test fails because the fixture path moved.")
                }
            } else if is_agent(call, AgentType::Executor) {
                Script::Fail("model crashed".into())
            } else {
                Script::reply("The fixture path moved to tests/data.")
            }
        }));
        let params = EngineParams::default()
            .with_max_rounds(3)
            .with_max_retries_per_step(1);
        let mut orchestrator = orchestrator(&gateway, params);

        let outcome = orchestrator
            .handle("fix the failing test in parser.rs", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.rounds, 3);
        let reviews: Vec<_> = outcome.history.iter().map(|r| r.review).collect();
        assert_eq!(
            reviews,
            vec![
                Some(ReviewOutcome::Retry),
                Some(ReviewOutcome::Handoff),
                Some(ReviewOutcome::Done)
            ]
        );
        assert_eq!(outcome.history[2].results[0].agent_type, AgentType::Explorer);
    }

    #[tokio::test]
    async fn test_round_budget_exhausted() {
        let gateway = Arc::new(ScriptedGateway::new(|call| {
            if is_review(call) {
                Script::reply("The executor failed.")
            } else {
                Script::Fail("model crashed".into())
            }
        }));
        let params = EngineParams::default()
            .with_max_rounds(2)
            .with_max_retries_per_step(2);
        let mut orchestrator = orchestrator(&gateway, params);

        let outcome = orchestrator
            .handle("fix the failing test in parser.rs", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Incomplete);
        assert_eq!(outcome.final_state, SupervisionState::Exhausted);
        assert_eq!(outcome.rounds, 2);
        assert!(outcome.response.contains("AGENT ERROR"));
        assert!(outcome
            .display_text()
            .starts_with("[incomplete after 2 round(s)]"));
    }

    #[tokio::test]
    async fn test_cancellation_mid_dispatch() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::Hang));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = orchestrator
            .handle("fix the failing test in parser.rs", &token)
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Cancelled);
        assert_eq!(outcome.final_state, SupervisionState::Cancelled);
        assert_eq!(orchestrator.status().in_flight, 0);
        assert!(orchestrator.history().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::Unreachable));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());

        let err = orchestrator
            .handle("fix the failing test in parser.rs", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_unreachable());
    }

    #[tokio::test]
    async fn test_foreman_answers_and_history_carries_over() {
        let gateway = Arc::new(ScriptedGateway::new(|_| {
            Script::reply("Lifetimes describe how long references stay valid.")
        }));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());
        let token = CancellationToken::new();

        let outcome = orchestrator
            .handle("tell me about lifetimes", &token)
            .await
            .unwrap();
        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.rounds, 0);
        assert_eq!(
            outcome.response,
            "Lifetimes describe how long references stay valid."
        );

        orchestrator
            .handle("tell me more about elision", &token)
            .await
            .unwrap();
        let calls = gateway.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].prompt.starts_with("Conversation so far:"));
        assert!(calls[1].prompt.contains("tell me about lifetimes"));

        orchestrator.reset_conversation();
        assert!(orchestrator.history().is_empty());
        orchestrator
            .handle("tell me about ownership", &token)
            .await
            .unwrap();
        assert!(!gateway.calls()[2].prompt.starts_with("Conversation so far:"));
    }

    #[tokio::test]
    async fn test_foreman_delegates_to_explorer() {
        let gateway = Arc::new(ScriptedGateway::new(|call| {
            if is_review(call) {
                Script::reply("The storage layer has two backends.")
            } else if is_agent(call, AgentType::Explorer) {
                Script::reply("Found a sled backend and a memory backend.")
            } else {
                Script::Calls(
                    vec![ToolCall::new("spawn_explorer")
                        .with_arg("task", "Summarize the storage backends")],
                    String::new(),
                )
            }
        }));
        let mut orchestrator = orchestrator(&gateway, EngineParams::default());

        let outcome = orchestrator
            .handle("tell me about the storage layer", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Completed);
        assert_eq!(outcome.rounds, 1);
        let explorer = gateway
            .calls()
            .into_iter()
            .find(|c| is_agent(c, AgentType::Explorer))
            .unwrap();
        assert!(explorer.prompt.contains("Summarize the storage backends"));
    }

    #[tokio::test]
    async fn test_check_backend() {
        let gateway = Arc::new(ScriptedGateway::new(|_| Script::reply("unused")));
        let orchestrator = orchestrator(&gateway, EngineParams::default());
        let models = orchestrator.check_backend().await.unwrap();
        assert_eq!(models.len(), 2);
    }
}
