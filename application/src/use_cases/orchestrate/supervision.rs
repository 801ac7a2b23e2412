//! Per-request supervision bookkeeping.
//!
//! One [`Supervision`] lives for one request: the state machine position,
//! the round counter, the current plan and its step outcomes, retry counts,
//! and the round history that ends up in the outcome.

use crate::context::EngineContext;
use foreman_domain::{
    Advisory, AgentResult, AgentRunStatus, AgentType, Classification, Complexity,
    OrchestrationOutcome, OutcomeStatus, Plan, ReviewOutcome, RoundRecord, Route, StepOutcomes,
    SupervisionEvent, SupervisionState, route_request,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Retry counter key for unplanned work
const UNPLANNED: u32 = 0;

/// What the next dispatch round runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Work {
    /// One agent runner on one task
    Single { agent_type: AgentType, task: String },
    /// The pending steps of the current plan
    Plan,
}

pub(super) struct Supervision<'r> {
    pub request: &'r str,
    pub classification: Classification,
    pub state: SupervisionState,
    pub round: u32,
    pub work: Work,
    /// Text handed to the planner; the request unless a replan narrowed it
    pub plan_request: String,
    pub plan: Option<Plan>,
    /// Plan steps the next round dispatches
    pub pending: BTreeSet<u32>,
    pub outcomes: StepOutcomes,
    /// Latest result per plan step
    pub step_results: BTreeMap<u32, AgentResult>,
    retries: HashMap<u32, u32>,
    /// Results the next review looks at
    pub last_results: Vec<AgentResult>,
    pub rounds: Vec<RoundRecord>,
    pub advisories: Vec<Advisory>,
    pub final_summary: Option<String>,
}

impl<'r> Supervision<'r> {
    pub fn new(request: &'r str, classification: Classification) -> Self {
        Self {
            request,
            classification,
            state: SupervisionState::Received,
            round: 0,
            work: Work::Single {
                agent_type: AgentType::Explorer,
                task: request.to_string(),
            },
            plan_request: request.to_string(),
            plan: None,
            pending: BTreeSet::new(),
            outcomes: StepOutcomes::default(),
            step_results: BTreeMap::new(),
            retries: HashMap::new(),
            last_results: Vec::new(),
            rounds: Vec::new(),
            advisories: Vec::new(),
            final_summary: None,
        }
    }

    pub fn advance(&mut self, ctx: &EngineContext, event: SupervisionEvent) {
        let next = self.state.next(event);
        if next != self.state {
            debug!("Orchestrator: {} -> {}", self.state, next);
            ctx.progress.on_state(next);
        }
        self.state = next;
    }

    pub fn advise(&mut self, ctx: &EngineContext, advisory: Advisory) {
        ctx.progress.on_advisory(&advisory);
        ctx.log_event("advisory", json!({ "advisory": &advisory }));
        self.advisories.push(advisory);
    }

    // ==================== Work selection ====================

    pub fn dispatch_single(&mut self, agent_type: AgentType, task: impl Into<String>) {
        self.work = Work::Single {
            agent_type,
            task: task.into(),
        };
    }

    /// Unplanned fallback when planning fails
    pub fn fall_back_unplanned(&mut self) {
        let agent_type = fallback_agent(&self.plan_request);
        let task = self.plan_request.clone();
        self.plan = None;
        self.pending.clear();
        self.dispatch_single(agent_type, task);
    }

    pub fn install_plan(&mut self, plan: Plan) {
        self.pending = plan.steps().iter().map(|s| s.step_num).collect();
        self.outcomes = StepOutcomes::default();
        self.step_results.clear();
        self.retries.clear();
        self.plan = Some(plan);
        self.work = Work::Plan;
    }

    /// Agent type of unplanned work; None while a plan runs
    pub fn last_agent(&self) -> Option<AgentType> {
        match &self.work {
            Work::Single { agent_type, .. } => Some(*agent_type),
            Work::Plan => None,
        }
    }

    /// Task text a bare follow-up should default to
    pub fn current_task(&self) -> &str {
        match &self.work {
            Work::Single { task, .. } => task,
            Work::Plan => self.request,
        }
    }

    // ==================== Retry bookkeeping ====================

    fn retries_used(&self, key: u32) -> u32 {
        self.retries.get(&key).copied().unwrap_or(0)
    }

    fn retryable_steps(&self, max_retries: u32) -> Vec<u32> {
        self.step_results
            .iter()
            .filter(|(_, r)| !r.success && r.status != AgentRunStatus::Skipped)
            .map(|(&n, _)| n)
            .filter(|&n| self.retries_used(n) < max_retries)
            .collect()
    }

    pub fn retries_left(&self, max_retries: u32) -> bool {
        match self.work {
            Work::Single { .. } => self.retries_used(UNPLANNED) < max_retries,
            Work::Plan => !self.retryable_steps(max_retries).is_empty(),
        }
    }

    /// Set up the next round to repeat the failed work.
    pub fn prepare_retry(&mut self, task: Option<String>, max_retries: u32) {
        if let Work::Single { task: current, .. } = &mut self.work {
            *self.retries.entry(UNPLANNED).or_insert(0) += 1;
            if let Some(task) = task {
                *current = task;
            }
            return;
        }

        let Some(plan) = &self.plan else {
            return;
        };
        for step in self.retryable_steps(max_retries) {
            *self.retries.entry(step).or_insert(0) += 1;
            self.pending.insert(step);
            self.pending.extend(plan.dependents_of(step));
        }
        for step in &self.pending {
            self.outcomes.forget(*step);
        }
    }

    /// Set up the next round for a different agent type.
    pub fn prepare_handoff(&mut self, agent_type: AgentType, task: Option<String>) {
        match agent_type {
            AgentType::Planner => self.prepare_replan(task),
            AgentType::Explorer | AgentType::Executor => {
                let task = task.unwrap_or_else(|| self.current_task().to_string());
                self.retries.insert(UNPLANNED, 0);
                self.dispatch_single(agent_type, task);
            }
        }
    }

    pub fn prepare_replan(&mut self, task: Option<String>) {
        self.plan_request = task.unwrap_or_else(|| self.request.to_string());
    }

    // ==================== Results ====================

    pub fn record_round(&mut self, results: Vec<AgentResult>) {
        self.rounds.push(RoundRecord {
            round: self.round,
            results,
            review: None,
        });
    }

    pub fn record_review(&mut self, outcome: ReviewOutcome) {
        if let Some(last) = self.rounds.last_mut() {
            last.review = Some(outcome);
        }
    }

    /// Summaries of the successful results, or the errors if none succeeded
    pub fn best_partial(&self) -> String {
        let succeeded: Vec<&AgentResult> = self.last_results.iter().filter(|r| r.success).collect();
        if !succeeded.is_empty() {
            return combine(succeeded.into_iter(), |r| r.summary.clone());
        }
        if self.last_results.is_empty() {
            return "No agent produced a result.".to_string();
        }
        combine(self.last_results.iter(), AgentResult::review_text)
    }

    pub fn into_outcome(self) -> OrchestrationOutcome {
        let status = match self.state {
            SupervisionState::Done => OutcomeStatus::Completed,
            SupervisionState::Cancelled => OutcomeStatus::Cancelled,
            _ => OutcomeStatus::Incomplete,
        };
        let response = match (&status, &self.final_summary) {
            (OutcomeStatus::Completed, Some(summary)) if !summary.trim().is_empty() => {
                summary.trim().to_string()
            }
            _ => self.best_partial(),
        };

        OrchestrationOutcome {
            status,
            response,
            complexity: self.classification.complexity,
            final_state: self.state,
            rounds: self.round,
            plan: self.plan,
            history: self.rounds,
            advisories: self.advisories,
        }
    }
}

fn combine<'a>(
    results: impl Iterator<Item = &'a AgentResult>,
    text: impl Fn(&AgentResult) -> String,
) -> String {
    let results: Vec<&AgentResult> = results.collect();
    if let [only] = results.as_slice() {
        return text(*only);
    }
    results
        .iter()
        .map(|r| match r.step_num {
            Some(n) => format!("Step {} ({}): {}", n, r.agent_type, text(*r)),
            None => format!("{}: {}", r.agent_type, text(*r)),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Agent for a request that was meant to be planned but runs unplanned
fn fallback_agent(text: &str) -> AgentType {
    let single_step = Classification {
        complexity: Complexity::Simple,
        ambiguous: false,
        multi_step: false,
    };
    match route_request(text, &single_step) {
        Route::Dispatch(agent_type) => agent_type,
        Route::Direct(_) | Route::Plan | Route::ForemanDecides => AgentType::Executor,
    }
}
