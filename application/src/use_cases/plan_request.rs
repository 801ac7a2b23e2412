//! Planner use case
//!
//! Asks the planning model to decompose a request into dependency-annotated
//! steps, then validates the result and computes its parallel groups.

use crate::context::EngineContext;
use crate::ports::context_retriever::ContextSnippet;
use crate::ports::llm_gateway::GatewayError;
use crate::regulator::RegulatorError;
use crate::use_cases::shared::{ConverseError, converse};
use foreman_domain::{AgentPromptTemplate, AgentType, Classification, Plan, PlanError, parse_plan};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors that can occur while planning
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Plan rejected: {0}")]
    Plan(#[from] PlanError),

    #[error("Planner not admitted: {0}")]
    Admission(RegulatorError),

    #[error("Planner backend error: {0}")]
    Gateway(GatewayError),

    #[error("Planning cancelled")]
    Cancelled,
}

impl PlannerError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PlannerError::Gateway(e) if e.is_unreachable())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlannerError::Cancelled)
    }
}

impl From<ConverseError> for PlannerError {
    fn from(e: ConverseError) -> Self {
        match e {
            ConverseError::Cancelled => PlannerError::Cancelled,
            ConverseError::Admission(e) => PlannerError::Admission(e),
            ConverseError::Gateway(e) => PlannerError::Gateway(e),
        }
    }
}

/// Produces validated plans from the planning model
pub struct Planner {
    ctx: Arc<EngineContext>,
}

impl Planner {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        Self { ctx }
    }

    pub async fn plan(
        &self,
        request: &str,
        classification: &Classification,
        cancellation_token: &CancellationToken,
    ) -> Result<Plan, PlannerError> {
        let ctx = &self.ctx;
        let hints: Vec<String> = ctx
            .retriever
            .retrieve(request, ctx.params.context_snippets)
            .await
            .iter()
            .map(ContextSnippet::to_prompt)
            .collect();

        let system =
            AgentPromptTemplate::agent_system(AgentType::Planner, &[], true, &ctx.params.project_dir);
        let prompt = AgentPromptTemplate::planner(request, &hints);

        let reply = converse(
            ctx,
            &ctx.roster.planning,
            &system,
            &prompt,
            &[],
            cancellation_token,
        )
        .await?;

        match parse_plan(&reply.text, classification.complexity) {
            Ok(plan) => {
                info!(
                    "Planner: {} step(s) in {} group(s)",
                    plan.len(),
                    plan.parallel_groups().len()
                );
                Ok(plan)
            }
            Err(e) => {
                warn!("Planner: rejected plan: {}", e);
                Err(e.into())
            }
        }
    }
}
