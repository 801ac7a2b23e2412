//! Type definitions for the orchestrator.

use crate::ports::llm_gateway::GatewayError;
use crate::use_cases::run_agent::AgentRunError;
use thiserror::Error;

/// Hard failures of a request.
///
/// Everything recoverable ends up inside the
/// [`OrchestrationOutcome`](foreman_domain::OrchestrationOutcome) instead.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Inference backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Backend check failed: {0}")]
    Backend(GatewayError),

    #[error("Request is empty")]
    EmptyRequest,
}

impl From<AgentRunError> for OrchestratorError {
    fn from(e: AgentRunError) -> Self {
        match e {
            AgentRunError::BackendUnreachable(message) => {
                OrchestratorError::BackendUnreachable(message)
            }
        }
    }
}

impl OrchestratorError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, OrchestratorError::BackendUnreachable(_))
    }
}
