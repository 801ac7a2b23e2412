//! Type definitions for the agent runner.

use thiserror::Error;

/// Hard failures of an agent run.
///
/// Everything else (tool failures, model errors, timeouts, cancellation,
/// admission refusal) comes back as an unsuccessful
/// [`AgentResult`](foreman_domain::AgentResult) and goes through review.
#[derive(Error, Debug)]
pub enum AgentRunError {
    #[error("Inference backend unreachable: {0}")]
    BackendUnreachable(String),
}
