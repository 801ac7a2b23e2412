//! Shared utilities for use cases.
//!
//! Contains cancellation checking and the single leased inference call used
//! by the foreman (routing, review) and the planner.

use crate::context::EngineContext;
use crate::ports::llm_gateway::{GatewayError, StreamReply};
use crate::regulator::RegulatorError;
use foreman_domain::Model;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Why a leased inference call produced no reply
#[derive(Debug)]
pub(crate) enum ConverseError {
    Cancelled,
    Admission(RegulatorError),
    Gateway(GatewayError),
}

/// Check if cancellation has been requested.
pub(crate) fn check_cancelled(token: &CancellationToken) -> Result<(), ConverseError> {
    if token.is_cancelled() {
        return Err(ConverseError::Cancelled);
    }
    Ok(())
}

/// One inference call under one lease.
///
/// The lease covers session creation and the whole streamed reply, and is
/// released on every exit path. Backend failures and timeouts start the
/// model's cooldown.
pub(crate) async fn converse(
    ctx: &EngineContext,
    model: &Model,
    system_prompt: &str,
    prompt: &str,
    tools: &[Value],
    cancellation_token: &CancellationToken,
) -> Result<StreamReply, ConverseError> {
    check_cancelled(cancellation_token)?;

    let lease = tokio::select! {
        biased;
        _ = cancellation_token.cancelled() => return Err(ConverseError::Cancelled),
        lease = ctx.regulator.acquire(model) => lease.map_err(ConverseError::Admission)?,
    };

    let call = async {
        let session = ctx.gateway.create_session(model, system_prompt).await?;
        let handle = session.send_streaming(prompt, tools).await?;
        handle
            .collect_with(|chunk| ctx.progress.on_llm_chunk(chunk))
            .await
    };

    let result = tokio::select! {
        biased;
        _ = cancellation_token.cancelled() => return Err(ConverseError::Cancelled),
        result = tokio::time::timeout(ctx.params.agent_timeout, call) => result,
    };

    match result {
        Ok(Ok(reply)) => Ok(reply),
        Ok(Err(e)) => {
            lease.mark_backend_error();
            Err(ConverseError::Gateway(e))
        }
        Err(_) => {
            lease.mark_backend_error();
            Err(ConverseError::Gateway(GatewayError::Timeout))
        }
    }
}
