//! Engine context: every collaborator the use cases need, built once.

use crate::config::{EngineParams, ModelRoster};
use crate::ports::context_retriever::{ContextRetriever, NoContextRetriever};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::model_capabilities::{ModelCapabilities, StaticCapabilities};
use crate::ports::progress::{NoProgress, OrchestratorProgress};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::regulator::ResourceRegulator;
use std::sync::Arc;

/// Shared collaborators for the orchestrator, planner, and agent runner.
///
/// The composition root builds one and hands an `Arc` of it to each use
/// case. Nothing in the engine reaches for a global.
pub struct EngineContext {
    pub gateway: Arc<dyn LlmGateway>,
    pub capabilities: Arc<dyn ModelCapabilities>,
    pub retriever: Arc<dyn ContextRetriever>,
    pub tools: Arc<dyn ToolExecutorPort>,
    pub regulator: ResourceRegulator,
    pub roster: ModelRoster,
    pub params: EngineParams,
    pub progress: Arc<dyn OrchestratorProgress>,
    pub run_logger: Arc<dyn RunLogger>,
}

impl EngineContext {
    /// Context with default roster and params, native tool calling, and
    /// no retrieval, progress, or run logging.
    pub fn new(
        gateway: Arc<dyn LlmGateway>,
        tools: Arc<dyn ToolExecutorPort>,
        regulator: ResourceRegulator,
    ) -> Self {
        Self {
            gateway,
            capabilities: Arc::new(StaticCapabilities::native()),
            retriever: Arc::new(NoContextRetriever),
            tools,
            regulator,
            roster: ModelRoster::default(),
            params: EngineParams::default(),
            progress: Arc::new(NoProgress),
            run_logger: Arc::new(NoRunLogger),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Arc<dyn ModelCapabilities>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn ContextRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn with_roster(mut self, roster: ModelRoster) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn OrchestratorProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_run_logger(mut self, run_logger: Arc<dyn RunLogger>) -> Self {
        self.run_logger = run_logger;
        self
    }

    pub(crate) fn log_event(&self, event_type: &'static str, payload: serde_json::Value) {
        self.run_logger.log(RunEvent::new(event_type, payload));
    }
}
