//! Composition root: turns the loaded configuration into a running engine.

use crate::args::Cli;
use crate::progress::ConsoleProgress;
use anyhow::{Context, Result};
use foreman_application::{
    EngineContext, ModelCapabilities, NoProgress, Orchestrator, OrchestratorError,
    ResourceRegulator, RunLogger, StaticCapabilities,
};
use foreman_infrastructure::{
    FileConfig, JsonlRunLogger, LocalToolExecutor, OllamaCapabilities, OllamaGateway,
    ProjectDocsRetriever, ProtocolToolExecutor, SessionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the binary drives after startup
pub struct Engine {
    pub orchestrator: Orchestrator,
    pub tools: Arc<ProtocolToolExecutor>,
}

impl Engine {
    pub fn build(mut config: FileConfig, cli: &Cli) -> Result<Self> {
        if let Some(rounds) = cli.max_rounds {
            config.engine.max_rounds = rounds.max(1);
        }
        if let Some(dir) = &cli.project_dir {
            config.engine.project_dir = dir.display().to_string();
        }

        let mut params = config.engine.to_engine_params();
        let project_dir = PathBuf::from(&params.project_dir);
        let project_dir = project_dir
            .canonicalize()
            .with_context(|| format!("project directory {} is not accessible", project_dir.display()))?;
        params.project_dir = project_dir.display().to_string();

        let gateway = Arc::new(
            OllamaGateway::new(config.backend.url.clone())
                .with_context(|| format!("cannot create client for {}", config.backend.url))?,
        );
        let capabilities: Arc<dyn ModelCapabilities> = match config.backend.native_tools {
            Some(true) => Arc::new(StaticCapabilities::native()),
            Some(false) => Arc::new(StaticCapabilities::text_only()),
            None => Arc::new(OllamaCapabilities::new(&gateway)),
        };

        let tools = Arc::new(ProtocolToolExecutor::new(
            LocalToolExecutor::new(&project_dir),
            config.tools.to_server_configs(),
        ));
        let regulator = ResourceRegulator::new(config.regulator.to_regulator_config());

        let mut ctx = EngineContext::new(gateway, tools.clone(), regulator)
            .with_capabilities(capabilities)
            .with_retriever(Arc::new(ProjectDocsRetriever::new(&project_dir)))
            .with_roster(config.models.to_roster())
            .with_params(params);
        ctx = if cli.json {
            ctx.with_progress(Arc::new(NoProgress))
        } else {
            ctx.with_progress(Arc::new(ConsoleProgress::new()))
        };
        if let Some(path) = &config.logging.run_log
            && let Some(logger) = JsonlRunLogger::open(path)
        {
            info!("Run log: {}", logger.path().display());
            let logger: Arc<dyn RunLogger> = Arc::new(logger);
            ctx = ctx.with_run_logger(logger);
        }

        info!(
            "Engine: backend {}, project {}, {} tool server(s)",
            config.backend.url,
            project_dir.display(),
            tools.sessions().len()
        );
        Ok(Self {
            orchestrator: Orchestrator::new(Arc::new(ctx)),
            tools,
        })
    }

    /// Fail fast when the backend is down; warn about roster models it lacks.
    pub async fn check_backend(&self) -> Result<()> {
        let available = match self.orchestrator.check_backend().await {
            Ok(models) => models,
            Err(e @ OrchestratorError::BackendUnreachable(_)) => {
                return Err(e).context("is `ollama serve` running?");
            }
            Err(e) => {
                warn!("Could not list backend models: {}", e);
                return Ok(());
            }
        };

        let served = |name: &str| {
            available
                .iter()
                .any(|m| m.as_str() == name || m.as_str() == format!("{}:latest", name))
        };
        for model in self.orchestrator.context().roster.models() {
            if !served(model.as_str()) {
                warn!(
                    "Model {} is not available on the backend (try `ollama pull {}`)",
                    model, model
                );
            }
        }
        Ok(())
    }

    pub fn server_states(&self) -> Vec<(String, SessionState)> {
        self.tools
            .sessions()
            .iter()
            .map(|s| (s.name().to_string(), s.state()))
            .collect()
    }

    pub async fn shutdown(&self) {
        self.tools.shutdown().await;
    }
}
