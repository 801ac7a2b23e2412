//! CLI entrypoint for foreman
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod args;
mod engine;
mod logging;
mod output;
mod progress;
mod repl;

use anyhow::{Context, Result};
use args::Cli;
use clap::Parser;
use engine::Engine;
use foreman_infrastructure::ConfigLoader;
use output::ConsoleFormatter;
use repl::Repl;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("failed to load configuration")?;

    let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
    let _log_guard = logging::init(cli.verbose, log_file.as_deref())?;
    info!("Starting foreman {}", env!("CARGO_PKG_VERSION"));

    // === Dependency Injection ===
    let engine = Engine::build(config, &cli)?;
    engine.check_backend().await?;

    let engine = match cli.prompt.as_deref() {
        Some(prompt) => run_once(engine, prompt, cli.json).await?,
        None => {
            let mut repl = Repl::new(engine, cli.json);
            let result = repl.run().await;
            let engine = repl.into_engine();
            if let Err(e) = result {
                engine.shutdown().await;
                return Err(e);
            }
            engine
        }
    };

    engine.shutdown().await;
    Ok(())
}

async fn run_once(mut engine: Engine, prompt: &str, json: bool) -> Result<Engine> {
    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        }
    });

    let outcome = match engine.orchestrator.handle(prompt, &token).await {
        Ok(outcome) => outcome,
        Err(e) => {
            engine.shutdown().await;
            return Err(e).context("request failed");
        }
    };

    if json {
        println!("{}", ConsoleFormatter::outcome_json(&outcome));
    } else {
        println!("{}", ConsoleFormatter::outcome(&outcome));
    }
    Ok(engine)
}
