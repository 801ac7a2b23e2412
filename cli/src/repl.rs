//! Line-oriented interactive session

use crate::engine::Engine;
use crate::output::ConsoleFormatter;
use anyhow::Result;
use colored::Colorize;
use foreman_application::OrchestratorError;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// What a slash command asks the loop to do
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Reset,
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let cmd = line.strip_prefix('/')?.split_whitespace().next().unwrap_or("");
        Some(match cmd {
            "reset" | "clear" => Command::Reset,
            "status" => Command::Status,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        })
    }
}

const HELP: &str = "\
Commands:
  /status   regulator and tool server state
  /reset    forget the conversation so far
  /quit     exit (also Ctrl-D, or Ctrl-C at the prompt)

Ctrl-C while a request runs cancels it.";

pub struct Repl {
    engine: Engine,
    json: bool,
}

impl Repl {
    pub fn new(engine: Engine, json: bool) -> Self {
        Self { engine, json }
    }

    pub fn into_engine(self) -> Engine {
        self.engine
    }

    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print!("{} ", "foreman>".green().bold());
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    break;
                }
            };
            let Some(line) = line else {
                println!();
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(command) = Command::parse(line) {
                if self.handle_command(command) {
                    break;
                }
                continue;
            }

            self.process(line).await?;
        }
        Ok(())
    }

    fn print_welcome(&self) {
        let params = &self.engine.orchestrator.context().params;
        println!();
        println!("{}", "foreman: interactive session".bold());
        println!("project: {}", params.project_dir);
        println!("Type a request, or /help for commands.");
        println!();
    }

    /// Returns true when the loop should exit.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Quit => return true,
            Command::Reset => {
                self.engine.orchestrator.reset_conversation();
                println!("Conversation cleared.");
            }
            Command::Status => {
                let status = self.engine.orchestrator.status();
                print!("{}", ConsoleFormatter::status(&status, &self.engine.server_states()));
            }
            Command::Help => println!("{}", HELP),
            Command::Unknown(name) => {
                println!("Unknown command: /{}", name);
                println!("Type /help for available commands");
            }
        }
        false
    }

    async fn process(&mut self, request: &str) -> Result<()> {
        let token = CancellationToken::new();
        let watcher = tokio::spawn({
            let token = token.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    token.cancel();
                }
            }
        });

        let result = self.engine.orchestrator.handle(request, &token).await;
        watcher.abort();

        match result {
            Ok(outcome) if self.json => println!("{}", ConsoleFormatter::outcome_json(&outcome)),
            Ok(outcome) => println!("\n{}\n", ConsoleFormatter::outcome(&outcome)),
            Err(e @ OrchestratorError::BackendUnreachable(_)) => return Err(e.into()),
            Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
        }
        Ok(())
    }
}
