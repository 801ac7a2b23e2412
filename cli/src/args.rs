//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for foreman
#[derive(Parser, Debug)]
#[command(name = "foreman")]
#[command(author, version, about = "Local coding assistant backed by an Ollama server")]
#[command(long_about = r#"
foreman reads your request, decides how much work it needs, and supervises
explorer, executor, and planner agents until the work is reviewed as done
or the round budget runs out.

Configuration is merged from (later wins):
1. built-in defaults
2. ~/.config/foreman/config.toml
3. ./foreman.toml or ./.foreman.toml
4. --config <path>
5. FOREMAN_* environment variables (FOREMAN_ENGINE__MAX_ROUNDS=5)

Examples:
  foreman "where is the retry policy configured?"
  foreman --project-dir ../service "add a created_at field to Order"
  foreman                  # interactive: /status, /reset, /quit
"#)]
pub struct Cli {
    /// Request to run; starts an interactive session when omitted
    pub prompt: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Dispatch/review rounds before returning a partial result
    #[arg(long, value_name = "N")]
    pub max_rounds: Option<u32>,

    /// Directory the tools operate in
    #[arg(short = 'C', long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Print the outcome as JSON and suppress progress output
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_one_shot_flags() {
        let cli = Cli::parse_from([
            "foreman",
            "-vv",
            "--max-rounds",
            "5",
            "-C",
            "/tmp/project",
            "--json",
            "explain main",
        ]);
        assert_eq!(cli.prompt.as_deref(), Some("explain main"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.max_rounds, Some(5));
        assert_eq!(cli.project_dir, Some(PathBuf::from("/tmp/project")));
        assert!(cli.json);
    }

    #[test]
    fn test_no_prompt_means_interactive() {
        let cli = Cli::parse_from(["foreman", "--config", "dev.toml"]);
        assert!(cli.prompt.is_none());
        assert_eq!(cli.config, Some(PathBuf::from("dev.toml")));
    }
}
