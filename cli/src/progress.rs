//! Console progress reporting while a request runs

use colored::Colorize;
use foreman_application::OrchestratorProgress;
use foreman_domain::{
    Advisory, AgentResult, AgentRunStatus, AgentType, Plan, SupervisionState, ToolCall,
    ToolResult, util::truncate_str,
};
use std::io::Write;
use std::sync::Mutex;

/// Longest task description echoed on one line
const TASK_PREVIEW: usize = 100;

/// Prints state changes, agent activity, and streamed text to stderr so that
/// stdout carries only the final answer.
pub struct ConsoleProgress {
    /// True while streamed text has left the cursor mid-line
    mid_line: Mutex<bool>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self {
            mid_line: Mutex::new(false),
        }
    }

    fn line(&self, text: impl std::fmt::Display) {
        let mut stderr = std::io::stderr().lock();
        if let Ok(mut mid) = self.mid_line.lock()
            && *mid
        {
            let _ = writeln!(stderr);
            *mid = false;
        }
        let _ = writeln!(stderr, "{}", text);
    }

    fn agent_label(agent_type: AgentType) -> colored::ColoredString {
        let label = format!("[{}]", agent_type);
        match agent_type {
            AgentType::Explorer => label.cyan(),
            AgentType::Executor => label.yellow(),
            AgentType::Planner => label.magenta(),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestratorProgress for ConsoleProgress {
    fn on_state(&self, state: SupervisionState) {
        match state {
            SupervisionState::Planning | SupervisionState::Reviewing => {
                self.line(format!("{} {}", "•".dimmed(), state.to_string().dimmed()));
            }
            SupervisionState::Retry | SupervisionState::Handoff | SupervisionState::Replan => {
                self.line(format!("{} {}", "↻".yellow(), state));
            }
            SupervisionState::Exhausted => {
                self.line(format!("{} round budget exhausted", "!".red().bold()));
            }
            _ => {}
        }
    }

    fn on_round_start(&self, round: u32, max_rounds: u32) {
        self.line(format!("{}", format!("── round {}/{} ──", round, max_rounds).bold()));
    }

    fn on_plan(&self, plan: &Plan) {
        self.line(format!("{} {} step(s)", "plan:".bold(), plan.len()));
        for step in plan.steps() {
            let deps = if step.depends_on.is_empty() {
                String::new()
            } else {
                let list: Vec<String> = step.depends_on.iter().map(u32::to_string).collect();
                format!(" (after {})", list.join(", "))
            };
            self.line(format!(
                "  {}. {} {}{}",
                step.step_num,
                Self::agent_label(step.agent_type),
                truncate_str(&step.description, TASK_PREVIEW),
                deps.dimmed()
            ));
        }
    }

    fn on_agent_start(&self, agent_type: AgentType, task: &str) {
        self.line(format!(
            "{} {}",
            Self::agent_label(agent_type),
            truncate_str(task, TASK_PREVIEW)
        ));
    }

    fn on_agent_complete(&self, result: &AgentResult) {
        let mark = match result.status {
            AgentRunStatus::Completed => "✓".green(),
            AgentRunStatus::Skipped => "-".dimmed(),
            _ => "✗".red(),
        };
        let detail = match &result.error {
            Some(error) => format!(": {}", error),
            None => String::new(),
        };
        self.line(format!(
            "{} {} {:?} in {}ms{}",
            Self::agent_label(result.agent_type),
            mark,
            result.status,
            result.duration_ms,
            detail
        ));
    }

    fn on_llm_chunk(&self, chunk: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{}", chunk.dimmed());
        let _ = stderr.flush();
        if let Ok(mut mid) = self.mid_line.lock() {
            *mid = !chunk.ends_with('\n');
        }
    }

    fn on_tool_call(&self, agent_type: AgentType, call: &ToolCall) {
        self.line(format!(
            "{}   {} {}",
            Self::agent_label(agent_type),
            "→".blue(),
            truncate_str(&call.describe(), TASK_PREVIEW)
        ));
    }

    fn on_tool_result(&self, agent_type: AgentType, result: &ToolResult) {
        if let Some(error) = result.error() {
            let via = match &result.metadata.server {
                Some(server) => format!(" [{}]", server).dimmed().to_string(),
                None => String::new(),
            };
            self.line(format!(
                "{}   {} {}{}: {}",
                Self::agent_label(agent_type),
                "✗".red(),
                result.tool_name,
                via,
                error.message
            ));
        }
    }

    fn on_advisory(&self, advisory: &Advisory) {
        let text = match advisory {
            Advisory::ClassificationAmbiguous => "request is ambiguous; treating it as moderate".to_string(),
            Advisory::PlanRejected(reason) => format!("plan rejected, running unplanned: {}", reason),
            Advisory::ReviewFallback(reason) => format!("review failed, using agent output: {}", reason),
        };
        self.line(format!("{} {}", "note:".yellow(), text));
    }
}
