//! Formatting of outcomes and status for the terminal

use colored::Colorize;
use foreman_application::RegulatorStatus;
use foreman_domain::{OrchestrationOutcome, OutcomeStatus};
use foreman_infrastructure::SessionState;
use serde_json::json;

pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Final answer plus a one-line footer
    pub fn outcome(outcome: &OrchestrationOutcome) -> String {
        let status = match outcome.status {
            OutcomeStatus::Completed => "done".green(),
            OutcomeStatus::Incomplete => "incomplete".yellow(),
            OutcomeStatus::Cancelled => "cancelled".red(),
        };
        format!(
            "{}\n\n{} {} · {} · {} round(s) · {} agent run(s)",
            outcome.display_text().trim_end(),
            "─".dimmed(),
            status,
            outcome.complexity,
            outcome.rounds,
            outcome.dispatch_count()
        )
    }

    /// Machine-readable outcome for `--json`
    pub fn outcome_json(outcome: &OrchestrationOutcome) -> String {
        serde_json::to_string_pretty(outcome)
            .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
    }

    /// `/status` report
    pub fn status(regulator: &RegulatorStatus, servers: &[(String, SessionState)]) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", "Regulator".cyan().bold()));
        out.push_str(&format!(
            "  requests: {} in flight / {} max, {} queued / {} max\n",
            regulator.in_flight,
            regulator.max_concurrent_requests,
            regulator.queued,
            regulator.request_queue_size
        ));
        out.push_str(&format!(
            "  models:   {} resident / {} slots, {} eviction(s)\n",
            regulator.resident.len(),
            regulator.max_models_loaded,
            regulator.evictions
        ));
        for resident in &regulator.resident {
            out.push_str(&format!("    - {} ({} lease(s))\n", resident.model, resident.leases));
        }
        out.push_str(&format!(
            "  leases:   {} granted, {} released\n",
            regulator.grants, regulator.releases
        ));

        if !servers.is_empty() {
            out.push_str(&format!("{}\n", "Tool servers".cyan().bold()));
            for (name, state) in servers {
                let state = match state {
                    SessionState::Ready => state.to_string().green(),
                    SessionState::Idle => state.to_string().normal(),
                    SessionState::Dead => state.to_string().red(),
                };
                out.push_str(&format!("  {}: {}\n", name, state));
            }
        }
        out
    }
}
