//! Dispatching agent runners for one round.

use super::Orchestrator;
use super::supervision::{Supervision, Work};
use super::types::OrchestratorError;
use foreman_domain::AgentResult;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl Orchestrator {
    /// Run the current work and return this round's results.
    pub(super) async fn dispatch_round(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<AgentResult>, OrchestratorError> {
        match sup.work.clone() {
            Work::Single { agent_type, task } => {
                let earlier: Vec<String> = sup
                    .last_results
                    .iter()
                    .map(|r| format!("{}: {}", r.agent_type, r.review_text()))
                    .collect();
                let task = self
                    .ctx
                    .roster
                    .task(task, agent_type, sup.classification.tier())
                    .with_contexts(earlier);

                let result = self.runner.run(task, cancellation_token).await?;
                Ok(vec![result])
            }
            Work::Plan => self.dispatch_plan(sup, cancellation_token).await,
        }
    }

    /// Run the pending plan steps group by group.
    ///
    /// Steps inside a group run concurrently (the regulator bounds how many
    /// actually hold a lease). A group starts only after every step of the
    /// previous group has a result. A step whose dependency did not succeed
    /// is skipped.
    async fn dispatch_plan(
        &self,
        sup: &mut Supervision<'_>,
        cancellation_token: &CancellationToken,
    ) -> Result<Vec<AgentResult>, OrchestratorError> {
        let Some(plan) = sup.plan.clone() else {
            return Ok(Vec::new());
        };
        let tier = sup.classification.tier();
        let mut round_results = Vec::new();

        for (index, group) in plan.parallel_groups().iter().enumerate() {
            if cancellation_token.is_cancelled() {
                break;
            }

            let mut tasks = Vec::new();
            for &step_num in group {
                if !sup.pending.contains(&step_num) {
                    continue;
                }
                let Some(step) = plan.step(step_num) else {
                    continue;
                };

                if let Some(dependency) = sup.outcomes.blocking_dependency(step) {
                    debug!(
                        "Orchestrator: skipping step {} (step {} did not succeed)",
                        step_num, dependency
                    );
                    let skipped =
                        AgentResult::skipped_by_dependency(step.agent_type, step_num, dependency);
                    sup.outcomes.record(step_num, false);
                    sup.step_results.insert(step_num, skipped.clone());
                    round_results.push(skipped);
                    continue;
                }

                let context: Vec<String> = step
                    .depends_on
                    .iter()
                    .filter_map(|d| {
                        sup.step_results.get(d).map(|r| {
                            format!("Step {} ({}): {}", d, r.agent_type, r.review_text())
                        })
                    })
                    .collect();
                tasks.push(
                    self.ctx
                        .roster
                        .task(step.description.clone(), step.agent_type, tier)
                        .with_contexts(context)
                        .with_step(step_num),
                );
            }

            if tasks.is_empty() {
                continue;
            }
            info!(
                "Orchestrator: group {} dispatching {} step(s)",
                index + 1,
                tasks.len()
            );

            let runs = tasks
                .into_iter()
                .map(|task| self.runner.run(task, cancellation_token));
            for result in join_all(runs).await {
                let result = result?;
                if let Some(step_num) = result.step_num {
                    sup.outcomes.record(step_num, result.success);
                    sup.step_results.insert(step_num, result.clone());
                }
                round_results.push(result);
            }
        }

        sup.pending.clear();
        Ok(round_results)
    }
}
