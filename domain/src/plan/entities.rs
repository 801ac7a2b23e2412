//! Plan entities, validation, and parallel grouping

use crate::agent::agent_type::AgentType;
use crate::orchestration::complexity::Complexity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Why a plan was rejected before dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("No plan found in planner output")]
    NotFound,

    #[error("Plan has no steps")]
    Empty,

    #[error("Step {index} is invalid: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("Duplicate step number {0}")]
    DuplicateStep(u32),

    #[error("Plan cycle detected: step {step} depends on step {dependency}")]
    CycleDetected { step: u32, dependency: u32 },

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: u32, dependency: u32 },
}

impl PlanError {
    /// Forward, self, and cyclic references all count as cycles
    pub fn is_cycle(&self) -> bool {
        matches!(self, PlanError::CycleDetected { .. })
    }
}

/// One unit of planned work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub step_num: u32,
    pub agent_type: AgentType,
    pub description: String,
    #[serde(default)]
    pub depends_on: BTreeSet<u32>,
}

impl PlanStep {
    pub fn new(step_num: u32, agent_type: AgentType, description: impl Into<String>) -> Self {
        Self {
            step_num,
            agent_type,
            description: description.into(),
            depends_on: BTreeSet::new(),
        }
    }

    pub fn depends_on(mut self, step_num: u32) -> Self {
        self.depends_on.insert(step_num);
        self
    }
}

/// A validated plan.
///
/// Only constructible through [`Plan::new`], which rejects any step that
/// references itself, a later step, or a missing step, so every `Plan`
/// value is acyclic and its groups are dispatch-safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub analysis: String,
    steps: Vec<PlanStep>,
    parallel_groups: Vec<Vec<u32>>,
    pub complexity: Complexity,
}

impl Plan {
    pub fn new(
        analysis: impl Into<String>,
        mut steps: Vec<PlanStep>,
        complexity: Complexity,
    ) -> Result<Self, PlanError> {
        validate_steps(&steps)?;
        steps.sort_by_key(|s| s.step_num);
        let parallel_groups = compute_parallel_groups(&steps)?;
        Ok(Self {
            analysis: analysis.into(),
            steps,
            parallel_groups,
            complexity,
        })
    }

    /// Steps ordered by step number
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn parallel_groups(&self) -> &[Vec<u32>] {
        &self.parallel_groups
    }

    pub fn step(&self, step_num: u32) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.step_num == step_num)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that (directly or transitively) depend on `step_num`
    pub fn dependents_of(&self, step_num: u32) -> BTreeSet<u32> {
        let mut found = BTreeSet::new();
        // Steps are sorted and dependencies always point backwards, so one
        // forward pass reaches the transitive closure.
        for step in &self.steps {
            if step.depends_on.contains(&step_num)
                || step.depends_on.iter().any(|d| found.contains(d))
            {
                found.insert(step.step_num);
            }
        }
        found
    }
}

fn validate_steps(steps: &[PlanStep]) -> Result<(), PlanError> {
    if steps.is_empty() {
        return Err(PlanError::Empty);
    }

    let mut seen = HashSet::new();
    for (index, step) in steps.iter().enumerate() {
        if step.step_num == 0 {
            return Err(PlanError::InvalidStep {
                index,
                reason: "step numbers start at 1".to_string(),
            });
        }
        if step.description.trim().is_empty() {
            return Err(PlanError::InvalidStep {
                index,
                reason: "empty description".to_string(),
            });
        }
        if !seen.insert(step.step_num) {
            return Err(PlanError::DuplicateStep(step.step_num));
        }
    }

    for step in steps {
        for &dependency in &step.depends_on {
            if dependency >= step.step_num {
                return Err(PlanError::CycleDetected {
                    step: step.step_num,
                    dependency,
                });
            }
            if !seen.contains(&dependency) {
                return Err(PlanError::UnknownDependency {
                    step: step.step_num,
                    dependency,
                });
            }
        }
    }

    Ok(())
}

/// Layered topological ordering.
///
/// Group k holds every unplaced step whose dependencies all sit in groups
/// 0..k-1. A round that places nothing means the remaining steps form a
/// cycle.
pub fn compute_parallel_groups(steps: &[PlanStep]) -> Result<Vec<Vec<u32>>, PlanError> {
    let mut placed: HashSet<u32> = HashSet::new();
    let mut remaining: Vec<&PlanStep> = steps.iter().collect();
    remaining.sort_by_key(|s| s.step_num);
    let mut groups = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&PlanStep>, Vec<&PlanStep>) = remaining
            .into_iter()
            .partition(|s| s.depends_on.iter().all(|d| placed.contains(d)));

        if ready.is_empty() {
            let stuck = blocked[0];
            let dependency = stuck
                .depends_on
                .iter()
                .copied()
                .find(|d| !placed.contains(d))
                .unwrap_or(stuck.step_num);
            return Err(PlanError::CycleDetected {
                step: stuck.step_num,
                dependency,
            });
        }

        let group: Vec<u32> = ready.iter().map(|s| s.step_num).collect();
        placed.extend(group.iter().copied());
        groups.push(group);
        remaining = blocked;
    }

    Ok(groups)
}

/// Per-step bookkeeping while a plan is being executed
#[derive(Debug, Clone, Default)]
pub struct StepOutcomes {
    succeeded: HashMap<u32, bool>,
}

impl StepOutcomes {
    pub fn record(&mut self, step_num: u32, success: bool) {
        self.succeeded.insert(step_num, success);
    }

    pub fn succeeded(&self, step_num: u32) -> bool {
        self.succeeded.get(&step_num).copied().unwrap_or(false)
    }

    /// First dependency of `step` that has not succeeded
    pub fn blocking_dependency(&self, step: &PlanStep) -> Option<u32> {
        step.depends_on.iter().copied().find(|d| !self.succeeded(*d))
    }

    pub fn forget(&mut self, step_num: u32) {
        self.succeeded.remove(&step_num);
    }
}
