//! Plan parsing from planner responses.
//!
//! Accepts a fenced ```json / ```plan block, a bare JSON document, or the
//! first JSON object in the text that carries a `steps` array. The parsed
//! steps go through [`Plan::new`], so anything returned here is validated.

use super::entities::{Plan, PlanError, PlanStep};
use crate::agent::agent_type::AgentType;
use crate::orchestration::complexity::Complexity;
use crate::tool::parsing::extract_json_objects;
use serde_json::Value;
use std::collections::BTreeSet;

/// Parse and validate a plan from planner output.
///
/// `fallback_complexity` is used when the planner omits or garbles the
/// `complexity` field.
pub fn parse_plan(response: &str, fallback_complexity: Complexity) -> Result<Plan, PlanError> {
    let json = find_plan_json(response).ok_or(PlanError::NotFound)?;
    parse_plan_json(&json, fallback_complexity)
}

fn find_plan_json(response: &str) -> Option<Value> {
    let mut in_block = false;
    let mut block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();
        if !in_block && (trimmed == "```json" || trimmed == "```plan") {
            in_block = true;
            block.clear();
        } else if in_block && trimmed == "```" {
            in_block = false;
            if let Ok(parsed) = serde_json::from_str::<Value>(&block)
                && parsed.get("steps").is_some()
            {
                return Some(parsed);
            }
        } else if in_block {
            block.push_str(line);
            block.push('\n');
        }
    }

    if let Ok(parsed) = serde_json::from_str::<Value>(response.trim())
        && parsed.get("steps").is_some()
    {
        return Some(parsed);
    }

    extract_json_objects(response)
        .into_iter()
        .find(|v| v.get("steps").is_some())
}

/// Integers may arrive as numbers or numeric strings
fn as_step_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parse a plan from a JSON value.
///
/// Expected schema:
/// ```json
/// {
///   "analysis": "string",
///   "complexity": "simple | moderate | complex",
///   "steps": [
///     {"step_num": 1, "agent_type": "explorer", "description": "...", "depends_on": []}
///   ]
/// }
/// ```
///
/// `step`/`id` are accepted for `step_num`, `agent` for `agent_type`, and
/// `task` for `description`. A missing step number defaults to the step's
/// 1-based position.
pub fn parse_plan_json(json: &Value, fallback_complexity: Complexity) -> Result<Plan, PlanError> {
    let analysis = json
        .get("analysis")
        .or_else(|| json.get("reasoning"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let complexity = json
        .get("complexity")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback_complexity);

    let raw_steps = json
        .get("steps")
        .and_then(|v| v.as_array())
        .ok_or(PlanError::NotFound)?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw) in raw_steps.iter().enumerate() {
        let step_num = ["step_num", "step", "id"]
            .iter()
            .find_map(|key| raw.get(*key).and_then(as_step_number))
            .unwrap_or(index as u32 + 1);

        let agent_type = raw
            .get("agent_type")
            .or_else(|| raw.get("agent"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| PlanError::InvalidStep {
                index,
                reason: "missing agent_type".to_string(),
            })?
            .parse::<AgentType>()
            .map_err(|e| PlanError::InvalidStep {
                index,
                reason: e.to_string(),
            })?;

        let description = raw
            .get("description")
            .or_else(|| raw.get("task"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let depends_on: BTreeSet<u32> = raw
            .get("depends_on")
            .and_then(|v| v.as_array())
            .map(|deps| deps.iter().filter_map(as_step_number).collect())
            .unwrap_or_default();

        steps.push(PlanStep {
            step_num,
            agent_type,
            description,
            depends_on,
        });
    }

    Plan::new(analysis, steps, complexity)
}
