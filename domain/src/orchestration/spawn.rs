//! Foreman delegation tools and their extraction from replies

use crate::agent::agent_type::AgentType;
use crate::tool::entities::{ToolCall, ToolDefinition, ToolParameter};
use crate::tool::parsing::parse_text_tool_calls;

/// A delegation the foreman asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUp {
    pub agent_type: AgentType,
    pub task: String,
}

/// `spawn_explorer` / `spawn_executor` / `spawn_planner`
pub fn spawn_tool_definitions() -> Vec<ToolDefinition> {
    AgentType::ALL
        .into_iter()
        .map(|agent| {
            let description = match agent {
                AgentType::Explorer => {
                    "Delegate to the explorer agent for reading files, searching code, or understanding the codebase."
                }
                AgentType::Executor => {
                    "Delegate to the executor agent for creating files, editing code, or running commands."
                }
                AgentType::Planner => {
                    "Delegate to the planner agent to break a complex, multi-step task into steps."
                }
            };
            ToolDefinition::unrestricted(agent.spawn_tool_name(), description).with_parameter(
                ToolParameter::new("task", "Detailed task for the agent", true),
            )
        })
        .collect()
}

fn follow_up_from_call(call: &ToolCall, default_task: &str) -> Option<FollowUp> {
    let agent_type = AgentType::from_spawn_tool(&call.tool_name)?;
    let task = call
        .get_string("task")
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(default_task)
        .to_string();
    Some(FollowUp { agent_type, task })
}

/// Find the delegation in a foreman reply.
///
/// Structured tool calls win; then JSON objects embedded in the text; then a
/// bare mention of a spawn tool name, checked planner first.
pub fn extract_follow_up(
    tool_calls: &[ToolCall],
    text: &str,
    default_task: &str,
) -> Option<FollowUp> {
    if let Some(follow_up) = tool_calls
        .iter()
        .find_map(|c| follow_up_from_call(c, default_task))
    {
        return Some(follow_up);
    }

    let embedded = parse_text_tool_calls(text, |name| AgentType::from_spawn_tool(name).is_some());
    if let Some(follow_up) = embedded
        .iter()
        .find_map(|c| follow_up_from_call(c, default_task))
    {
        return Some(follow_up);
    }

    let lower = text.to_lowercase();
    [AgentType::Planner, AgentType::Explorer, AgentType::Executor]
        .into_iter()
        .find(|agent| lower.contains(agent.spawn_tool_name()))
        .map(|agent_type| FollowUp {
            agent_type,
            task: default_task.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions_cover_every_agent() {
        let defs = spawn_tool_definitions();
        assert_eq!(defs.len(), 3);
        assert!(defs.iter().all(|d| d.permission.is_none()));
        assert!(defs.iter().any(|d| d.name == "spawn_planner"));
    }

    #[test]
    fn test_structured_call_wins() {
        let calls = vec![ToolCall::new("spawn_executor").with_arg("task", "fix build")];
        let text = r#"{"name": "spawn_explorer", "arguments": {"task": "look"}}"#;
        let follow_up = extract_follow_up(&calls, text, "req").unwrap();
        assert_eq!(follow_up.agent_type, AgentType::Executor);
        assert_eq!(follow_up.task, "fix build");
    }

    #[test]
    fn test_embedded_json() {
        let text = r#"I need more info. {"name": "spawn_explorer", "arguments": {"task": "find tests"}}"#;
        let follow_up = extract_follow_up(&[], text, "req").unwrap();
        assert_eq!(follow_up.agent_type, AgentType::Explorer);
        assert_eq!(follow_up.task, "find tests");
    }

    #[test]
    fn test_keyword_fallback_uses_default_task() {
        let follow_up = extract_follow_up(&[], "I will call spawn_planner now", "the request").unwrap();
        assert_eq!(follow_up.agent_type, AgentType::Planner);
        assert_eq!(follow_up.task, "the request");
    }

    #[test]
    fn test_empty_task_falls_back() {
        let calls = vec![ToolCall::new("spawn_explorer").with_arg("task", "  ")];
        assert_eq!(extract_follow_up(&calls, "", "req").unwrap().task, "req");
    }

    #[test]
    fn test_plain_answer_has_no_follow_up() {
        assert!(extract_follow_up(&[], "All three call sites are updated.", "req").is_none());
        let unrelated = vec![ToolCall::new("read_file")];
        assert!(extract_follow_up(&unrelated, "done", "req").is_none());
    }
}
