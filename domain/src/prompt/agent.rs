//! Prompt templates for the foreman and its sub-agents

use crate::agent::agent_type::AgentType;
use crate::agent::entities::{AgentResult, AgentTask};
use crate::tool::entities::ToolDefinition;

/// Templates for generating agent prompts
pub struct AgentPromptTemplate;

impl AgentPromptTemplate {
    /// System prompt for the foreman (knowledge base + supervisor)
    pub fn foreman_system(project_dir: &str) -> String {
        format!(
            r#"You are foreman, a coding assistant that runs on local models.

You have two roles:

## Role 1: Knowledge Base
For general questions, greetings, or explaining concepts, respond directly without spawning agents.

## Role 2: Foreman
For any code or file operation, delegate to a specialized agent and supervise its work.

Available agents:
- spawn_explorer: reading, searching, or understanding code
- spawn_executor: writing, editing, or running code
- spawn_planner: complex tasks that need a structured plan first

Rules:
- Never read, write, or search files yourself; always delegate
- Questions about code -> spawn_explorer
- Requests to change, create, or run code -> spawn_executor
- Multi-file or multi-step work -> spawn_planner
- Greetings and general questions -> answer directly

Project directory: {project_dir}
"#
        )
    }

    /// Instructions appended when the foreman model has no native tool calling
    pub fn spawn_instructions(spawn_tools: &[ToolDefinition]) -> String {
        let usage = spawn_tools
            .iter()
            .map(|t| t.text_usage())
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "To delegate, reply with exactly one JSON object on its own line:\n{}\n",
            usage
        )
    }

    /// Prompt asking the foreman to route or answer a request
    pub fn foreman_request(request: &str, history: &str) -> String {
        if history.is_empty() {
            request.to_string()
        } else {
            format!(
                "Conversation so far:\n{}\n\nNew request: {}",
                history, request
            )
        }
    }

    /// System prompt for a sub-agent
    pub fn agent_system(
        agent_type: AgentType,
        tools: &[&ToolDefinition],
        native_tools: bool,
        project_dir: &str,
    ) -> String {
        let role = match agent_type {
            AgentType::Explorer => {
                "You are an explorer agent responsible for navigating and understanding codebases.\n\
                 You can read files and search code. You cannot modify files or run commands.\n\
                 Provide clear, concise summaries of what you find."
            }
            AgentType::Executor => {
                "You are an executor agent responsible for changing code and running commands.\n\
                 Make the smallest change that accomplishes the task, then verify it.\n\
                 Report exactly what you changed."
            }
            AgentType::Planner => {
                "You are a planner agent. You read enough of the codebase to break a task into\n\
                 concrete steps for explorer and executor agents."
            }
        };

        let tool_section = if tools.is_empty() {
            String::new()
        } else if native_tools {
            format!(
                "\n\nTools available: {}.",
                tools
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        } else {
            format!(
                "\n\n## Tools\nTo call a tool, reply with one JSON object per call:\n{}\n\
                 When you are done, reply with your final answer and no tool calls.",
                tools
                    .iter()
                    .map(|t| t.text_usage())
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        };

        format!(
            "{}\n\nProject directory: {}{}",
            role, project_dir, tool_section
        )
    }

    /// First user message of an agent run
    pub fn agent_task(task: &AgentTask, snippets: &[String]) -> String {
        let mut prompt = String::new();

        if !snippets.is_empty() {
            prompt.push_str("## Reference material\n");
            for snippet in snippets {
                prompt.push_str(snippet);
                prompt.push_str("\n---\n");
            }
            prompt.push('\n');
        }

        if !task.context.is_empty() {
            prompt.push_str("## Results from earlier steps\n");
            for context in &task.context {
                prompt.push_str(context);
                prompt.push_str("\n\n");
            }
        }

        prompt.push_str("## Task\n");
        prompt.push_str(&task.task);
        prompt
    }

    /// Message feeding tool outputs back to the agent
    pub fn tool_results(results: &[String]) -> String {
        format!(
            "Tool results:\n\n{}\n\nContinue with the task. Reply without tool calls when you are done.",
            results.join("\n\n")
        )
    }

    /// Prompt for the planner agent
    pub fn planner(request: &str, context_hints: &[String]) -> String {
        let hints = if context_hints.is_empty() {
            String::new()
        } else {
            format!("\n## Context\n{}\n", context_hints.join("\n"))
        };

        format!(
            r#"Break the following request into steps for explorer and executor agents.
{hints}
## Request
{request}

Reply with a single JSON object:

```json
{{
  "analysis": "what must change and why",
  "complexity": "simple | moderate | complex",
  "steps": [
    {{"step_num": 1, "agent_type": "explorer", "description": "...", "depends_on": []}},
    {{"step_num": 2, "agent_type": "executor", "description": "...", "depends_on": [1]}}
  ]
}}
```

Rules:
- Number steps from 1 in order
- depends_on may only list earlier step numbers
- Steps without a dependency between them will run in parallel
- agent_type is "explorer" for read-only work and "executor" for changes or commands
"#
        )
    }

    /// Prompt asking the foreman to review agent output
    pub fn review(request: &str, results: &[AgentResult]) -> String {
        let outputs = results
            .iter()
            .map(|r| {
                let label = match r.step_num {
                    Some(n) => format!("{} (step {})", r.agent_type, n),
                    None => r.agent_type.to_string(),
                };
                format!("### {}\n{}", label, r.review_text())
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"You are reviewing work done by specialized agents.

Original user request: {request}

Agent output:
---
{outputs}
---

As the foreman, evaluate this work:
1. Did the agents complete the task successfully?
2. Are there errors or issues that need fixing?
3. Is follow-up work needed?

Respond with one of:
- If the work is complete and good: summarize the results for the user
- If the work has issues: call spawn_executor or spawn_explorer to fix the problem
- If the approach itself is wrong: call spawn_planner to plan again
"#
        )
    }
}
