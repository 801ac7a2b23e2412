//! Agent types and the permissions attached to them

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Capability an agent needs to use a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Read file contents
    Read,
    /// Glob and grep over the project
    Search,
    /// Run shell commands
    Bash,
    /// Create or modify files
    Write,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Search => "search",
            Permission::Bash => "bash",
            Permission::Write => "write",
        }
    }
}

/// Sub-agent kinds the foreman can dispatch.
///
/// Closed set: every dispatch site matches exhaustively, so adding a kind
/// is a compile-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Read-only codebase navigation and explanation
    Explorer,
    /// File edits and command execution
    Executor,
    /// Decomposes work into a dependency-annotated plan
    Planner,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [AgentType::Explorer, AgentType::Executor, AgentType::Planner];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Explorer => "explorer",
            AgentType::Executor => "executor",
            AgentType::Planner => "planner",
        }
    }

    /// Name of the foreman tool that spawns this agent
    pub fn spawn_tool_name(&self) -> &'static str {
        match self {
            AgentType::Explorer => "spawn_explorer",
            AgentType::Executor => "spawn_executor",
            AgentType::Planner => "spawn_planner",
        }
    }

    /// Inverse of [`spawn_tool_name`](Self::spawn_tool_name)
    pub fn from_spawn_tool(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.spawn_tool_name() == name)
    }

    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            AgentType::Explorer => &[Permission::Read, Permission::Search],
            AgentType::Executor => &[
                Permission::Read,
                Permission::Search,
                Permission::Bash,
                Permission::Write,
            ],
            AgentType::Planner => &[Permission::Read, Permission::Search],
        }
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }

    /// Agent type that takes over when this one has used up its retries.
    pub fn handoff_target(&self) -> AgentType {
        match self {
            AgentType::Explorer => AgentType::Executor,
            AgentType::Executor => AgentType::Explorer,
            AgentType::Planner => AgentType::Executor,
        }
    }

    /// Whether dispatches of this type may use a lite model.
    pub fn supports_lite_tier(&self) -> bool {
        match self {
            AgentType::Explorer | AgentType::Executor => true,
            AgentType::Planner => false,
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explorer" | "explore" => Ok(AgentType::Explorer),
            "executor" | "execute" => Ok(AgentType::Executor),
            "planner" | "plan" => Ok(AgentType::Planner),
            other => Err(DomainError::UnknownAgentType(other.to_string())),
        }
    }
}
