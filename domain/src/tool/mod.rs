//! Tool domain module
//!
//! A tool is described by a [`ToolDefinition`](entities::ToolDefinition)
//! (name, parameters, required permission), invoked with a
//! [`ToolCall`](entities::ToolCall) and answered with a
//! [`ToolResult`](value_objects::ToolResult).
//!
//! Agents only see tools their [`AgentType`](crate::agent::agent_type::AgentType)
//! is permitted to use. Models without native tool calling emit calls as JSON
//! in text; [`parsing`] recovers them.

pub mod entities;
pub mod parsing;
pub mod value_objects;
