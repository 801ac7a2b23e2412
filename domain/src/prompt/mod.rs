//! Prompt templates

pub mod agent;

pub use agent::AgentPromptTemplate;
