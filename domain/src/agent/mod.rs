//! Agent domain module
//!
//! Sub-agent kinds, their tool permissions, and the task/result pair that
//! crosses the Agent Runner boundary.

pub mod agent_type;
pub mod entities;
