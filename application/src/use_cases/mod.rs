//! Use cases
//!
//! Application-level operations that drive the domain rules through the
//! ports.

pub mod orchestrate;
pub mod plan_request;
pub mod run_agent;
pub(crate) mod shared;

#[cfg(test)]
pub(crate) mod test_support;
