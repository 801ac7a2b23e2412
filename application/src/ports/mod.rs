//! Port definitions for the application layer
//!
//! Ports are interfaces that define how the application layer interacts
//! with external systems. Adapters in the infrastructure layer implement
//! these ports.

pub mod context_retriever;
pub mod llm_gateway;
pub mod model_capabilities;
pub mod progress;
pub mod run_logger;
pub mod tool_executor;
