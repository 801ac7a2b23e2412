//! Orchestration domain module
//!
//! Pure rules behind the foreman: complexity classification, heuristic
//! routing, the supervision state machine, review decisions, and the shape
//! of the final outcome. Nothing here performs I/O.

pub mod complexity;
pub mod outcome;
pub mod review;
pub mod routing;
pub mod spawn;
pub mod state;
