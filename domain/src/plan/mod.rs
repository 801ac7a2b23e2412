//! Plan domain module
//!
//! A [`Plan`](entities::Plan) is the planner's decomposition of a request
//! into dependency-ordered steps. Construction validates that every
//! dependency points to an earlier step, then computes parallel groups by
//! layered topological ordering: steps inside one group never depend on one
//! another, and group k only depends on groups before it.

pub mod entities;
pub mod parser;
