//! Core domain concepts shared across the engine

pub mod error;
pub mod model;
