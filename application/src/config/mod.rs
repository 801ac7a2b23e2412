//! Application configuration

mod engine_params;
mod model_roster;

pub use engine_params::EngineParams;
pub use model_roster::ModelRoster;
