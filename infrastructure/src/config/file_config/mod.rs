//! Raw TOML configuration data types
//!
//! These structs mirror the config file exactly. Every section defaults, so
//! a partial (or empty) file is valid; `validate()` then rejects values the
//! engine cannot run with.

mod backend;
mod engine;
mod logging;
mod models;
mod regulator;
mod tools;

pub use backend::FileBackendConfig;
pub use engine::FileEngineConfig;
pub use logging::FileLoggingConfig;
pub use models::FileModelsConfig;
pub use regulator::FileRegulatorConfig;
pub use tools::{FileToolServerConfig, FileToolsConfig, FileTransportKind};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },

    #[error("{field} cannot be 0")]
    ZeroTimeout { field: String },

    #[error("models.{field}: model name cannot be empty")]
    EmptyModelName { field: &'static str },

    #[error("backend.url cannot be empty")]
    EmptyBackendUrl,

    #[error("tools.servers[{index}]: name cannot be empty")]
    UnnamedServer { index: usize },

    #[error("tools.servers: duplicate server name '{0}'")]
    DuplicateServer(String),

    #[error("tool server '{0}': pipe transport needs a command")]
    MissingCommand(String),

    #[error("tool server '{0}': http transport needs a url")]
    MissingUrl(String),
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub backend: FileBackendConfig,
    pub models: FileModelsConfig,
    pub regulator: FileRegulatorConfig,
    pub engine: FileEngineConfig,
    pub tools: FileToolsConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Every problem found, in section order. Empty means valid.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.backend.url.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyBackendUrl);
        }

        for (field, value) in self.models.fields() {
            if value.is_some_and(|v| v.trim().is_empty()) {
                issues.push(ConfigValidationError::EmptyModelName { field });
            }
        }

        let regulator = &self.regulator;
        let limits = [
            ("regulator.max_concurrent_requests", regulator.max_concurrent_requests),
            ("regulator.max_models_loaded", regulator.max_models_loaded),
            ("regulator.request_queue_size", regulator.request_queue_size),
            ("engine.max_agent_iterations", self.engine.max_agent_iterations),
        ];
        for (field, value) in limits {
            if value == 0 {
                issues.push(ConfigValidationError::ZeroLimit { field });
            }
        }
        if self.engine.max_rounds == 0 {
            issues.push(ConfigValidationError::ZeroLimit {
                field: "engine.max_rounds",
            });
        }
        if regulator.memory_budget_mb == Some(0) {
            issues.push(ConfigValidationError::ZeroLimit {
                field: "regulator.memory_budget_mb",
            });
        }
        if self.engine.agent_timeout_secs == 0 {
            issues.push(ConfigValidationError::ZeroTimeout {
                field: "engine.agent_timeout_secs".to_string(),
            });
        }

        let mut names = HashSet::new();
        for (index, server) in self.tools.servers.iter().enumerate() {
            let name = server.name.trim();
            if name.is_empty() {
                issues.push(ConfigValidationError::UnnamedServer { index });
            } else if !names.insert(name) {
                issues.push(ConfigValidationError::DuplicateServer(name.to_string()));
            }

            match server.transport {
                FileTransportKind::Pipe if server.command.trim().is_empty() => {
                    issues.push(ConfigValidationError::MissingCommand(name.to_string()));
                }
                FileTransportKind::Http if server.url.trim().is_empty() => {
                    issues.push(ConfigValidationError::MissingUrl(name.to_string()));
                }
                _ => {}
            }

            for (field, secs) in [
                ("call_timeout_secs", server.call_timeout_secs),
                ("startup_timeout_secs", server.startup_timeout_secs),
            ] {
                if secs == 0 {
                    issues.push(ConfigValidationError::ZeroTimeout {
                        field: format!("tool server '{}': {}", name, field),
                    });
                }
            }
        }

        issues
    }
}
