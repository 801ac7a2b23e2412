//! Role-based model configuration (`[models]` section)

use foreman_application::ModelRoster;
use foreman_domain::Model;
use serde::{Deserialize, Serialize};

/// Any role left out keeps its default model.
///
/// ```toml
/// [models]
/// orchestration = "qwen2.5-coder:14b"
/// exploration_lite = "llama3.2:3b"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    pub orchestration: Option<String>,
    pub planning: Option<String>,
    pub exploration: Option<String>,
    pub execution: Option<String>,
    pub exploration_lite: Option<String>,
    pub execution_lite: Option<String>,
}

impl FileModelsConfig {
    pub(super) fn fields(&self) -> [(&'static str, Option<&String>); 6] {
        [
            ("orchestration", self.orchestration.as_ref()),
            ("planning", self.planning.as_ref()),
            ("exploration", self.exploration.as_ref()),
            ("execution", self.execution.as_ref()),
            ("exploration_lite", self.exploration_lite.as_ref()),
            ("execution_lite", self.execution_lite.as_ref()),
        ]
    }

    pub fn to_roster(&self) -> ModelRoster {
        let defaults = ModelRoster::default();
        let pick = |value: &Option<String>, default: Model| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Model::new)
                .unwrap_or(default)
        };
        ModelRoster {
            orchestration: pick(&self.orchestration, defaults.orchestration),
            planning: pick(&self.planning, defaults.planning),
            exploration: pick(&self.exploration, defaults.exploration),
            execution: pick(&self.execution, defaults.execution),
            exploration_lite: pick(&self.exploration_lite, defaults.exploration_lite),
            execution_lite: pick(&self.execution_lite, defaults.execution_lite),
        }
    }
}
