//! Model value objects: model names and capability tiers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a model served by the inference backend (Value Object)
///
/// The backend decides which names are valid; the domain only needs a
/// stable, comparable identifier for residency tracking and routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Model(String);

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Model {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Model {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Model tier selected per agent dispatch.
///
/// `Lite` models are small and cheap to keep resident; `Full` models are
/// used for anything beyond single-file, single-step work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Lite,
    Full,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Lite => "lite",
            ModelTier::Full => "full",
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
