//! Request complexity classification
//!
//! Pattern-based and deterministic: the same text always classifies the same
//! way, with no inference involved.

use crate::core::error::DomainError;
use crate::core::model::ModelTier;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Complexity of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }

    /// Tier used for explorer/executor dispatches at this complexity
    pub fn tier(&self) -> ModelTier {
        match self {
            Complexity::Simple => ModelTier::Lite,
            Complexity::Moderate | Complexity::Complex => ModelTier::Full,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" | "low" => Ok(Complexity::Simple),
            "moderate" | "medium" => Ok(Complexity::Moderate),
            "complex" | "high" => Ok(Complexity::Complex),
            other => Err(DomainError::UnknownComplexity(other.to_string())),
        }
    }
}

const SIMPLE_CUES: &[&str] = &[
    "explain",
    "describe",
    "find ",
    "read ",
    "show ",
    "display ",
    "print ",
    "cat ",
    "find file",
    "list files",
    "what is",
    "what does",
    "where is",
    "add comment",
    "fix typo",
    "rename variable",
    "simple",
    "quick",
    "just ",
];

const COMPLEX_CUES: &[&str] = &[
    "refactor",
    "restructure",
    "redesign",
    "architect",
    "implement feature",
    "add feature",
    "create system",
    "multiple files",
    "across the codebase",
    "all files",
    "migrate",
    "upgrade",
    "overhaul",
];

static MULTI_STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(\d+|two|three|four|five|six|several|multiple|many|all)\s+(call[\s-]?sites?|files|places|modules|locations|usages|callers|components|endpoints|steps)\b|\band then\b|\bafter that\b",
    )
    .expect("multi-step pattern is valid")
});

/// Result of classifying one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub complexity: Complexity,
    /// Both simple and complex cues matched; resolved to `Moderate`
    pub ambiguous: bool,
    /// The request names several files, sites, or sequential steps
    pub multi_step: bool,
}

impl Classification {
    /// Planning is warranted for complex or clearly multi-step requests
    pub fn needs_planning(&self) -> bool {
        self.complexity == Complexity::Complex || self.multi_step
    }

    pub fn tier(&self) -> ModelTier {
        self.complexity.tier()
    }
}

/// Classify a request by ordered lexical cues.
///
/// A tie (simple and complex cues both present) and no match at all both
/// resolve to `Moderate`; only the tie is flagged ambiguous.
pub fn classify(text: &str) -> Classification {
    let lower = text.to_lowercase();
    let simple = SIMPLE_CUES.iter().any(|cue| lower.contains(cue));
    let complex = COMPLEX_CUES.iter().any(|cue| lower.contains(cue));

    let (complexity, ambiguous) = match (simple, complex) {
        (true, false) => (Complexity::Simple, false),
        (false, true) => (Complexity::Complex, false),
        (true, true) => (Complexity::Moderate, true),
        (false, false) => (Complexity::Moderate, false),
    };

    Classification {
        complexity,
        ambiguous,
        multi_step: MULTI_STEP.is_match(&lower),
    }
}
