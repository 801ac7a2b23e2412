//! Heuristic request routing
//!
//! Decides, before any inference, whether a request can be answered from a
//! canned reply, needs a plan, or maps directly onto one agent type. Requests
//! that match nothing are left to the foreman model.

use super::complexity::Classification;
use crate::agent::agent_type::AgentType;
use regex::Regex;
use std::sync::LazyLock;

/// Canned replies for conversational requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectReply {
    Greeting,
    Thanks,
    Farewell,
    Identity,
    Help,
}

impl DirectReply {
    pub fn text(&self) -> &'static str {
        match self {
            DirectReply::Greeting => {
                "Hello! I'm foreman, your local coding assistant. How can I help with your project today?"
            }
            DirectReply::Thanks => "You're welcome! Let me know if you need anything else.",
            DirectReply::Farewell => "Goodbye!",
            DirectReply::Identity => {
                "I'm foreman, a coding assistant that runs on local models. I explore, explain, and modify your codebase by delegating to specialized agents."
            }
            DirectReply::Help => {
                "I can help with:\n\
                 - Exploring code: \"find all config loaders\", \"what does main.rs do?\"\n\
                 - Making changes: \"create a new module\", \"fix the bug in the parser\"\n\
                 - Running commands: \"run the tests\"\n\n\
                 Just tell me what you'd like to do."
            }
        }
    }
}

/// Where a classified request goes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Answer without inference
    Direct(DirectReply),
    /// Decompose with the planner first
    Plan,
    /// Single unplanned dispatch
    Dispatch(AgentType),
    /// Let the foreman model choose (or answer itself)
    ForemanDecides,
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|p| Regex::new(p).expect("routing pattern is valid"))
        .collect()
}

static DIRECT: LazyLock<Vec<(Regex, DirectReply)>> = LazyLock::new(|| {
    let table = [
        (
            r"^(hi|hello|hey|greetings|good\s+(morning|afternoon|evening))[\s!.,]*$",
            DirectReply::Greeting,
        ),
        (r"^(thanks|thank\s+you|thx)[\s!.,]*$", DirectReply::Thanks),
        (r"^(bye|goodbye|exit|quit)[\s!.,]*$", DirectReply::Farewell),
        (r"^(who|what)\s+are\s+you\b", DirectReply::Identity),
        (r"^help[\s!.,?]*$", DirectReply::Help),
    ];
    table
        .into_iter()
        .map(|(p, reply)| (Regex::new(p).expect("routing pattern is valid"), reply))
        .collect()
});

static EXECUTOR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"^(create|write|make|add|implement|build)\b",
        r"^(edit|modify|change|update|fix|patch|refactor)\b",
        r"^(run|execute|test|install|compile)\b",
        r"^(delete|remove|rename)\b",
        r"\b(create|write|make)\s+(a\s+)?(new\s+)?(file|script|program|function|class)\b",
        r"\b(fix|patch|update|change|modify|edit)\s+(the|this|my)?\s*(code|bug|error|file)\b",
        r"\brun\s+(the\s+)?(tests?|cargo|pytest)\b",
    ])
});

static EXPLORER: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    patterns(&[
        r"^(find|search|look|locate|where|show)\b",
        r"^(read|display|print|cat|view)\b",
        r"^(what|which|how|why|explain|describe)\b",
        r"^(list|ls)\b",
        r"\b(find|search|look for|locate)\s+(the|a|any)?\s*(file|function|class|variable|code)\b",
        r"\bwhat\s+(is|are|does)\b",
        r"\bhow\s+(does|do|is|are|to)\b",
        r"\bshow\s+me\b",
        r"\bread\s+(the\s+)?(file|code)\b",
    ])
});

const CODE_WORDS: &[&str] = &[
    "file",
    "code",
    "function",
    "class",
    "method",
    "variable",
    "import",
    "module",
    "package",
    "directory",
    "folder",
    "struct",
    "trait",
];

/// Route a request given its classification.
///
/// Order matters: conversational replies first, then planning, then
/// executor cues before explorer cues so "fix X" never becomes a read-only
/// dispatch.
pub fn route_request(text: &str, classification: &Classification) -> Route {
    let lower = text.trim().to_lowercase();

    if let Some((_, reply)) = DIRECT.iter().find(|(re, _)| re.is_match(&lower)) {
        return Route::Direct(*reply);
    }

    if classification.needs_planning() {
        return Route::Plan;
    }

    if EXECUTOR.iter().any(|re| re.is_match(&lower)) {
        return Route::Dispatch(AgentType::Executor);
    }

    if EXPLORER.iter().any(|re| re.is_match(&lower)) {
        return Route::Dispatch(AgentType::Explorer);
    }

    if CODE_WORDS.iter().any(|w| lower.contains(w)) {
        return Route::Dispatch(AgentType::Explorer);
    }

    Route::ForemanDecides
}
