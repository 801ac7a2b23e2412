//! Context retrieval port
//!
//! Documentation and memory lookups return ranked snippets that are
//! prepended to an agent's first prompt. The retrieval pipeline itself lives
//! outside the engine.

use async_trait::async_trait;

/// A ranked piece of reference material
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnippet {
    /// Where the snippet came from (URL, file, memory key)
    pub source: String,
    pub text: String,
    pub score: f32,
}

impl ContextSnippet {
    pub fn new(source: impl Into<String>, text: impl Into<String>, score: f32) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            score,
        }
    }

    /// Render for inclusion in a prompt
    pub fn to_prompt(&self) -> String {
        format!("[{}]\n{}", self.source, self.text)
    }
}

/// Port for retrieving reference snippets for a query
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Return at most `limit` snippets, best first
    async fn retrieve(&self, query: &str, limit: usize) -> Vec<ContextSnippet>;
}

/// Retriever that never finds anything
pub struct NoContextRetriever;

#[async_trait]
impl ContextRetriever for NoContextRetriever {
    async fn retrieve(&self, _query: &str, _limit: usize) -> Vec<ContextSnippet> {
        Vec::new()
    }
}
