//! Project documentation retriever
//!
//! [`ProjectDocsRetriever`] reads the markdown a project keeps for humans
//! (and for assistants) and hands back the sections that best overlap a
//! query:
//!
//! 1. `AGENTS.md`, `CLAUDE.md`, `README.md` at the project root
//! 2. `docs/**/*.md`
//!
//! Files are split into sections at markdown headings. Each section is
//! scored by how many distinct query terms it contains, with a bonus for
//! terms in the heading. Reading happens on every call so edits made by an
//! executor are visible to the next agent.

use async_trait::async_trait;
use foreman_application::{ContextRetriever, ContextSnippet};
use foreman_domain::util::truncate_str;
use glob::glob;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Root-level files checked first
const ROOT_FILES: &[&str] = &["AGENTS.md", "CLAUDE.md", "README.md"];

/// Files above this size are skipped (1 MB)
const MAX_DOC_SIZE: u64 = 1024 * 1024;

/// Longest section text handed back
const MAX_SNIPPET_CHARS: usize = 1_500;

/// Terms shorter than this are ignored
const MIN_TERM_LEN: usize = 3;

#[derive(Debug, Clone)]
struct Section {
    source: String,
    heading: String,
    body: String,
}

#[derive(Debug, Clone)]
pub struct ProjectDocsRetriever {
    root: PathBuf,
}

impl ProjectDocsRetriever {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn doc_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = ROOT_FILES
            .iter()
            .map(|name| self.root.join(name))
            .filter(|p| p.is_file())
            .collect();

        let pattern = self.root.join("docs").join("**").join("*.md");
        match glob(&pattern.to_string_lossy()) {
            Ok(paths) => {
                let mut docs: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
                docs.sort();
                files.extend(docs);
            }
            Err(e) => warn!("DocsRetriever: bad docs pattern: {}", e),
        }
        files
    }

    fn sections(&self) -> Vec<Section> {
        let mut sections = Vec::new();
        for path in self.doc_files() {
            if fs::metadata(&path).is_ok_and(|m| m.len() > MAX_DOC_SIZE) {
                debug!("DocsRetriever: skipping large file {}", path.display());
                continue;
            }
            match fs::read_to_string(&path) {
                Ok(content) => sections.extend(split_sections(&self.source_name(&path), &content)),
                Err(e) => warn!("DocsRetriever: failed to read {}: {}", path.display(), e),
            }
        }
        sections
    }

    fn source_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn search(&self, query: &str, limit: usize) -> Vec<ContextSnippet> {
        let terms = query_terms(query);
        if terms.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ContextSnippet> = self
            .sections()
            .into_iter()
            .filter_map(|section| {
                let score = score(&section, &terms);
                (score > 0.0).then(|| {
                    let text = if section.heading.is_empty() {
                        section.body.trim().to_string()
                    } else {
                        format!("{}\n{}", section.heading, section.body.trim())
                    };
                    let source = if section.heading.is_empty() {
                        section.source
                    } else {
                        format!("{} > {}", section.source, section.heading.trim_start_matches('#').trim())
                    };
                    ContextSnippet::new(source, truncate_str(&text, MAX_SNIPPET_CHARS), score)
                })
            })
            .collect();

        // stable: ties keep file order
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        scored
    }
}

fn query_terms(query: &str) -> HashSet<String> {
    query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.chars().count() >= MIN_TERM_LEN)
        .map(str::to_lowercase)
        .collect()
}

fn split_sections(source: &str, content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        source: source.to_string(),
        heading: String::new(),
        body: String::new(),
    };
    let mut in_fence = false;

    for line in content.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        if !in_fence && line.starts_with('#') {
            let finished = std::mem::replace(
                &mut current,
                Section {
                    source: source.to_string(),
                    heading: line.trim().to_string(),
                    body: String::new(),
                },
            );
            if !finished.body.trim().is_empty() || !finished.heading.is_empty() {
                sections.push(finished);
            }
            continue;
        }
        current.body.push_str(line);
        current.body.push('\n');
    }
    if !current.body.trim().is_empty() || !current.heading.is_empty() {
        sections.push(current);
    }
    sections
}

fn score(section: &Section, terms: &HashSet<String>) -> f32 {
    let heading = section.heading.to_lowercase();
    let body = section.body.to_lowercase();
    let mut score = 0.0;
    for term in terms {
        if heading.contains(term.as_str()) {
            score += 2.0;
        }
        if body.contains(term.as_str()) {
            score += 1.0;
        }
    }
    score / terms.len() as f32
}

#[async_trait]
impl ContextRetriever for ProjectDocsRetriever {
    async fn retrieve(&self, query: &str, limit: usize) -> Vec<ContextSnippet> {
        let this = self.clone();
        let query = query.to_string();
        match tokio::task::spawn_blocking(move || this.search(&query, limit)).await {
            Ok(snippets) => {
                debug!("DocsRetriever: {} snippet(s) for query", snippets.len());
                snippets
            }
            Err(e) => {
                warn!("DocsRetriever: search task failed: {}", e);
                Vec::new()
            }
        }
    }
}
