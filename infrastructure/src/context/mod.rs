//! Reference material retrieval
//!
//! [`ProjectDocsRetriever`] implements the
//! [`ContextRetriever`](foreman_application::ContextRetriever) port over the
//! markdown files in the project directory.

mod docs;

pub use docs::ProjectDocsRetriever;
