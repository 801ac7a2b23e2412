//! Streaming events for LLM session communication.
//!
//! A streamed reply arrives as a sequence of [`StreamEvent`]s over a bounded
//! channel. A structured tool call can show up in any chunk, including the
//! first, so consumers must inspect every event rather than only the last.

use crate::tool::entities::ToolCall;

/// An event in a streaming LLM response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),
    /// A complete structured tool call carried by a chunk.
    ToolCall(ToolCall),
    /// The complete response text (signals stream end).
    Completed(String),
    /// An error that occurred during streaming (signals stream end).
    Error(String),
}

impl StreamEvent {
    /// Returns the text content if this is a Delta or Completed event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) | StreamEvent::Completed(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}
