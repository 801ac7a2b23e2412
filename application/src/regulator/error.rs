//! Regulator errors

use thiserror::Error;

/// Errors returned by [`ResourceRegulator::acquire`](super::ResourceRegulator::acquire)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegulatorError {
    /// The admission queue is full; try again later
    #[error("Resource exhausted: {queued} requests already queued (limit {capacity})")]
    ResourceExhausted { queued: usize, capacity: usize },

    /// The queued admission was dropped without a grant
    #[error("Admission abandoned before a permit was granted")]
    Abandoned,
}

impl RegulatorError {
    /// Queue exhaustion clears on its own once running work finishes
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegulatorError::ResourceExhausted { .. })
    }
}
