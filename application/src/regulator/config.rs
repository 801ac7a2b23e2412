//! Regulator limits

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits enforced by the [`ResourceRegulator`](super::ResourceRegulator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulatorConfig {
    /// Inference calls allowed in flight at once
    pub max_concurrent_requests: usize,
    /// Models allowed to be resident in backend memory at once
    pub max_models_loaded: usize,
    /// Waiters allowed in the admission queue before new requests are refused
    pub request_queue_size: usize,
    /// Minimum spacing between two consecutive dispatches
    pub min_dispatch_interval: Duration,
    /// Delay before the next dispatch to a model that reported a backend error
    pub cooldown_after_error: Duration,
}

impl Default for RegulatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 5,
            max_models_loaded: 2,
            request_queue_size: 32,
            min_dispatch_interval: Duration::ZERO,
            cooldown_after_error: Duration::from_secs(2),
        }
    }
}

impl RegulatorConfig {
    /// Derive the permit and slot limits from a memory budget.
    ///
    /// Model slots get as many full model footprints as fit while leaving
    /// room for one request; the rest of the budget is split into
    /// per-request permits. Both limits are at least 1.
    pub fn from_memory_budget(budget_mb: u64, model_footprint_mb: u64, request_overhead_mb: u64) -> Self {
        let model_mb = model_footprint_mb.max(1);
        let request_mb = request_overhead_mb.max(1);

        let models = (budget_mb.saturating_sub(request_mb) / model_mb).max(1);
        let remaining = budget_mb.saturating_sub(models * model_mb);
        let requests = (remaining / request_mb).max(1);

        Self {
            max_concurrent_requests: usize::try_from(requests).unwrap_or(usize::MAX),
            max_models_loaded: usize::try_from(models).unwrap_or(usize::MAX),
            ..Self::default()
        }
    }

    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    pub fn with_max_models_loaded(mut self, max: usize) -> Self {
        self.max_models_loaded = max;
        self
    }

    pub fn with_request_queue_size(mut self, size: usize) -> Self {
        self.request_queue_size = size;
        self
    }

    pub fn with_min_dispatch_interval(mut self, interval: Duration) -> Self {
        self.min_dispatch_interval = interval;
        self
    }

    pub fn with_cooldown_after_error(mut self, cooldown: Duration) -> Self {
        self.cooldown_after_error = cooldown;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_budget_derivation() {
        let config = RegulatorConfig::from_memory_budget(16_384, 4_700, 1_024);
        assert_eq!(config.max_models_loaded, 3);
        assert_eq!(config.max_concurrent_requests, 2);
        assert_eq!(config.request_queue_size, 32);
    }

    #[test]
    fn test_tiny_budget_still_allows_one_of_each() {
        let config = RegulatorConfig::from_memory_budget(1_000, 4_700, 1_024);
        assert_eq!(config.max_models_loaded, 1);
        assert_eq!(config.max_concurrent_requests, 1);
    }
}
