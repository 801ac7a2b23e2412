//! Resource regulator limits (`[regulator]` section)

use foreman_application::RegulatorConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// ```toml
/// [regulator]
/// max_concurrent_requests = 4
/// max_models_loaded = 2
/// request_queue_size = 32
/// min_dispatch_interval_ms = 0
/// cooldown_after_error_ms = 2000
///
/// # or derive the first two from a memory budget
/// memory_budget_mb = 24000
/// model_footprint_mb = 6000
/// request_overhead_mb = 1500
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRegulatorConfig {
    pub max_concurrent_requests: usize,
    pub max_models_loaded: usize,
    pub request_queue_size: usize,
    pub min_dispatch_interval_ms: u64,
    pub cooldown_after_error_ms: u64,
    /// When set, replaces `max_concurrent_requests` and `max_models_loaded`
    pub memory_budget_mb: Option<u64>,
    pub model_footprint_mb: u64,
    pub request_overhead_mb: u64,
}

impl Default for FileRegulatorConfig {
    fn default() -> Self {
        let defaults = RegulatorConfig::default();
        Self {
            max_concurrent_requests: defaults.max_concurrent_requests,
            max_models_loaded: defaults.max_models_loaded,
            request_queue_size: defaults.request_queue_size,
            min_dispatch_interval_ms: defaults.min_dispatch_interval.as_millis() as u64,
            cooldown_after_error_ms: defaults.cooldown_after_error.as_millis() as u64,
            memory_budget_mb: None,
            model_footprint_mb: 6_000,
            request_overhead_mb: 1_000,
        }
    }
}

impl FileRegulatorConfig {
    pub fn to_regulator_config(&self) -> RegulatorConfig {
        let base = match self.memory_budget_mb {
            Some(budget) => RegulatorConfig::from_memory_budget(
                budget,
                self.model_footprint_mb,
                self.request_overhead_mb,
            ),
            None => RegulatorConfig::default()
                .with_max_concurrent_requests(self.max_concurrent_requests)
                .with_max_models_loaded(self.max_models_loaded),
        };
        base.with_request_queue_size(self.request_queue_size)
            .with_min_dispatch_interval(Duration::from_millis(self.min_dispatch_interval_ms))
            .with_cooldown_after_error(Duration::from_millis(self.cooldown_after_error_ms))
    }
}
