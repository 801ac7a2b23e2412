//! Resource Regulator
//!
//! Bounds in-flight inference calls and resident models against the limits
//! in [`RegulatorConfig`], with a bounded FIFO admission queue, dispatch
//! pacing, and a per-model cooldown after backend errors.
//!
//! Permit and slot state changes only through [`ResourceRegulator::acquire`]
//! and the drop of a [`ResourceLease`].
//!
//! | situation                                  | acquire                      |
//! |--------------------------------------------|------------------------------|
//! | model resident, permit free                | granted (skips the queue)    |
//! | queue empty, permit free, slot obtainable  | granted (may evict idle LRU) |
//! | otherwise, queue below `request_queue_size`| waits in the queue           |
//! | otherwise                                  | `ResourceExhausted`          |

mod config;
mod error;
mod lease;
mod state;

pub use config::RegulatorConfig;
pub use error::RegulatorError;
pub use lease::ResourceLease;

use foreman_domain::Model;
use lease::PendingGrant;
use serde::Serialize;
use state::{Admission, RegulatorState};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, warn};

pub(crate) struct RegulatorInner {
    config: RegulatorConfig,
    state: Mutex<RegulatorState>,
}

impl RegulatorInner {
    fn lock(&self) -> MutexGuard<'_, RegulatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, model: &Model) {
        let now = Instant::now();
        let mut state = self.lock();
        state.release(model, now);
        state.pump(&self.config, now);
    }
}

/// A resident model as seen in a status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResidentModel {
    pub model: Model,
    pub leases: usize,
}

/// Point-in-time view of the regulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegulatorStatus {
    pub in_flight: usize,
    pub queued: usize,
    pub resident: Vec<ResidentModel>,
    pub evictions: u64,
    pub grants: u64,
    pub releases: u64,
    pub max_concurrent_requests: usize,
    pub max_models_loaded: usize,
    pub request_queue_size: usize,
}

/// Shared admission control for every inference call.
///
/// Cloning is cheap; clones share the same permits.
#[derive(Clone)]
pub struct ResourceRegulator {
    inner: Arc<RegulatorInner>,
}

impl ResourceRegulator {
    pub fn new(config: RegulatorConfig) -> Self {
        Self {
            inner: Arc::new(RegulatorInner {
                config,
                state: Mutex::new(RegulatorState::default()),
            }),
        }
    }

    pub fn config(&self) -> &RegulatorConfig {
        &self.inner.config
    }

    /// Wait for a permit and a slot for `model`.
    ///
    /// Cancel-safe: dropping the future while queued leaves the queue, and
    /// dropping it during the pacing delay releases the lease.
    pub async fn acquire(&self, model: &Model) -> Result<ResourceLease, RegulatorError> {
        let config = &self.inner.config;
        let admission = self.inner.lock().admit(model, config, Instant::now());

        match admission {
            Admission::Granted => {}
            Admission::Rejected { queued } => {
                warn!(
                    "Regulator: refusing {} ({} already queued)",
                    model, queued
                );
                return Err(RegulatorError::ResourceExhausted {
                    queued,
                    capacity: config.request_queue_size,
                });
            }
            Admission::Queued { id, grant } => {
                debug!("Regulator: {} queued as waiter {}", model, id);
                PendingGrant {
                    inner: self.inner.clone(),
                    id,
                    model: model.clone(),
                    grant,
                    settled: false,
                }
                .wait()
                .await?;
            }
        }

        let lease = ResourceLease::new(self.inner.clone(), model.clone());

        let now = Instant::now();
        let at = self.inner.lock().dispatch_at(model, config, now);
        if at > now {
            debug!(
                "Regulator: pacing {} for {}ms",
                model,
                (at - now).as_millis()
            );
            tokio::time::sleep_until(at).await;
        }

        Ok(lease)
    }

    pub fn status(&self) -> RegulatorStatus {
        let config = &self.inner.config;
        let state = self.inner.lock();
        RegulatorStatus {
            in_flight: state.in_flight,
            queued: state.queued(),
            resident: state
                .resident
                .iter()
                .map(|r| ResidentModel {
                    model: r.model.clone(),
                    leases: r.leases,
                })
                .collect(),
            evictions: state.evictions,
            grants: state.grants,
            releases: state.releases,
            max_concurrent_requests: config.max_concurrent_requests,
            max_models_loaded: config.max_models_loaded,
            request_queue_size: config.request_queue_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn regulator(permits: usize, slots: usize, queue: usize) -> ResourceRegulator {
        ResourceRegulator::new(
            RegulatorConfig::default()
                .with_max_concurrent_requests(permits)
                .with_max_models_loaded(slots)
                .with_request_queue_size(queue)
                .with_cooldown_after_error(Duration::ZERO),
        )
    }

    async fn wait_for_queued(regulator: &ResourceRegulator, n: usize) {
        while regulator.status().queued < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_grants_up_to_limit_then_hands_over_on_release() {
        let reg = regulator(2, 2, 4);
        let model = Model::new("a");

        let first = reg.acquire(&model).await.unwrap();
        let _second = reg.acquire(&model).await.unwrap();
        assert_eq!(reg.status().in_flight, 2);

        let waiter = {
            let reg = reg.clone();
            let model = model.clone();
            tokio::spawn(async move { reg.acquire(&model).await.map(|_| ()) })
        };
        wait_for_queued(&reg, 1).await;

        drop(first);
        waiter.await.unwrap().unwrap();

        let status = reg.status();
        assert_eq!(status.queued, 0);
        assert_eq!(status.in_flight, 1);
    }

    #[tokio::test]
    async fn test_full_queue_fails_fast() {
        let reg = regulator(1, 1, 1);
        let model = Model::new("a");
        let _held = reg.acquire(&model).await.unwrap();

        let _queued = {
            let reg = reg.clone();
            let model = model.clone();
            tokio::spawn(async move { reg.acquire(&model).await.map(|_| ()) })
        };
        wait_for_queued(&reg, 1).await;

        let err = reg.acquire(&Model::new("b")).await.unwrap_err();
        assert_eq!(
            err,
            RegulatorError::ResourceExhausted {
                queued: 1,
                capacity: 1
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_same_model_runs_without_eviction_and_cold_switch_waits() {
        let reg = regulator(1, 1, 8);
        let warm_model = Model::new("qwen2.5-coder:7b");
        let cold_model = Model::new("llama3.2:3b");
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = reg.acquire(&warm_model).await.unwrap();

        // Queued first, but needs a different model
        let cold = {
            let (reg, model, order) = (reg.clone(), cold_model.clone(), order.clone());
            tokio::spawn(async move {
                let _lease = reg.acquire(&model).await.unwrap();
                order.lock().unwrap().push("cold");
            })
        };
        wait_for_queued(&reg, 1).await;

        let warm = {
            let (reg, model, order) = (reg.clone(), warm_model.clone(), order.clone());
            tokio::spawn(async move {
                let _lease = reg.acquire(&model).await.unwrap();
                order.lock().unwrap().push("warm");
            })
        };
        wait_for_queued(&reg, 2).await;

        assert_eq!(reg.status().evictions, 0);
        assert!(order.lock().unwrap().is_empty());

        drop(first);
        warm.await.unwrap();
        cold.await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["warm", "cold"]);
        let status = reg.status();
        assert_eq!(status.evictions, 1);
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.resident.len(), 1);
        assert_eq!(status.resident[0].model, cold_model);
    }

    #[tokio::test]
    async fn test_dropped_waiter_leaves_queue() {
        let reg = regulator(1, 1, 4);
        let model = Model::new("a");
        let held = reg.acquire(&model).await.unwrap();

        let attempt = tokio::time::timeout(Duration::from_millis(10), reg.acquire(&model)).await;
        assert!(attempt.is_err());
        assert_eq!(reg.status().queued, 0);

        drop(held);
        let status = reg.status();
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.grants, status.releases);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_during_pacing_releases_lease() {
        let reg = ResourceRegulator::new(
            RegulatorConfig::default().with_min_dispatch_interval(Duration::from_secs(5)),
        );
        let model = Model::new("a");
        let first = reg.acquire(&model).await.unwrap();
        drop(first);

        // The second dispatch must wait out the interval; give up before then
        let attempt = tokio::time::timeout(Duration::from_secs(1), reg.acquire(&model)).await;
        assert!(attempt.is_err());

        let status = reg.status();
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.grants, 2);
        assert_eq!(status.releases, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_delays_next_grant_for_model() {
        let reg = ResourceRegulator::new(
            RegulatorConfig::default().with_cooldown_after_error(Duration::from_secs(2)),
        );
        let model = Model::new("a");

        let lease = reg.acquire(&model).await.unwrap();
        lease.mark_backend_error();
        drop(lease);

        let started = Instant::now();
        let _next = reg.acquire(&model).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));

        let other_started = Instant::now();
        let _other = reg.acquire(&Model::new("b")).await.unwrap();
        assert!(other_started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_randomized_load_never_exceeds_permits() {
        const PERMITS: usize = 3;
        let reg = regulator(PERMITS, 2, 64);
        let models = Arc::new([Model::new("a"), Model::new("b"), Model::new("c")]);
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for worker in 0..40u64 {
            let (reg, models, current, peak) =
                (reg.clone(), models.clone(), current.clone(), peak.clone());
            handles.push(tokio::spawn(async move {
                let mut seed = worker.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                for _ in 0..5 {
                    seed = seed
                        .wrapping_mul(6364136223846793005)
                        .wrapping_add(1442695040888963407);
                    let model = &models[(seed >> 33) as usize % models.len()];
                    let lease = reg.acquire(model).await.unwrap();

                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_micros((seed >> 40) % 500)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    drop(lease);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= PERMITS);
        let status = reg.status();
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.queued, 0);
        assert_eq!(status.grants, 200);
        assert_eq!(status.releases, 200);
        assert!(status.resident.iter().all(|r| r.leases == 0));
    }
}
