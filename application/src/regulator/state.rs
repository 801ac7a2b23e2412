//! Permit, slot, and queue bookkeeping.
//!
//! Everything here runs under the regulator's mutex and never awaits.

use super::config::RegulatorConfig;
use foreman_domain::Model;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
pub(super) struct Resident {
    pub model: Model,
    pub leases: usize,
    pub last_used: Instant,
}

pub(super) struct Waiter {
    id: u64,
    model: Model,
    grant: oneshot::Sender<()>,
}

/// Result of asking for a permit without waiting
pub(super) enum Admission {
    Granted,
    Queued { id: u64, grant: oneshot::Receiver<()> },
    Rejected { queued: usize },
}

#[derive(Default)]
pub(super) struct RegulatorState {
    pub in_flight: usize,
    pub resident: Vec<Resident>,
    queue: VecDeque<Waiter>,
    next_waiter_id: u64,
    last_dispatch: Option<Instant>,
    cooldown_until: HashMap<Model, Instant>,
    pub evictions: u64,
    pub grants: u64,
    pub releases: u64,
}

impl RegulatorState {
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn is_resident(&self, model: &Model) -> bool {
        self.resident.iter().any(|r| &r.model == model)
    }

    /// Admit immediately, queue, or refuse.
    ///
    /// A request for a resident model skips the queue when a permit is free;
    /// anything else only bypasses the queue when nobody is waiting.
    pub fn admit(&mut self, model: &Model, config: &RegulatorConfig, now: Instant) -> Admission {
        let sticky = self.is_resident(model) && self.in_flight < config.max_concurrent_requests;
        if (sticky || self.queue.is_empty()) && self.try_claim(model, config, now) {
            return Admission::Granted;
        }

        if self.queue.len() >= config.request_queue_size {
            return Admission::Rejected {
                queued: self.queue.len(),
            };
        }

        let id = self.next_waiter_id;
        self.next_waiter_id += 1;
        let (tx, rx) = oneshot::channel();
        self.queue.push_back(Waiter {
            id,
            model: model.clone(),
            grant: tx,
        });
        Admission::Queued { id, grant: rx }
    }

    /// Take a permit and a slot reference for `model` if both are available.
    fn try_claim(&mut self, model: &Model, config: &RegulatorConfig, now: Instant) -> bool {
        if self.in_flight >= config.max_concurrent_requests {
            return false;
        }

        if let Some(resident) = self.resident.iter_mut().find(|r| &r.model == model) {
            resident.leases += 1;
            resident.last_used = now;
        } else {
            if self.resident.len() >= config.max_models_loaded && !self.evict_lru() {
                return false;
            }
            debug!("Regulator: loading {}", model);
            self.resident.push(Resident {
                model: model.clone(),
                leases: 1,
                last_used: now,
            });
        }

        self.in_flight += 1;
        self.grants += 1;
        true
    }

    /// Evict the least-recently-used model that has no lease.
    fn evict_lru(&mut self) -> bool {
        let idle = self
            .resident
            .iter()
            .enumerate()
            .filter(|(_, r)| r.leases == 0)
            .min_by_key(|(_, r)| r.last_used)
            .map(|(i, _)| i);

        match idle {
            Some(index) => {
                let evicted = self.resident.remove(index);
                self.evictions += 1;
                debug!("Regulator: evicting {}", evicted.model);
                true
            }
            None => false,
        }
    }

    /// Return one permit and one slot reference for `model`.
    pub fn release(&mut self, model: &Model, now: Instant) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.releases += 1;
        if let Some(resident) = self.resident.iter_mut().find(|r| &r.model == model) {
            resident.leases = resident.leases.saturating_sub(1);
            resident.last_used = now;
        }
    }

    /// Remove a waiter that gave up. Returns false if it was already granted.
    pub fn remove_waiter(&mut self, id: u64) -> bool {
        match self.queue.iter().position(|w| w.id == id) {
            Some(pos) => {
                self.queue.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Grant queued waiters while permits and slots allow.
    ///
    /// Waiters for resident models go first (in arrival order), then the
    /// oldest waiter that needs a cold load.
    pub fn pump(&mut self, config: &RegulatorConfig, now: Instant) {
        while self.in_flight < config.max_concurrent_requests && !self.queue.is_empty() {
            let pos = self
                .queue
                .iter()
                .position(|w| self.is_resident(&w.model))
                .unwrap_or(0);

            let model = self.queue[pos].model.clone();
            if !self.try_claim(&model, config, now) {
                break;
            }

            if let Some(waiter) = self.queue.remove(pos)
                && waiter.grant.send(()).is_err()
            {
                self.release(&model, now);
            }
        }
    }

    /// Reserve the next dispatch time for `model` and return it.
    pub fn dispatch_at(&mut self, model: &Model, config: &RegulatorConfig, now: Instant) -> Instant {
        let pace = match self.last_dispatch {
            Some(last) => now.max(last + config.min_dispatch_interval),
            None => now,
        };
        // Pacing is shared by every model; a cooldown only delays its own model.
        self.last_dispatch = Some(pace);
        match self.cooldown_until.get(model).copied() {
            Some(until) if until > now => pace.max(until),
            Some(_) => {
                self.cooldown_until.remove(model);
                pace
            }
            None => pace,
        }
    }

    pub fn note_error(&mut self, model: &Model, config: &RegulatorConfig, now: Instant) {
        if !config.cooldown_after_error.is_zero() {
            self.cooldown_until
                .insert(model.clone(), now + config.cooldown_after_error);
        }
    }
}
