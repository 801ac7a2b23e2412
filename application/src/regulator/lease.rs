//! Lease handles and queued-grant guards

use super::RegulatorInner;
use super::error::RegulatorError;
use foreman_domain::Model;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// One concurrency permit plus a reference on one model slot.
///
/// Released exactly once, when dropped.
pub struct ResourceLease {
    inner: Arc<RegulatorInner>,
    model: Model,
}

impl ResourceLease {
    pub(super) fn new(inner: Arc<RegulatorInner>, model: Model) -> Self {
        Self { inner, model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Report a backend failure on this lease's model.
    ///
    /// The next dispatch to the same model waits out the configured cooldown.
    pub fn mark_backend_error(&self) {
        self.inner
            .lock()
            .note_error(&self.model, &self.inner.config, Instant::now());
    }
}

impl std::fmt::Debug for ResourceLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLease")
            .field("model", &self.model)
            .finish()
    }
}

impl Drop for ResourceLease {
    fn drop(&mut self) {
        self.inner.release(&self.model);
    }
}

/// A queued admission that has not been turned into a lease yet.
///
/// Dropping it before the grant is consumed either leaves the queue or, if
/// the grant already happened, gives the permit back.
pub(super) struct PendingGrant {
    pub inner: Arc<RegulatorInner>,
    pub id: u64,
    pub model: Model,
    pub grant: oneshot::Receiver<()>,
    pub settled: bool,
}

impl PendingGrant {
    pub async fn wait(mut self) -> Result<(), RegulatorError> {
        let granted = (&mut self.grant).await;
        self.settled = true;
        granted.map_err(|_| RegulatorError::Abandoned)
    }
}

impl Drop for PendingGrant {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.inner.lock();
        if !state.remove_waiter(self.id) {
            let now = Instant::now();
            state.release(&self.model, now);
            state.pump(&self.inner.config, now);
        }
    }
}
