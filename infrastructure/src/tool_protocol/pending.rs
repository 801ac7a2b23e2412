//! Calls awaiting their response, keyed by request id

use super::error::{Result, ToolProtocolError};
use super::message::JsonRpcResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Default)]
struct Slots {
    waiting: HashMap<u64, oneshot::Sender<JsonRpcResponse>>,
    closed: bool,
}

/// Request/response correlation table shared between callers and the reader
/// task.
///
/// Once closed (the transport ended), every waiting receiver is dropped and
/// no new call can register.
#[derive(Default)]
pub(crate) struct PendingCalls {
    slots: Mutex<Slots>,
}

impl PendingCalls {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(self: &Arc<Self>, id: u64) -> Result<PendingCall> {
        let mut slots = self.lock();
        if slots.closed {
            return Err(ToolProtocolError::Connection("transport closed".into()));
        }
        let (tx, rx) = oneshot::channel();
        slots.waiting.insert(id, tx);
        Ok(PendingCall {
            id,
            rx,
            pending: Arc::clone(self),
        })
    }

    /// Hand a response to its caller. Returns false when nobody waits for
    /// that id (late answer after a timeout, or an unknown id).
    pub fn resolve(&self, response: JsonRpcResponse) -> bool {
        let Some(id) = response.id else {
            return false;
        };
        let sender = self.lock().waiting.remove(&id);
        match sender {
            Some(tx) => tx.send(response).is_ok(),
            None => false,
        }
    }

    fn forget(&self, id: u64) {
        self.lock().waiting.remove(&id);
    }

    /// Fail every waiting call and refuse new ones. Returns how many calls
    /// were waiting.
    pub fn close(&self) -> usize {
        let mut slots = self.lock();
        slots.closed = true;
        let failed = slots.waiting.len();
        slots.waiting.clear();
        failed
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().waiting.len()
    }
}

/// Receiver side of one registered call. Dropping it (timeout, or the
/// caller's future being dropped) removes the slot.
pub(crate) struct PendingCall {
    id: u64,
    rx: oneshot::Receiver<JsonRpcResponse>,
    pending: Arc<PendingCalls>,
}

impl PendingCall {
    /// Wait for the response; an error means the transport closed first.
    pub async fn response(&mut self) -> Result<JsonRpcResponse> {
        (&mut self.rx).await.map_err(|_| {
            ToolProtocolError::Connection("transport closed with the call pending".into())
        })
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        self.pending.forget(self.id);
    }
}
