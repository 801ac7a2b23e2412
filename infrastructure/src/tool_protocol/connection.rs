//! Newline-framed JSON-RPC over any byte stream.
//!
//! One background task owns the read half. Each line is classified and
//! dispatched:
//!
//! ```text
//! reader task ──line──▶ classify_message
//!                         ├─ Response        → PendingCalls::resolve(id)
//!                         ├─ IncomingRequest → reply method-not-found
//!                         └─ Notification    → trace and drop
//! EOF / read error ─────▶ PendingCalls::close() (every waiter fails)
//! ```
//!
//! Writers serialize through a mutex so concurrent calls never interleave
//! partial lines.

use super::error::{Result, ToolProtocolError};
use super::message::{
    JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, MessageKind, classify_message,
};
use super::pending::PendingCalls;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Bound on writing a refusal for a server-initiated request
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedWriter = Arc<Mutex<Option<BoxedWriter>>>;

pub struct LineConnection {
    server: String,
    writer: SharedWriter,
    pending: Arc<PendingCalls>,
    reader: JoinHandle<()>,
}

impl LineConnection {
    pub fn new<R, W>(server: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let server = server.into();
        let writer: SharedWriter = Arc::new(Mutex::new(Some(Box::new(writer))));
        let pending = PendingCalls::new();

        let reader = tokio::spawn(reader_loop(
            server.clone(),
            BufReader::new(reader),
            Arc::clone(&pending),
            Arc::clone(&writer),
        ));

        Self {
            server,
            writer,
            pending,
            reader,
        }
    }

    /// Send `request` and wait up to `timeout` for the response with its id.
    ///
    /// The deadline covers queueing for the writer and the write itself, not
    /// only the wait for an answer. A timeout while waiting abandons only
    /// this call and the connection stays usable. A timeout in the middle of
    /// a write may leave half a line on the wire, so the connection is
    /// closed instead.
    pub async fn call(&self, request: JsonRpcRequest, timeout: Duration) -> Result<Value> {
        let mut slot = self.pending.register(request.id)?;
        let line = serde_json::to_string(&request)?;
        let mut mid_write = false;

        let exchange = async {
            let mut writer = self.writer.lock().await;
            if self.pending.is_closed() {
                return Err(ToolProtocolError::Connection("transport closed".into()));
            }
            mid_write = true;
            if let Err(e) = write_frame(writer.as_mut(), &line).await {
                self.pending.close();
                return Err(e);
            }
            mid_write = false;
            drop(writer);
            trace!("ToolServer[{}] -> {} (id={})", self.server, request.method, request.id);
            slot.response().await?.into_result()
        };

        let outcome = tokio::time::timeout(timeout, exchange).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                if mid_write {
                    warn!(
                        "ToolServer[{}]: write of {} stalled for {:?}, closing connection",
                        self.server, request.method, timeout
                    );
                    self.abandon_writer();
                }
                Err(ToolProtocolError::Timeout {
                    method: request.method,
                    after: timeout,
                })
            }
        }
    }

    /// True once the read side has ended; no call can succeed after that.
    pub fn is_closed(&self) -> bool {
        self.pending.is_closed()
    }

    /// Drop the write half, which closes a child's stdin.
    ///
    /// Never waits behind a stuck write: if another call holds the writer,
    /// the connection is closed for callers and the caller's kill path
    /// unblocks the write.
    pub async fn close_input(&self) {
        match self.writer.try_lock() {
            Ok(mut writer) => {
                writer.take();
            }
            Err(_) => {
                debug!("ToolServer[{}]: writer busy at close", self.server);
                self.pending.close();
            }
        }
    }

    fn abandon_writer(&self) {
        self.pending.close();
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }
}

impl Drop for LineConnection {
    fn drop(&mut self) {
        self.reader.abort();
        self.pending.close();
    }
}

async fn write_frame(writer: Option<&mut BoxedWriter>, line: &str) -> Result<()> {
    let Some(w) = writer else {
        return Err(ToolProtocolError::Connection("input side closed".into()));
    };
    let io = async {
        w.write_all(line.as_bytes()).await?;
        w.write_all(b"\n").await?;
        w.flush().await
    };
    io.await
        .map_err(|e| ToolProtocolError::Connection(format!("write failed: {}", e)))
}

async fn reader_loop<R>(
    server: String,
    mut reader: BufReader<R>,
    pending: Arc<PendingCalls>,
    writer: SharedWriter,
) where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("ToolServer[{}]: read failed: {}", server, e);
                break;
            }
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let json: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                warn!("ToolServer[{}]: unparseable line ({}): {}", server, e, trimmed);
                continue;
            }
        };

        match classify_message(&json) {
            MessageKind::Response => match serde_json::from_value::<JsonRpcResponse>(json) {
                Ok(response) => {
                    let id = response.id;
                    if !pending.resolve(response) {
                        debug!("ToolServer[{}]: no caller waiting for id={:?}", server, id);
                    }
                }
                Err(e) => warn!("ToolServer[{}]: malformed response: {}", server, e),
            },
            MessageKind::IncomingRequest { id } => {
                debug!("ToolServer[{}]: refusing server request id={}", server, id);
                let reply = JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "method not supported");
                let Ok(text) = serde_json::to_string(&reply) else {
                    continue;
                };
                let refusal = async {
                    let mut writer = writer.lock().await;
                    write_frame(writer.as_mut(), &text).await
                };
                // A server that stops reading would otherwise stall this loop
                if tokio::time::timeout(REPLY_TIMEOUT, refusal).await.is_err() {
                    warn!("ToolServer[{}]: refusal for id={} stalled", server, id);
                    break;
                }
            }
            MessageKind::Notification => {
                trace!("ToolServer[{}] notification: {}", server, trimmed);
            }
        }
    }

    let failed = pending.close();
    debug!(
        "ToolServer[{}]: connection closed ({} call(s) failed)",
        server, failed
    );
}
