//! Tool session lifecycle.
//!
//! ```text
//!   Idle ──start()──▶ (spawn/connect + initialize) ──ok──▶ Ready
//!    ▲                        │ fail/timeout                 │ transport closes
//!    │                        ▼                              ▼
//!    └────stop()──────────── Dead ◀──────────────────────────┘
//! ```
//!
//! A Dead session is never restarted implicitly; calls fail with
//! [`ToolProtocolError::NotReady`] until `start()` runs again.

use super::config::{ToolServerConfig, TransportConfig};
use super::connection::LineConnection;
use super::error::{Result, ToolProtocolError};
use super::http::HttpTransport;
use super::message::{JsonRpcRequest, RemoteTool, ToolCallOutput, ToolList};
use super::pipe::{PipeCommand, PipeTransport};
use serde_json::{Value, json};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready,
    Dead,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Dead => write!(f, "dead"),
        }
    }
}

enum Link {
    Pipe(PipeTransport),
    Http(HttpTransport),
    Stream(LineConnection),
}

impl Link {
    async fn call(&self, request: JsonRpcRequest, timeout: Duration) -> Result<Value> {
        match self {
            Link::Pipe(t) => t.call(request, timeout).await,
            Link::Http(t) => t.call(request, timeout).await,
            Link::Stream(c) => c.call(request, timeout).await,
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Link::Pipe(t) => t.is_closed(),
            Link::Http(t) => t.is_closed(),
            Link::Stream(c) => c.is_closed(),
        }
    }

    async fn shutdown(&self) {
        match self {
            Link::Pipe(t) => t.stop().await,
            Link::Http(t) => t.close(),
            Link::Stream(c) => c.close_input().await,
        }
    }
}

/// One logical connection to a tool server.
///
/// Request ids come from a per-session counter; any number of calls may be
/// in flight at once.
pub struct ToolSession {
    config: ToolServerConfig,
    next_id: AtomicU64,
    link: Mutex<Option<Arc<Link>>>,
    failed: AtomicBool,
    start_lock: tokio::sync::Mutex<()>,
}

impl ToolSession {
    pub fn new(config: ToolServerConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            link: Mutex::new(None),
            failed: AtomicBool::new(false),
            start_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ToolServerConfig {
        &self.config
    }

    fn current(&self) -> Option<Arc<Link>> {
        self.link
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn state(&self) -> SessionState {
        match self.current() {
            Some(link) if !link.is_closed() => SessionState::Ready,
            Some(_) => SessionState::Dead,
            None if self.failed.load(Ordering::SeqCst) => SessionState::Dead,
            None => SessionState::Idle,
        }
    }

    fn request(&self, method: &str, params: Option<Value>) -> JsonRpcRequest {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        JsonRpcRequest::new(id, method, params)
    }

    /// Spawn or connect the transport and complete the `initialize`
    /// handshake within `startup_timeout`.
    ///
    /// A Ready session is left alone; a Dead one is torn down and replaced.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.start_lock.lock().await;
        if self.state() == SessionState::Ready {
            return Ok(());
        }
        self.teardown().await;
        self.connect().await
    }

    /// Start on first use. Unlike [`start`](Self::start) this never replaces
    /// a Dead session: the state is re-read under the start lock, so callers
    /// that raced a failed startup get `NotReady(Dead)`.
    pub async fn start_if_idle(&self) -> Result<()> {
        let _guard = self.start_lock.lock().await;
        match self.state() {
            SessionState::Ready => Ok(()),
            SessionState::Idle => self.connect().await,
            SessionState::Dead => Err(ToolProtocolError::NotReady(SessionState::Dead)),
        }
    }

    async fn connect(&self) -> Result<()> {
        let link = match &self.config.transport {
            TransportConfig::Pipe {
                command,
                args,
                env,
                cwd,
            } => PipeTransport::spawn(
                &self.config.name,
                PipeCommand {
                    program: command,
                    args,
                    env,
                    cwd: cwd.as_deref(),
                },
            )
            .map(Link::Pipe),
            TransportConfig::Http { url, headers } => {
                HttpTransport::new(&self.config.name, url, headers).map(Link::Http)
            }
        };
        match link {
            Ok(link) => self.handshake(link).await,
            Err(e) => Err(self.startup_failed(e)),
        }
    }

    /// Start over an already-connected byte stream (a socket, or an
    /// in-process server).
    pub async fn attach(&self, connection: LineConnection) -> Result<()> {
        let _guard = self.start_lock.lock().await;
        self.teardown().await;
        self.handshake(Link::Stream(connection)).await
    }

    async fn handshake(&self, link: Link) -> Result<()> {
        let request = self.request(
            "initialize",
            Some(json!({
                "clientInfo": {"name": "foreman", "version": env!("CARGO_PKG_VERSION")}
            })),
        );
        match link.call(request, self.config.startup_timeout).await {
            Ok(_) => {
                *self.link.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(link));
                self.failed.store(false, Ordering::SeqCst);
                info!(
                    "ToolSession[{}]: ready ({})",
                    self.config.name,
                    self.config.transport.kind()
                );
                Ok(())
            }
            Err(e) => {
                link.shutdown().await;
                Err(self.startup_failed(e))
            }
        }
    }

    fn startup_failed(&self, cause: ToolProtocolError) -> ToolProtocolError {
        self.failed.store(true, Ordering::SeqCst);
        let error = match cause {
            e @ ToolProtocolError::Startup { .. } => e,
            other => ToolProtocolError::Startup {
                server: self.config.name.clone(),
                reason: other.to_string(),
            },
        };
        warn!("ToolSession[{}]: {}", self.config.name, error);
        error
    }

    /// Issue one request. Only a Ready session accepts calls.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let link = match self.current() {
            Some(link) if !link.is_closed() => link,
            _ => return Err(ToolProtocolError::NotReady(self.state())),
        };
        let result = link
            .call(self.request(method, params), self.config.call_timeout)
            .await;
        if let Err(ToolProtocolError::Connection(reason)) = &result {
            warn!(
                "ToolSession[{}]: connection lost ({}); session is dead",
                self.config.name, reason
            );
        }
        result
    }

    pub async fn list_tools(&self) -> Result<Vec<RemoteTool>> {
        let value = self.call("tools/list", None).await?;
        let list: ToolList = serde_json::from_value(value)?;
        Ok(list.tools)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallOutput> {
        let value = self
            .call(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn teardown(&self) {
        let link = self.link.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(link) = link {
            link.shutdown().await;
        }
    }

    /// Shut the transport down and return to Idle.
    pub async fn stop(&self) {
        let _guard = self.start_lock.lock().await;
        self.teardown().await;
        self.failed.store(false, Ordering::SeqCst);
    }
}
