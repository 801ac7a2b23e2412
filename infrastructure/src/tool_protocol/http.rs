//! HTTP transport: each JSON-RPC request is one POST to the server URL

use super::error::{Result, ToolProtocolError};
use super::message::{JsonRpcRequest, JsonRpcResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{trace, warn};

pub struct HttpTransport {
    server: String,
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
    closed: AtomicBool,
}

impl HttpTransport {
    pub fn new(server: &str, url: &str, headers: &BTreeMap<String, String>) -> Result<Self> {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ToolProtocolError::Config(format!("header '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ToolProtocolError::Config(format!("header '{}': {}", name, e)))?;
            map.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ToolProtocolError::Config(e.to_string()))?;

        Ok(Self {
            server: server.to_string(),
            client,
            url: url.to_string(),
            headers: map,
            closed: AtomicBool::new(false),
        })
    }

    pub async fn call(&self, request: JsonRpcRequest, timeout: Duration) -> Result<Value> {
        if self.is_closed() {
            return Err(ToolProtocolError::Connection("server unreachable".into()));
        }
        trace!("ToolServer[{}] POST {} (id={})", self.server, request.method, request.id);

        let exchange = async {
            self.client
                .post(&self.url)
                .headers(self.headers.clone())
                .json(&request)
                .send()
                .await?
                .error_for_status()?
                .json::<JsonRpcResponse>()
                .await
        };

        let response = match tokio::time::timeout(timeout, exchange).await {
            Err(_) => {
                return Err(ToolProtocolError::Timeout {
                    method: request.method,
                    after: timeout,
                });
            }
            Ok(Err(e)) if e.is_connect() => {
                warn!("ToolServer[{}]: connection failed: {}", self.server, e);
                self.closed.store(true, Ordering::SeqCst);
                return Err(ToolProtocolError::Connection(e.to_string()));
            }
            Ok(Err(e)) if e.is_timeout() => {
                return Err(ToolProtocolError::Timeout {
                    method: request.method,
                    after: timeout,
                });
            }
            Ok(Err(e)) => return Err(ToolProtocolError::Malformed(e.to_string())),
            Ok(Ok(response)) => response,
        };

        if response.id != Some(request.id) {
            return Err(ToolProtocolError::Malformed(format!(
                "response id {:?} does not match request id {}",
                response.id, request.id
            )));
        }
        response.into_result()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
