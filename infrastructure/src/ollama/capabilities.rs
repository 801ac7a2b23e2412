//! Tool-calling support lookup via `/api/show`

use super::gateway::OllamaGateway;
use super::types::ShowResponse;
use async_trait::async_trait;
use foreman_application::ports::model_capabilities::ModelCapabilities;
use foreman_domain::Model;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Asks the backend whether each model handles structured tool calls, once
/// per model. A failed lookup answers "no" without caching, so the agent
/// falls back to text tool calls and the next dispatch asks again.
pub struct OllamaCapabilities {
    client: reqwest::Client,
    base_url: String,
    known: RwLock<HashMap<String, bool>>,
}

impl OllamaCapabilities {
    pub fn new(gateway: &OllamaGateway) -> Self {
        Self {
            client: gateway.client().clone(),
            base_url: gateway.base_url().to_string(),
            known: RwLock::new(HashMap::new()),
        }
    }

    async fn lookup(&self, model: &Model) -> Result<bool, String> {
        let response = self
            .client
            .post(format!("{}/api/show", self.base_url))
            .json(&serde_json::json!({"model": model.as_str()}))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status().as_u16()));
        }
        let show: ShowResponse = response.json().await.map_err(|e| e.to_string())?;
        Ok(show.supports_tools())
    }
}

#[async_trait]
impl ModelCapabilities for OllamaCapabilities {
    async fn supports_tool_calls(&self, model: &Model) -> bool {
        let cached = self
            .known
            .read()
            .ok()
            .and_then(|known| known.get(model.as_str()).copied());
        if let Some(native) = cached {
            return native;
        }
        match self.lookup(model).await {
            Ok(native) => {
                debug!("Ollama: {} native tool calls: {}", model, native);
                if let Ok(mut known) = self.known.write() {
                    known.insert(model.as_str().to_string(), native);
                }
                native
            }
            Err(e) => {
                warn!("Ollama: capability lookup for {} failed: {}", model, e);
                false
            }
        }
    }
}
