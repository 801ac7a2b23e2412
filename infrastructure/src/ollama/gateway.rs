//! [`LlmGateway`] over a local Ollama server

use super::session::{OllamaSession, check_status, request_error};
use super::types::{DEFAULT_BASE_URL, TagsResponse};
use async_trait::async_trait;
use foreman_application::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use foreman_domain::Model;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
    /// Last successful `/api/tags` answer
    models: RwLock<Option<Vec<Model>>>,
}

impl OllamaGateway {
    /// Gateway for `base_url` (e.g. `http://localhost:11434`).
    ///
    /// Only connecting is time-limited here; how long a reply may stream is
    /// governed by the per-agent timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Other(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            models: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn cached_models(&self) -> Option<Vec<Model>> {
        self.models.read().ok().and_then(|cache| cache.clone())
    }

    /// Whether a model from the cached list matches `model`; `None` before
    /// the first successful listing. `name` and `name:latest` are the same
    /// model.
    fn is_known(&self, model: &Model) -> Option<bool> {
        let cache = self.models.read().ok()?;
        let models = cache.as_ref()?;
        let wanted = model.as_str();
        Some(models.iter().any(|m| {
            m.as_str() == wanted || m.as_str().strip_suffix(":latest") == Some(wanted)
        }))
    }
}

impl Default for OllamaGateway {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: RwLock::new(None),
        }
    }
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    async fn create_session(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        if self.is_known(model) == Some(false) {
            return Err(GatewayError::ModelNotAvailable(format!(
                "{} is not pulled on {}",
                model, self.base_url
            )));
        }
        Ok(Box::new(OllamaSession::new(
            self.client.clone(),
            &self.base_url,
            model.clone(),
            system_prompt,
        )))
    }

    async fn available_models(&self) -> Result<Vec<Model>, GatewayError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| request_error(e, &self.base_url))?;
        let response = check_status(response, &Model::new("*")).await?;
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::RequestFailed(format!("invalid /api/tags body: {}", e)))?;

        let models: Vec<Model> = tags.models.into_iter().map(|t| Model::new(t.name)).collect();
        debug!("Ollama: {} model(s) available", models.len());
        if let Ok(mut cache) = self.models.write() {
            if cache.is_none() {
                info!("Ollama: connected to {}", self.base_url);
            }
            *cache = Some(models.clone());
        }
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::test_server::{Reply, TestServer};
    use foreman_domain::{StreamEvent, ToolCall};
    use serde_json::json;

    #[tokio::test]
    async fn test_unreachable_backend_is_connection_error() {
        let gateway = OllamaGateway::new("http://127.0.0.1:1").unwrap();
        let err = gateway.available_models().await.unwrap_err();
        assert!(err.is_unreachable(), "got {:?}", err);
        assert!(gateway.cached_models().is_none());
    }

    #[tokio::test]
    async fn test_lists_and_caches_models() {
        let server = TestServer::start(vec![Reply::json(
            json!({"models": [{"name": "qwen2.5-coder:7b"}, {"name": "llama3.2:latest"}]}),
        )])
        .await;
        let gateway = OllamaGateway::new(server.url()).unwrap();

        let models = gateway.available_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(gateway.cached_models().unwrap(), models);

        assert!(gateway.create_session(&Model::new("llama3.2"), "").await.is_ok());
        let missing = gateway.create_session(&Model::new("mistral:7b"), "").await;
        assert!(matches!(missing, Err(GatewayError::ModelNotAvailable(_))));
        assert_eq!(server.requests().await[0].path, "/api/tags");
    }

    #[tokio::test]
    async fn test_streams_deltas_and_tool_calls_then_keeps_history() {
        let server = TestServer::start(vec![
            Reply::ndjson(vec![
                json!({"message": {"role": "assistant", "content": "", "tool_calls": [
                    {"function": {"name": "read_file", "arguments": {"path": "src/lib.rs"}}}
                ]}, "done": false}),
                json!({"message": {"role": "assistant", "content": "Reading"}, "done": false}),
                json!({"message": {"role": "assistant", "content": " now"}, "done": true}),
            ]),
            Reply::json(json!({"message": {"role": "assistant", "content": "done"}, "done": true})),
        ])
        .await;
        let gateway = OllamaGateway::new(server.url()).unwrap();
        let session = gateway
            .create_session(&Model::new("qwen2.5-coder:7b"), "You are an explorer agent")
            .await
            .unwrap();

        let handle = session
            .send_streaming("inspect lib.rs", &[json!({"type": "function"})])
            .await
            .unwrap();
        let mut events = Vec::new();
        let mut rx = handle.receiver;
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                StreamEvent::ToolCall(ToolCall::new("read_file").with_arg("path", "src/lib.rs")),
                StreamEvent::Delta("Reading".into()),
                StreamEvent::Delta(" now".into()),
                StreamEvent::Completed("Reading now".into()),
            ]
        );

        // the channel closes only after the exchange is in the history
        assert_eq!(session.send("thanks").await.unwrap(), "done");

        let requests = server.requests().await;
        assert_eq!(requests[0].path, "/api/chat");
        assert_eq!(requests[0].body["stream"], true);
        assert_eq!(requests[0].body["tools"].as_array().unwrap().len(), 1);
        let second = requests[1].body["messages"].as_array().unwrap();
        let roles: Vec<&str> = second.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(second[2]["tool_calls"][0]["function"]["name"], "read_file");
        assert!(requests[1].body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_missing_model_maps_to_model_not_available() {
        let server = TestServer::start(vec![Reply::status(
            404,
            json!({"error": "model 'nope' not found, try pulling it first"}),
        )])
        .await;
        let gateway = OllamaGateway::new(server.url()).unwrap();
        let session = gateway.create_session(&Model::new("nope"), "").await.unwrap();
        let err = session.send("hi").await.unwrap_err();
        assert!(matches!(err, GatewayError::ModelNotAvailable(m) if m.contains("not found")));
    }

    #[tokio::test]
    async fn test_error_chunk_surfaces_as_stream_error() {
        let server = TestServer::start(vec![Reply::ndjson(vec![
            json!({"message": {"role": "assistant", "content": "par"}, "done": false}),
            json!({"error": "out of memory"}),
        ])])
        .await;
        let gateway = OllamaGateway::new(server.url()).unwrap();
        let session = gateway.create_session(&Model::new("m"), "").await.unwrap();
        let handle = session.send_streaming("go", &[]).await.unwrap();
        let err = handle.collect_text().await.unwrap_err();
        assert!(matches!(err, GatewayError::RequestFailed(m) if m == "out of memory"));
    }
}
