//! Ollama backend adapter: chat sessions, model listing, and tool-calling
//! capability lookup over the local HTTP API.

mod capabilities;
mod gateway;
mod session;
#[cfg(test)]
mod test_server;
mod types;

pub use capabilities::OllamaCapabilities;
pub use gateway::OllamaGateway;
pub use session::OllamaSession;
pub use types::DEFAULT_BASE_URL;
