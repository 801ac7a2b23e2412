//! Tool server configuration as the protocol client consumes it

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How to reach a tool server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    /// Child process speaking newline-framed JSON-RPC over stdin/stdout
    Pipe {
        command: String,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        cwd: Option<PathBuf>,
    },
    /// JSON-RPC over HTTP POST, one request per call
    Http {
        url: String,
        headers: BTreeMap<String, String>,
    },
}

impl TransportConfig {
    pub fn pipe(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TransportConfig::Pipe {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        TransportConfig::Http {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Pipe { .. } => "pipe",
            TransportConfig::Http { .. } => "http",
        }
    }
}

/// One configured tool server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolServerConfig {
    /// Unique name, used in logs and tool result metadata
    pub name: String,
    pub transport: TransportConfig,
    pub call_timeout: Duration,
    pub startup_timeout: Duration,
    /// Local tool names this server takes over
    pub tools: Vec<String>,
}

impl ToolServerConfig {
    pub fn new(name: impl Into<String>, transport: TransportConfig) -> Self {
        Self {
            name: name.into(),
            transport,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            tools: Vec::new(),
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn serving(mut self, tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }
}
