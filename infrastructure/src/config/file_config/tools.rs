//! Tool server configuration (`[tools]` section)
//!
//! ```toml
//! [[tools.servers]]
//! name = "fs"
//! transport = "pipe"
//! command = "fs-tool-server"
//! args = ["--root", "."]
//! tools = ["read_file", "glob_search"]
//!
//! [[tools.servers]]
//! name = "remote-grep"
//! transport = "http"
//! url = "http://127.0.0.1:8931/rpc"
//! headers = { Authorization = "Bearer local-dev" }
//! call_timeout_secs = 10
//! tools = ["grep_search"]
//! ```

use crate::tool_protocol::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_STARTUP_TIMEOUT, ToolServerConfig, TransportConfig,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileTransportKind {
    #[default]
    Pipe,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolServerConfig {
    pub name: String,
    pub transport: FileTransportKind,
    /// Pipe: program to spawn
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    /// Http: endpoint receiving JSON-RPC POSTs
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub call_timeout_secs: u64,
    pub startup_timeout_secs: u64,
    /// Local tool names (or aliases) this server takes over
    pub tools: Vec<String>,
}

impl Default for FileToolServerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            transport: FileTransportKind::Pipe,
            command: String::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            url: String::new(),
            headers: BTreeMap::new(),
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT.as_secs(),
            tools: Vec::new(),
        }
    }
}

impl FileToolServerConfig {
    pub fn to_server_config(&self) -> ToolServerConfig {
        let transport = match self.transport {
            FileTransportKind::Pipe => TransportConfig::Pipe {
                command: self.command.clone(),
                args: self.args.clone(),
                env: self.env.clone(),
                cwd: self.cwd.clone(),
            },
            FileTransportKind::Http => TransportConfig::Http {
                url: self.url.clone(),
                headers: self.headers.clone(),
            },
        };
        ToolServerConfig::new(self.name.clone(), transport)
            .with_call_timeout(Duration::from_secs(self.call_timeout_secs))
            .with_startup_timeout(Duration::from_secs(self.startup_timeout_secs))
            .serving(self.tools.iter().cloned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub servers: Vec<FileToolServerConfig>,
}

impl FileToolsConfig {
    pub fn to_server_configs(&self) -> Vec<ToolServerConfig> {
        self.servers.iter().map(|s| s.to_server_config()).collect()
    }
}
