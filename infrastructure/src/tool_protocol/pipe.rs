//! Child-process transport: JSON-RPC lines over the child's stdin/stdout

use super::connection::LineConnection;
use super::error::{Result, ToolProtocolError};
use super::message::JsonRpcRequest;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// How long a child may take to exit after its stdin closes
const STOP_GRACE: Duration = Duration::from_secs(2);

pub struct PipeTransport {
    server: String,
    connection: LineConnection,
    child: Mutex<Option<Child>>,
}

pub struct PipeCommand<'a> {
    pub program: &'a str,
    pub args: &'a [String],
    pub env: &'a BTreeMap<String, String>,
    pub cwd: Option<&'a Path>,
}

impl PipeTransport {
    pub fn spawn(server: &str, spec: PipeCommand<'_>) -> Result<Self> {
        debug!("ToolServer[{}]: spawning {} {:?}", server, spec.program, spec.args);

        let mut cmd = Command::new(spec.program);
        cmd.args(spec.args)
            .envs(spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = spec.cwd {
            cmd.current_dir(dir);
        }

        // Linux: the kernel sends SIGTERM to the child if we die without
        // running Drop (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|e| ToolProtocolError::Startup {
            server: server.to_string(),
            reason: format!("failed to spawn '{}': {}", spec.program, e),
        })?;

        let missing = |what: &str| ToolProtocolError::Startup {
            server: server.to_string(),
            reason: format!("child {} not captured", what),
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
        if let Some(stderr) = child.stderr.take() {
            let name = server.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("ToolServer[{}] stderr: {}", name, line);
                }
            });
        }

        Ok(Self {
            server: server.to_string(),
            connection: LineConnection::new(server, stdout, stdin),
            child: Mutex::new(Some(child)),
        })
    }

    pub async fn call(&self, request: JsonRpcRequest, timeout: Duration) -> Result<Value> {
        self.connection.call(request, timeout).await
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Close stdin, give the child [`STOP_GRACE`] to exit, then kill it.
    pub async fn stop(&self) {
        self.connection.close_input().await;
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("ToolServer[{}]: exited with {}", self.server, status),
            Ok(Err(e)) => warn!("ToolServer[{}]: wait failed: {}", self.server, e),
            Err(_) => {
                warn!(
                    "ToolServer[{}]: still running after {:?}, killing",
                    self.server, STOP_GRACE
                );
                if let Err(e) = child.kill().await {
                    warn!("ToolServer[{}]: kill failed: {}", self.server, e);
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    const SHORT: Duration = Duration::from_millis(500);

    #[tokio::test]
    async fn test_spawn_failure_is_startup_error() {
        let args = Vec::new();
        let env = BTreeMap::new();
        let result = PipeTransport::spawn(
            "ghost",
            PipeCommand {
                program: "/nonexistent/tool-server",
                args: &args,
                env: &env,
                cwd: None,
            },
        );
        assert!(matches!(result, Err(ToolProtocolError::Startup { .. })));
    }

    #[tokio::test]
    async fn test_silent_child_times_out_and_stops() {
        let args = vec!["30".to_string()];
        let env = BTreeMap::new();
        let transport = PipeTransport::spawn(
            "sleeper",
            PipeCommand {
                program: "sleep",
                args: &args,
                env: &env,
                cwd: None,
            },
        )
        .unwrap();

        let err = transport
            .call(JsonRpcRequest::new(1, "initialize", Some(json!({}))), SHORT)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolProtocolError::Timeout { .. }));

        // sleep ignores stdin closing, so this exercises the kill path
        transport.stop().await;
        assert!(transport.child.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_child_exit_closes_transport() {
        let args = vec!["-c".to_string(), "read line; exit 0".to_string()];
        let env = BTreeMap::new();
        let transport = PipeTransport::spawn(
            "quitter",
            PipeCommand {
                program: "sh",
                args: &args,
                env: &env,
                cwd: None,
            },
        )
        .unwrap();

        let err = transport
            .call(JsonRpcRequest::new(1, "tools/list", None), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolProtocolError::Connection(_)));
        assert!(transport.is_closed());
        transport.stop().await;
    }
}
