//! Playwright backend
//!
//! A single Node.js process per session runs the embedded bridge script and
//! owns one Chromium instance. Requests and responses are JSON objects, one
//! per line, on the child's stdin/stdout.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{BrowserEngine, BrowserSession, Navigation, Page};
use crate::config::{HarnessConfig, Viewport};
use crate::error::{E2eError, E2eResult};
use crate::spec::SelectorSpec;

const BRIDGE_SCRIPT: &str = include_str!("bridge.js");

/// Slack added on top of an operation's own timeout before the bridge is
/// considered unresponsive.
const BRIDGE_GRACE: Duration = Duration::from_secs(5);

/// Bridge stderr lines kept for launch error messages
const STDERR_TAIL: usize = 20;

/// Settings for the Playwright backend
#[derive(Debug, Clone)]
pub struct PlaywrightSettings {
    pub node_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub response_timeout: Duration,
    pub viewport: Viewport,
}

impl PlaywrightSettings {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            node_path: config.bridge.node_path.clone(),
            working_dir: config.bridge.working_dir.clone(),
            response_timeout: Duration::from_millis(config.timeouts.bridge_response_ms),
            viewport: config.viewport,
        }
    }
}

/// Launches Chromium through Playwright
pub struct PlaywrightEngine {
    settings: PlaywrightSettings,
}

impl PlaywrightEngine {
    pub fn new(settings: PlaywrightSettings) -> Self {
        Self { settings }
    }

    fn find_node(&self) -> E2eResult<PathBuf> {
        if let Some(path) = &self.settings.node_path {
            return Ok(path.clone());
        }
        which::which("node").map_err(|_| E2eError::NodeNotFound)
    }
}

#[async_trait]
impl BrowserEngine for PlaywrightEngine {
    async fn acquire(&self, headless: bool) -> E2eResult<Box<dyn BrowserSession>> {
        let node = self.find_node()?;
        let bridge = Bridge::start(&node, &self.settings).await?;

        let version = bridge
            .call(
                "launch",
                json!({
                    "headless": headless,
                    "viewport": {
                        "width": self.settings.viewport.width,
                        "height": self.settings.viewport.height,
                    },
                }),
                self.settings.response_timeout,
            )
            .await
            .map_err(|e| {
                let tail = bridge.stderr_tail();
                E2eError::Environment(format!("browser launch failed: {}{}", e, tail))
            })?;

        info!(
            "Launched Chromium {} (headless: {})",
            version.as_str().unwrap_or("unknown"),
            headless
        );

        Ok(Box::new(PlaywrightSession {
            bridge: Arc::new(bridge),
            released: false,
        }))
    }
}

struct PlaywrightSession {
    bridge: Arc<Bridge>,
    released: bool,
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    async fn new_page(&mut self) -> E2eResult<Box<dyn Page>> {
        let id = self
            .bridge
            .call("newPage", json!({}), self.bridge.response_timeout)
            .await
            .map_err(|e| E2eError::Environment(format!("could not open page: {}", e)))?;

        let page_id = id
            .as_str()
            .ok_or_else(|| E2eError::Bridge(format!("newPage returned {}", id)))?
            .to_string();

        debug!("Opened {}", page_id);
        Ok(Box::new(PlaywrightPage {
            bridge: Arc::clone(&self.bridge),
            page_id,
        }))
    }

    async fn release(&mut self) -> E2eResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.bridge.shutdown().await;
        Ok(())
    }
}

impl Drop for PlaywrightSession {
    fn drop(&mut self) {
        if !self.released {
            // kill_on_drop reaps the node process once the last page handle goes
            warn!("Browser session dropped without release");
        }
    }
}

struct PlaywrightPage {
    bridge: Arc<Bridge>,
    page_id: String,
}

#[derive(Debug, Deserialize)]
struct GotoResult {
    status: Option<u16>,
    url: String,
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<Navigation> {
        let result = self
            .bridge
            .call(
                "goto",
                json!({
                    "pageId": self.page_id,
                    "url": url,
                    "timeoutMs": timeout.as_millis() as u64,
                }),
                timeout + BRIDGE_GRACE,
            )
            .await
            .map_err(|e| E2eError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let result: GotoResult = serde_json::from_value(result)?;
        Ok(Navigation {
            status: result.status,
            url: result.url,
        })
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> E2eResult<()> {
        self.bridge
            .call(
                "waitForNetworkIdle",
                json!({ "pageId": self.page_id, "timeoutMs": timeout.as_millis() as u64 }),
                timeout + BRIDGE_GRACE,
            )
            .await?;
        Ok(())
    }

    async fn is_visible(&self, selector: &SelectorSpec) -> E2eResult<bool> {
        let visible = self
            .bridge
            .call(
                "isVisible",
                json!({ "pageId": self.page_id, "selector": selector }),
                self.bridge.response_timeout,
            )
            .await?;
        Ok(visible.as_bool().unwrap_or(false))
    }

    async fn click(&self, selector: &SelectorSpec, timeout: Duration) -> E2eResult<()> {
        self.bridge
            .call(
                "click",
                json!({
                    "pageId": self.page_id,
                    "selector": selector,
                    "timeoutMs": timeout.as_millis() as u64,
                }),
                timeout + BRIDGE_GRACE,
            )
            .await?;
        Ok(())
    }

    async fn screenshot(&self) -> E2eResult<Vec<u8>> {
        let encoded = self
            .bridge
            .call(
                "screenshot",
                json!({ "pageId": self.page_id, "fullPage": true }),
                self.bridge.response_timeout,
            )
            .await?;
        let encoded = encoded
            .as_str()
            .ok_or_else(|| E2eError::Bridge("screenshot returned no data".into()))?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct BridgeResponse {
    id: u64,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<BridgeErrorResponse>,
}

#[derive(Debug, Deserialize)]
struct BridgeErrorResponse {
    message: String,
}

struct BridgeIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Node.js child process speaking the bridge protocol
struct Bridge {
    child: Mutex<Option<Child>>,
    io: Mutex<BridgeIo>,
    next_id: AtomicU64,
    response_timeout: Duration,
    stderr: Arc<parking_lot::Mutex<VecDeque<String>>>,
    /// Removed from disk when the bridge is dropped
    _script: NamedTempFile,
}

impl Bridge {
    async fn start(node: &Path, settings: &PlaywrightSettings) -> E2eResult<Self> {
        let script = write_script().map_err(|e| {
            E2eError::Environment(format!("failed to write bridge script: {}", e))
        })?;

        debug!("Starting Playwright bridge: {} {}", node.display(), script.path().display());

        let mut cmd = Command::new(node);
        cmd.arg(script.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &settings.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Environment(format!("failed to spawn {}: {}", node.display(), e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Environment("bridge stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Environment("bridge stdout unavailable".into()))?;

        let tail = Arc::new(parking_lot::Mutex::new(VecDeque::with_capacity(STDERR_TAIL)));
        if let Some(stderr) = child.stderr.take() {
            let tail = Arc::clone(&tail);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!("[playwright] {}", line);
                    let mut tail = tail.lock();
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            });
        }

        let bridge = Self {
            child: Mutex::new(Some(child)),
            io: Mutex::new(BridgeIo {
                stdin,
                stdout: BufReader::new(stdout).lines(),
            }),
            next_id: AtomicU64::new(1),
            response_timeout: settings.response_timeout,
            stderr: tail,
            _script: script,
        };

        let pong = bridge
            .call("ping", json!({}), settings.response_timeout)
            .await
            .map_err(|e| {
                let tail = bridge.stderr_tail();
                E2eError::Environment(format!("bridge did not start: {}{}", e, tail))
            })?;
        if pong.as_str() != Some("pong") {
            return Err(E2eError::Environment(format!(
                "bridge answered ping with {}",
                pong
            )));
        }

        Ok(bridge)
    }

    async fn call(&self, method: &str, params: Value, timeout: Duration) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = serde_json::to_string(&BridgeRequest { id, method, params })?;
        debug!("Bridge request: {}", &request[..request.len().min(200)]);

        let mut io = self.io.lock().await;
        io.stdin.write_all(request.as_bytes()).await?;
        io.stdin.write_all(b"\n").await?;
        io.stdin.flush().await?;

        match tokio::time::timeout(timeout, read_response(&mut io, id)).await {
            Ok(result) => result,
            Err(_) => Err(E2eError::Timeout(format!(
                "bridge method {} after {} ms",
                method,
                timeout.as_millis()
            ))),
        }
    }

    /// Recent stderr output, formatted for appending to an error message
    fn stderr_tail(&self) -> String {
        let tail = self.stderr.lock();
        if tail.is_empty() {
            return String::new();
        }
        let lines: Vec<&str> = tail.iter().map(String::as_str).collect();
        format!("\n{}", lines.join("\n"))
    }

    async fn shutdown(&self) {
        if let Err(e) = self.call("close", json!({}), self.response_timeout).await {
            warn!("Browser close failed: {}", e);
        }

        if let Some(mut child) = self.child.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(2), child.wait())
                .await
                .is_err()
            {
                let _ = child.kill().await;
            }
        }
        info!("Browser session released");
    }
}

fn write_script() -> std::io::Result<NamedTempFile> {
    use std::io::Write as _;

    let mut script = tempfile::Builder::new()
        .prefix("adventure-e2e-bridge-")
        .suffix(".js")
        .tempfile()?;
    script.write_all(BRIDGE_SCRIPT.as_bytes())?;
    script.flush()?;
    Ok(script)
}

async fn read_response(io: &mut BridgeIo, id: u64) -> E2eResult<Value> {
    loop {
        let line = io
            .stdout
            .next_line()
            .await?
            .ok_or_else(|| E2eError::Bridge("bridge process exited".into()))?;

        if line.trim().is_empty() {
            continue;
        }

        let response: BridgeResponse = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Unparseable bridge output ({}): {}", e, line);
                continue;
            }
        };

        // Answers to calls that already timed out
        if response.id != id {
            debug!("Discarding stale bridge response {}", response.id);
            continue;
        }

        return match response.error {
            Some(err) => Err(E2eError::Bridge(err.message)),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
    }
}
