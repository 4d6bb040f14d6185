//! The production automation surface: a Chrome DevTools Protocol session.
//!
//! One `CdpSurface` is one page target on a browser started with
//! `--remote-debugging-port`. Commands go out over a WebSocket and responses
//! are routed back by id through a pending map; element probes and actions
//! are JavaScript snippets evaluated in the page (see `script`).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::driver::DeviceProfile;
use crate::errors::DriveError;
use crate::script;
use crate::selector::Selector;
use crate::surface::{ElementState, Surface, WaitUntil};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_millis(200);
// How long the network must stay quiet after load for NetworkIdle
const NETWORK_QUIET: Duration = Duration::from_millis(500);

type CommandResult = Result<Value, String>;
type PendingMap = HashMap<u64, oneshot::Sender<CommandResult>>;
type Pending = Arc<Mutex<PendingMap>>;

#[derive(Debug, Deserialize)]
struct Incoming {
    id: Option<u64>,
    result: Option<Value>,
    error: Option<IncomingError>,
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IncomingError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TargetDescription {
    id: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: String,
}

pub struct CdpSurface {
    sender: mpsc::UnboundedSender<Message>,
    pending: Pending,
    next_id: AtomicU64,
    endpoint: String,
    target_id: String,
    download_dir: PathBuf,
    http: reqwest::Client,
    closed: AtomicBool,
    _reader_task: JoinHandle<()>,
}

impl CdpSurface {
    /// Attach to a browser debugging endpoint (e.g. `http://127.0.0.1:9222`),
    /// create a fresh page target and apply the device profile. Failure at
    /// any point here is `SurfaceUnavailable`: there is no session to drive.
    pub async fn connect(
        endpoint: &str,
        profile: &DeviceProfile,
        download_dir: &Path,
    ) -> Result<Self, DriveError> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let http = reqwest::Client::new();

        let target: TargetDescription = http
            .put(format!("{endpoint}/json/new?about:blank"))
            .send()
            .await
            .map_err(|e| {
                DriveError::SurfaceUnavailable(format!(
                    "cannot reach debugging endpoint {endpoint}: {e}"
                ))
            })?
            .error_for_status()
            .map_err(|e| DriveError::SurfaceUnavailable(format!("target creation rejected: {e}")))?
            .json()
            .await
            .map_err(|e| {
                DriveError::SurfaceUnavailable(format!("malformed target description: {e}"))
            })?;

        let (ws_stream, _) = connect_async(target.web_socket_debugger_url.as_str())
            .await
            .map_err(|e| DriveError::SurfaceUnavailable(format!("websocket attach failed: {e}")))?;
        info!(target = %target.id, "devtools session attached");

        let (mut sink, mut stream) = ws_stream.split();
        let (sender, mut outgoing) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        // writer task
        tokio::spawn(async move {
            while let Some(msg) = outgoing.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("ws send error: {e}");
                    break;
                }
            }
        });

        // reader loop: route responses by id, log events
        let reader_pending = pending.clone();
        let reader_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                if !msg.is_text() {
                    continue;
                }
                let txt = msg.into_text().unwrap_or_default();
                match serde_json::from_str::<Incoming>(&txt) {
                    Ok(incoming) => {
                        if let Some(id) = incoming.id {
                            if let Some(tx) = reader_pending.lock().await.remove(&id) {
                                let _ = tx.send(match incoming.error {
                                    Some(err) => Err(err.message),
                                    None => Ok(incoming.result.unwrap_or(Value::Null)),
                                });
                            }
                        } else if let Some(method) = incoming.method {
                            debug!(method = %method, "protocol event");
                        }
                    }
                    Err(e) => warn!("invalid protocol message: {e}"),
                }
            }
            debug!("devtools socket closed");
        });

        let surface = Self {
            sender,
            pending,
            next_id: AtomicU64::new(1),
            endpoint,
            target_id: target.id,
            download_dir: download_dir.to_path_buf(),
            http,
            closed: AtomicBool::new(false),
            _reader_task: reader_task,
        };
        surface.apply_profile(profile).await?;
        Ok(surface)
    }

    async fn apply_profile(&self, profile: &DeviceProfile) -> Result<(), DriveError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                DriveError::SurfaceUnavailable(format!(
                    "cannot create download dir {}: {e}",
                    self.download_dir.display()
                ))
            })?;

        self.command("Page.enable", json!({})).await?;
        self.command(
            "Emulation.setDeviceMetricsOverride",
            json!({
                "width": profile.width,
                "height": profile.height,
                "deviceScaleFactor": 1,
                "mobile": profile.mobile,
            }),
        )
        .await?;
        if let Some(user_agent) = &profile.user_agent {
            self.command(
                "Emulation.setUserAgentOverride",
                json!({ "userAgent": user_agent }),
            )
            .await?;
        }
        self.command(
            "Page.setDownloadBehavior",
            json!({
                "behavior": "allow",
                "downloadPath": self.download_dir.to_string_lossy(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn command(&self, method: &str, params: Value) -> Result<Value, DriveError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel::<CommandResult>();
        self.pending.lock().await.insert(id, tx);

        let payload = json!({ "id": id, "method": method, "params": params }).to_string();
        if self.sender.send(Message::Text(payload)).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(DriveError::SurfaceUnavailable(
                "devtools socket is gone".to_string(),
            ));
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => Err(DriveError::Protocol(format!("{method}: {message}"))),
            Ok(Err(_canceled)) => Err(DriveError::SurfaceUnavailable(
                "devtools socket closed mid-command".to_string(),
            )),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                Err(DriveError::Timeout(format!(
                    "no response to {method} within {COMMAND_TIMEOUT:?}"
                )))
            }
        }
    }

    /// Evaluate an expression in the page, returning its value. A destroyed
    /// execution context (mid-navigation race) surfaces as `StaleElement` so
    /// the driver loop retries on the next poll.
    async fn eval(&self, expression: &str) -> Result<Value, DriveError> {
        let result = self
            .command(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await
            .map_err(|e| match e {
                DriveError::Protocol(msg) if msg.contains("context") => {
                    DriveError::StaleElement(msg)
                }
                other => other,
            })?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown evaluation failure");
            return Err(DriveError::StaleElement(format!(
                "page evaluation failed: {text}"
            )));
        }
        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    /// Run an element script and fail with `ElementNotFound` when the
    /// resolver came up empty.
    async fn element_op(&self, selector: &Selector, script: String) -> Result<Value, DriveError> {
        let value = self.eval(&script).await?;
        if value.get("found").and_then(Value::as_bool) == Some(false) {
            return Err(DriveError::ElementNotFound(selector.to_string()));
        }
        Ok(value)
    }

    async fn ready_state(&self) -> Result<Option<String>, DriveError> {
        match self.eval(script::READY_STATE).await {
            Ok(Value::String(state)) => Ok(Some(state)),
            Ok(_) => Ok(None),
            // context churn right after navigation; not ready yet
            Err(e) if e.is_transient() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_downloads(&self) -> Result<HashSet<PathBuf>, DriveError> {
        let mut entries = HashSet::new();
        let mut dir = tokio::fs::read_dir(&self.download_dir).await.map_err(|e| {
            DriveError::Protocol(format!(
                "cannot read download dir {}: {e}",
                self.download_dir.display()
            ))
        })?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| DriveError::Protocol(format!("download dir entry unreadable: {e}")))?
        {
            entries.insert(entry.path());
        }
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl Surface for CdpSurface {
    async fn navigate(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), DriveError> {
        info!(url, ?wait, "navigating");
        let result = self.command("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = result.get("errorText").and_then(Value::as_str) {
            if !error_text.is_empty() {
                return Err(DriveError::SurfaceUnavailable(format!(
                    "navigation to {url} failed: {error_text}"
                )));
            }
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(state) = self.ready_state().await? {
                let arrived = match wait {
                    WaitUntil::DomContentLoaded => state == "interactive" || state == "complete",
                    WaitUntil::Load | WaitUntil::NetworkIdle => state == "complete",
                };
                if arrived {
                    if wait == WaitUntil::NetworkIdle {
                        tokio::time::sleep(NETWORK_QUIET).await;
                    }
                    return Ok(());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriveError::Timeout(format!(
                    "page did not reach {wait:?} within {timeout:?} at {url}"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool, DriveError> {
        let value = self.eval(&script::is_visible(selector)?).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn content(&self) -> Result<String, DriveError> {
        match self.eval(script::PAGE_CONTENT).await? {
            Value::String(html) => Ok(html),
            other => Err(DriveError::Protocol(format!(
                "unexpected content payload: {other}"
            ))),
        }
    }

    async fn current_url(&self) -> Result<String, DriveError> {
        match self.eval(script::CURRENT_URL).await? {
            Value::String(url) => Ok(url),
            other => Err(DriveError::Protocol(format!(
                "unexpected url payload: {other}"
            ))),
        }
    }

    async fn fill(&self, selector: &Selector, value: &str) -> Result<(), DriveError> {
        self.element_op(selector, script::fill(selector, value)?)
            .await?;
        Ok(())
    }

    async fn click(&self, selector: &Selector, force: bool) -> Result<(), DriveError> {
        let value = self
            .element_op(selector, script::click(selector, force)?)
            .await?;
        if value.get("clicked").and_then(Value::as_bool) == Some(false) {
            return Err(DriveError::StaleElement(format!(
                "{selector} was not visible at click time"
            )));
        }
        Ok(())
    }

    async fn set_checked(&self, selector: &Selector, checked: bool) -> Result<(), DriveError> {
        self.element_op(selector, script::set_checked(selector, checked)?)
            .await?;
        Ok(())
    }

    async fn wait_for_url(
        &self,
        pattern: &regex::Regex,
        timeout: Duration,
    ) -> Result<String, DriveError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut last_seen = String::new();
        loop {
            match self.current_url().await {
                Ok(url) => {
                    if pattern.is_match(&url) {
                        return Ok(url);
                    }
                    last_seen = url;
                }
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriveError::Timeout(format!(
                    "url did not match /{pattern}/ within {timeout:?} (last seen: {last_seen})"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_element(
        &self,
        selector: &Selector,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), DriveError> {
        let probe = script::element_state(selector)?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.eval(&probe).await {
                Ok(value) => {
                    let found = value.get("found").and_then(Value::as_bool).unwrap_or(false);
                    let visible = value.get("visible").and_then(Value::as_bool).unwrap_or(false);
                    let arrived = match state {
                        ElementState::Attached => found,
                        ElementState::Visible => visible,
                        ElementState::Detached => !found,
                    };
                    if arrived {
                        return Ok(());
                    }
                }
                Err(e) if e.is_transient() => {}
                Err(e) => return Err(e),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriveError::Timeout(format!(
                    "{selector} did not become {state:?} within {timeout:?}"
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn await_download(
        &self,
        trigger: &Selector,
        timeout: Duration,
    ) -> Result<PathBuf, DriveError> {
        let before = self.list_downloads().await?;
        self.click(trigger, false).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let now = self.list_downloads().await?;
            let fresh = now.difference(&before).find(|path| {
                path.extension().map(|ext| ext != "crdownload").unwrap_or(true)
            });
            if let Some(path) = fresh {
                info!(path = %path.display(), "download completed");
                return Ok(path.clone());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(DriveError::Timeout(format!(
                    "no download completed within {timeout:?} after clicking {trigger}"
                )));
            }
            tokio::time::sleep(DOWNLOAD_POLL_INTERVAL).await;
        }
    }

    async fn dispatch_event(&self, event_name: &str) -> Result<(), DriveError> {
        self.eval(&script::dispatch_event(event_name)?).await?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriveError> {
        self.eval(expression).await
    }

    async fn screenshot(&self, path: &Path) -> Result<(), DriveError> {
        let result = self
            .command("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let data = result
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| DriveError::Protocol("screenshot payload missing".to_string()))?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| DriveError::Protocol(format!("screenshot decode: {e}")))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DriveError::Protocol(format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| DriveError::Protocol(format!("cannot write {}: {e}", path.display())))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), DriveError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Best-effort teardown over the HTTP endpoint; the socket tasks end
        // when the target goes away.
        let url = format!("{}/json/close/{}", self.endpoint, self.target_id);
        match self.http.get(&url).send().await {
            Ok(_) => debug!(target = %self.target_id, "target closed"),
            Err(e) => debug!(error = %e, "target close skipped"),
        }
        Ok(())
    }
}
