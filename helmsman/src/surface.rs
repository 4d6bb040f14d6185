use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::errors::DriveError;
use crate::selector::Selector;

/// How long a navigation waits before the page counts as arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// DOM parsed, subresources may still be loading
    DomContentLoaded,
    /// Load event fired
    Load,
    /// Load event fired and the network has gone quiet
    NetworkIdle,
}

/// Target state for element waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Present in the DOM
    Attached,
    /// Present and visible
    Visible,
    /// Removed from the DOM
    Detached,
}

/// The narrow contract the driver consumes to observe and manipulate the
/// client application. One implementation per session kind; each run owns
/// exactly one session and closes it at run end.
#[async_trait::async_trait]
pub trait Surface: Send + Sync {
    /// Navigate the page and wait for the given readiness condition.
    async fn navigate(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), DriveError>;

    /// Side-effect-free visibility probe. Returns `Ok(false)` when the
    /// element is absent; errors only on surface plumbing failures.
    async fn is_visible(&self, selector: &Selector) -> Result<bool, DriveError>;

    /// Full serialized page content, for substring probes.
    async fn content(&self) -> Result<String, DriveError>;

    async fn current_url(&self) -> Result<String, DriveError>;

    /// Fill an input with a value, replacing any existing content.
    async fn fill(&self, selector: &Selector, value: &str) -> Result<(), DriveError>;

    /// Click an element. `force` skips the visibility check.
    async fn click(&self, selector: &Selector, force: bool) -> Result<(), DriveError>;

    /// Set a checkbox/toggle to the requested state. Re-issuing with the
    /// same state is a no-op.
    async fn set_checked(&self, selector: &Selector, checked: bool) -> Result<(), DriveError>;

    /// Wait until the page URL matches `pattern`, returning the matched URL.
    async fn wait_for_url(&self, pattern: &Regex, timeout: Duration)
        -> Result<String, DriveError>;

    /// Wait until the element reaches `state`.
    async fn wait_for_element(
        &self,
        selector: &Selector,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), DriveError>;

    /// Click `trigger` and wait for the file transfer it starts to finish,
    /// returning the downloaded file's path.
    async fn await_download(
        &self,
        trigger: &Selector,
        timeout: Duration,
    ) -> Result<PathBuf, DriveError>;

    /// Dispatch a synthetic window event by name.
    async fn dispatch_event(&self, event_name: &str) -> Result<(), DriveError>;

    /// Evaluate a JavaScript expression in the page, awaiting promises.
    async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, DriveError>;

    /// Capture a visual snapshot of the current rendered content.
    async fn screenshot(&self, path: &Path) -> Result<(), DriveError>;

    /// Release the session. Safe to call more than once.
    async fn close(&self) -> Result<(), DriveError>;
}
