//! The catalog of recognized application states.
//!
//! Each state pairs a cheap, side-effect-free probe with the action that
//! advances past it. Catalog order is the tie-break when probes could
//! overlap textually, so authors list states most-specific-first.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::DriveError;
use crate::selector::Selector;
use crate::Session;

/// A side-effect-free check for whether a state currently matches the
/// rendered content.
#[derive(Debug, Clone)]
pub enum Probe {
    /// An element matching the selector is visible
    Visible(Selector),
    /// The serialized page content contains a literal substring. Fallback
    /// for content that structured probing cannot reach.
    ContentContains(String),
}

impl Probe {
    pub async fn matches(&self, session: &Session) -> Result<bool, DriveError> {
        match self {
            Probe::Visible(selector) => session.is_visible(selector).await,
            Probe::ContentContains(needle) => {
                Ok(session.content().await?.contains(needle.as_str()))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Probe::Visible(selector) => format!("visible: {selector}"),
            Probe::ContentContains(needle) => format!("content contains: {needle:?}"),
        }
    }
}

/// One primitive operation inside a state's action. Actions must stay safe
/// to re-issue: the loop can re-detect a state whose transition has not
/// finished rendering yet.
#[derive(Debug, Clone)]
pub enum Op {
    Fill { selector: Selector, value: String },
    Click { selector: Selector, force: bool },
    /// Click only when present and visible, otherwise skip silently
    ClickIfVisible { selector: Selector },
    Check { selector: Selector },
    /// Click `trigger` and wait for the file transfer it starts. Download
    /// failures are logged and skipped; the state transition does not
    /// depend on the artifact landing.
    Download { trigger: Selector, timeout: Duration },
    Sleep(Duration),
}

/// A named member of the state catalog.
#[derive(Debug, Clone)]
pub struct AppState {
    name: String,
    probe: Probe,
    action: Vec<Op>,
}

impl AppState {
    pub fn new(name: impl Into<String>, probe: Probe, action: Vec<Op>) -> Self {
        Self {
            name: name.into(),
            probe,
            action,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probe(&self) -> &Probe {
        &self.probe
    }

    /// Execute this state's action, returning any downloaded artifacts.
    pub async fn perform(&self, session: &Session) -> Result<Vec<PathBuf>, DriveError> {
        let mut artifacts = Vec::new();
        for op in &self.action {
            match op {
                Op::Fill { selector, value } => session.fill(selector, value).await?,
                Op::Click { selector, force } => session.click(selector, *force).await?,
                Op::ClickIfVisible { selector } => {
                    if session.is_visible(selector).await? {
                        session.click(selector, false).await?;
                    } else {
                        debug!(selector = %selector, "optional control absent, skipping");
                    }
                }
                Op::Check { selector } => session.set_checked(selector, true).await?,
                Op::Download { trigger, timeout } => {
                    match session.await_download(trigger, *timeout).await {
                        Ok(path) => {
                            debug!(path = %path.display(), "download captured");
                            artifacts.push(path);
                        }
                        Err(e) => {
                            warn!(error = %e, "download skipped or failed");
                        }
                    }
                }
                Op::Sleep(delay) => tokio::time::sleep(*delay).await,
            }
        }
        Ok(artifacts)
    }
}

/// Ordered states plus the terminal conditions that stop the loop.
#[derive(Debug, Clone, Default)]
pub struct StateCatalog {
    terminals: Vec<Probe>,
    states: Vec<AppState>,
}

impl StateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a terminal condition. Terminals are always evaluated before
    /// state probes, in the order they were added.
    pub fn terminal(mut self, probe: Probe) -> Self {
        self.terminals.push(probe);
        self
    }

    pub fn state(mut self, state: AppState) -> Self {
        self.states.push(state);
        self
    }

    pub fn terminals(&self) -> &[Probe] {
        &self.terminals
    }

    pub fn states(&self) -> &[AppState] {
        &self.states
    }

    /// Whether any terminal condition currently matches.
    pub async fn any_terminal(&self, session: &Session) -> Result<bool, DriveError> {
        for probe in &self.terminals {
            if probe.matches(session).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
