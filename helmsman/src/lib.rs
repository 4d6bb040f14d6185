//! Steering asynchronously-rendering web applications toward a goal state
//!
//! This crate drives an opaque client application through a multi-step
//! onboarding workflow, inspired by Playwright's web automation model: poll
//! the observable state, pick the matching recovery action, apply it,
//! re-poll, and fail loudly when the iteration budget runs out.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use tracing::instrument;

pub mod artifact;
pub mod catalog;
pub mod cdp;
pub mod driver;
pub mod errors;
pub mod script;
pub mod selector;
pub mod step;
pub mod surface;
#[cfg(test)]
mod tests;
pub mod verify;

pub use artifact::{record, RunReport};
pub use catalog::{AppState, Op, Probe, StateCatalog};
pub use cdp::CdpSurface;
pub use driver::{drive, Credentials, DeviceProfile, DriverConfig, Outcome, RunResult};
pub use errors::DriveError;
pub use selector::Selector;
pub use step::StepOutcome;
pub use surface::{ElementState, Surface, WaitUntil};
pub use verify::{verify, Assertion, VerifyOp};

/// One browsing session against the application under test.
///
/// Each run owns exactly one `Session`, acquired at run start and closed
/// unconditionally at run end; sessions are never shared across runs.
#[derive(Clone)]
pub struct Session {
    surface: Arc<dyn Surface>,
}

impl Session {
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self { surface }
    }

    #[instrument(skip(self))]
    pub async fn navigate(
        &self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> Result<(), DriveError> {
        self.surface.navigate(url, wait, timeout).await
    }

    pub async fn is_visible(&self, selector: &Selector) -> Result<bool, DriveError> {
        self.surface.is_visible(selector).await
    }

    pub async fn content(&self) -> Result<String, DriveError> {
        self.surface.content().await
    }

    pub async fn current_url(&self) -> Result<String, DriveError> {
        self.surface.current_url().await
    }

    #[instrument(skip(self, value))]
    pub async fn fill(&self, selector: &Selector, value: &str) -> Result<(), DriveError> {
        self.surface.fill(selector, value).await
    }

    #[instrument(skip(self))]
    pub async fn click(&self, selector: &Selector, force: bool) -> Result<(), DriveError> {
        self.surface.click(selector, force).await
    }

    #[instrument(skip(self))]
    pub async fn set_checked(&self, selector: &Selector, checked: bool) -> Result<(), DriveError> {
        self.surface.set_checked(selector, checked).await
    }

    pub async fn wait_for_url(
        &self,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<String, DriveError> {
        self.surface.wait_for_url(pattern, timeout).await
    }

    pub async fn wait_for_element(
        &self,
        selector: &Selector,
        state: ElementState,
        timeout: Duration,
    ) -> Result<(), DriveError> {
        self.surface.wait_for_element(selector, state, timeout).await
    }

    #[instrument(skip(self))]
    pub async fn await_download(
        &self,
        trigger: &Selector,
        timeout: Duration,
    ) -> Result<PathBuf, DriveError> {
        self.surface.await_download(trigger, timeout).await
    }

    #[instrument(skip(self))]
    pub async fn dispatch_event(&self, event_name: &str) -> Result<(), DriveError> {
        self.surface.dispatch_event(event_name).await
    }

    pub async fn evaluate(&self, expression: &str) -> Result<serde_json::Value, DriveError> {
        self.surface.evaluate(expression).await
    }

    pub async fn screenshot(&self, path: &Path) -> Result<(), DriveError> {
        self.surface.screenshot(path).await
    }

    pub async fn close(&self) -> Result<(), DriveError> {
        self.surface.close().await
    }
}
