//! End-of-run diagnostics.
//!
//! Whatever the outcome, each run leaves behind a visual snapshot and a
//! structured summary line so failures are diagnosable without re-running.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::driver::{Outcome, RunResult};
use crate::Session;

/// The structured summary emitted at run end.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run: String,
    pub outcome: Outcome,
    pub iterations: u32,
    pub artifacts: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_assertion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(run: impl Into<String>, result: &RunResult) -> Self {
        Self {
            run: run.into(),
            outcome: result.outcome,
            iterations: result.iterations,
            artifacts: result.artifacts.clone(),
            failed_assertion: None,
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// A report for a run that failed before any loop iteration ran
    /// (e.g. session acquisition).
    pub fn aborted(run: impl Into<String>, error: &crate::errors::DriveError) -> Self {
        Self {
            run: run.into(),
            outcome: Outcome::Error,
            iterations: 0,
            artifacts: Vec::new(),
            failed_assertion: None,
            error: Some(error.to_string()),
        }
    }

    /// A report for a one-shot check with no driver loop behind it.
    pub fn from_check(
        run: impl Into<String>,
        check: &Result<(), crate::errors::DriveError>,
    ) -> Self {
        let mut report = Self {
            run: run.into(),
            outcome: Outcome::Success,
            iterations: 0,
            artifacts: Vec::new(),
            failed_assertion: None,
            error: None,
        };
        match check {
            Ok(()) => {}
            Err(crate::errors::DriveError::AssertionFailed { assertion, observed }) => {
                report.outcome = Outcome::Error;
                report.failed_assertion = Some(assertion.clone());
                report.error = Some(observed.clone());
            }
            Err(e) => {
                report.outcome = Outcome::Error;
                report.error = Some(e.to_string());
            }
        }
        report
    }

    pub fn with_assertion_failure(mut self, assertion: impl Into<String>) -> Self {
        self.failed_assertion = Some(assertion.into());
        self.outcome = Outcome::Error;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success && self.failed_assertion.is_none()
    }

    /// Emit the summary line. Kept separate from `record` for runs that
    /// never got a surface to capture from.
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(summary) => info!(summary = %summary, "run finished"),
            Err(e) => warn!(error = %e, "could not serialize run summary"),
        }
    }
}

/// Capture the end-of-run snapshot and emit the summary.
///
/// Capture failures (surface already gone, unwritable path) are logged and
/// swallowed; they must never mask the run's own outcome.
pub async fn record(session: &Session, report: &mut RunReport, screenshot_path: &Path) {
    match session.screenshot(screenshot_path).await {
        Ok(()) => {
            info!(path = %screenshot_path.display(), "screenshot captured");
            report.artifacts.push(screenshot_path.to_path_buf());
        }
        Err(e) => {
            warn!(error = %e, path = %screenshot_path.display(), "screenshot capture failed");
        }
    }

    report.emit();
}
