use std::sync::Arc;

use crate::artifact::{record, RunReport};
use crate::driver::{Outcome, RunResult};
use crate::errors::DriveError;
use crate::tests::mock::{MockSurface, Screen};
use crate::Session;

fn success_result() -> RunResult {
    RunResult {
        outcome: Outcome::Success,
        iterations: 4,
        artifacts: Vec::new(),
        error: None,
    }
}

#[tokio::test]
async fn screenshot_lands_and_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.png");
    let surface = MockSurface::new(vec![Screen::new("http://localhost:5173/", vec![])]);
    let session = Session::new(Arc::new(surface));

    let mut report = RunReport::new("onboarding", &success_result());
    record(&session, &mut report, &path).await;

    assert!(path.exists());
    assert_eq!(report.artifacts, vec![path]);
    assert!(report.is_success());
}

#[tokio::test]
async fn capture_failure_never_masks_the_outcome() {
    // The surface is already gone; the recorder logs and moves on.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.png");
    let surface =
        MockSurface::new(vec![Screen::new("http://localhost:5173/", vec![])]).failing_screenshots();
    let session = Session::new(Arc::new(surface));

    let error = DriveError::SurfaceUnavailable("endpoint unreachable".to_string());
    let mut report = RunReport::aborted("onboarding", &error);
    record(&session, &mut report, &path).await;

    assert!(!path.exists());
    assert!(report.artifacts.is_empty());
    assert_eq!(report.outcome, Outcome::Error);
    assert_eq!(
        report.error.as_deref(),
        Some("Automation surface unavailable: endpoint unreachable")
    );
}

#[tokio::test]
async fn assertion_failure_downgrades_the_report() {
    let report = RunReport::new("onboarding", &success_result())
        .with_assertion_failure("new entry from date cell");

    assert!(!report.is_success());
    assert_eq!(report.outcome, Outcome::Error);
    assert_eq!(
        report.failed_assertion.as_deref(),
        Some("new entry from date cell")
    );
}
