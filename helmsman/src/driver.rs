use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::StateCatalog;
use crate::errors::DriveError;
use crate::step::{self, StepOutcome};
use crate::Session;

/// Viewport and user-agent emulation for a run.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub width: u32,
    pub height: u32,
    /// `None` keeps the browser's own user agent
    pub user_agent: Option<String>,
    pub mobile: bool,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            user_agent: None,
            mobile: false,
        }
    }
}

/// Credential material used to fill login and unlock forms.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Immutable per-run configuration. Construct once, pass explicitly.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Upper bound on polling iterations
    pub max_iterations: u32,
    /// Sleep between iterations when no probe matched
    pub poll_delay: Duration,
    /// Pause after an action, letting asynchronous rendering catch up
    pub settle_delay: Duration,
    /// Bound on each navigation
    pub nav_timeout: Duration,
    pub device: DeviceProfile,
    pub credentials: Credentials,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            poll_delay: Duration::from_secs(1),
            settle_delay: Duration::from_secs(2),
            nav_timeout: Duration::from_secs(60),
            device: DeviceProfile::default(),
            credentials: Credentials::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Exhausted,
    Error,
}

/// The sole output of a driver run, consumed by the post-condition verifier
/// and the artifact recorder.
#[derive(Debug)]
pub struct RunResult {
    pub outcome: Outcome,
    /// Iterations consumed, including the one that observed the terminal state
    pub iterations: u32,
    /// Files produced along the way (downloads; the recorder appends the screenshot)
    pub artifacts: Vec<PathBuf>,
    /// The triggering condition when `outcome` is `Error`
    pub error: Option<DriveError>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Drive the application toward a terminal state, bounded by
/// `config.max_iterations`.
///
/// Fixed-count, fixed-delay polling is the only retry mechanism here: the
/// workflows being driven settle within tens of transitions, not hundreds,
/// and there is no backoff.
pub async fn drive(session: &Session, catalog: &StateCatalog, config: &DriverConfig) -> RunResult {
    let mut artifacts = Vec::new();
    let mut iterations = 0u32;

    while iterations < config.max_iterations {
        iterations += 1;
        match step::run_step(session, catalog).await {
            Ok(StepOutcome::Terminal) => {
                info!(iterations, "terminal state reached");
                return RunResult {
                    outcome: Outcome::Success,
                    iterations,
                    artifacts,
                    error: None,
                };
            }
            Ok(StepOutcome::Advanced { state, artifacts: mut produced }) => {
                info!(state = %state, iteration = iterations, "state advanced");
                artifacts.append(&mut produced);
                tokio::time::sleep(config.settle_delay).await;
            }
            Ok(StepOutcome::Idle) => {
                debug!(iteration = iterations, "no state matched, waiting");
                tokio::time::sleep(config.poll_delay).await;
            }
            Err(e) => {
                warn!(error = %e, iteration = iterations, "driver loop aborted");
                return RunResult {
                    outcome: Outcome::Error,
                    iterations,
                    artifacts,
                    error: Some(e),
                };
            }
        }
    }

    // The budget may have run out on the very action that produced the
    // terminal state; look once more before declaring exhaustion.
    match catalog.any_terminal(session).await {
        Ok(true) => {
            info!(iterations, "terminal state reached on final check");
            RunResult {
                outcome: Outcome::Success,
                iterations,
                artifacts,
                error: None,
            }
        }
        Ok(false) => RunResult {
            outcome: Outcome::Exhausted,
            iterations,
            artifacts,
            error: Some(DriveError::LoopExhausted { iterations }),
        },
        Err(e) if e.is_transient() => RunResult {
            outcome: Outcome::Exhausted,
            iterations,
            artifacts,
            error: Some(DriveError::LoopExhausted { iterations }),
        },
        Err(e) => RunResult {
            outcome: Outcome::Error,
            iterations,
            artifacts,
            error: Some(e),
        },
    }
}
