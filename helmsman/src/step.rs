use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::catalog::StateCatalog;
use crate::errors::DriveError;
use crate::Session;

/// What a single polling iteration observed.
#[derive(Debug)]
pub enum StepOutcome {
    /// A terminal condition matched; the loop should stop successfully.
    Terminal,
    /// A state matched and its action ran.
    Advanced {
        state: String,
        artifacts: Vec<PathBuf>,
    },
    /// Nothing matched; the system is presumed to be transitioning.
    Idle,
}

/// Evaluate one polling iteration against the catalog.
///
/// Terminal probes run first, in catalog order: the goal may be reached
/// mid-action, and detecting it outranks advancing any in-progress state.
/// State probes follow, also in catalog order; the first match wins and its
/// action runs. Transient races (the screen changed between query and
/// action) downgrade to `Idle` and are resolved by the next poll.
pub async fn run_step(
    session: &Session,
    catalog: &StateCatalog,
) -> Result<StepOutcome, DriveError> {
    for probe in catalog.terminals() {
        match probe.matches(session).await {
            Ok(true) => {
                debug!(probe = %probe.describe(), "terminal condition matched");
                return Ok(StepOutcome::Terminal);
            }
            Ok(false) => {}
            Err(e) if e.is_transient() => {
                debug!(error = %e, "terminal probe raced a transition, idling");
                return Ok(StepOutcome::Idle);
            }
            Err(e) => return Err(e),
        }
    }

    for state in catalog.states() {
        match state.probe().matches(session).await {
            Ok(true) => {
                info!(state = state.name(), "state detected, applying action");
                return match state.perform(session).await {
                    Ok(artifacts) => Ok(StepOutcome::Advanced {
                        state: state.name().to_string(),
                        artifacts,
                    }),
                    Err(e) if e.is_transient() => {
                        warn!(state = state.name(), error = %e, "action raced a transition, idling");
                        Ok(StepOutcome::Idle)
                    }
                    Err(e) => Err(e),
                };
            }
            Ok(false) => {}
            Err(e) if e.is_transient() => {
                debug!(state = state.name(), error = %e, "probe raced a transition, idling");
                return Ok(StepOutcome::Idle);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(StepOutcome::Idle)
}
