use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element went stale: {0}")]
    StaleElement(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Driver loop exhausted after {iterations} iterations without reaching a terminal state")]
    LoopExhausted { iterations: u32 },

    #[error("Assertion '{assertion}' failed: {observed}")]
    AssertionFailed { assertion: String, observed: String },

    #[error("Automation surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

impl DriveError {
    /// Whether this error is a same-iteration UI race the driver loop
    /// recovers from by polling again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DriveError::ElementNotFound(_) | DriveError::StaleElement(_)
        )
    }
}
