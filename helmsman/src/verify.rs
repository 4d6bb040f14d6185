//! Post-condition verification.
//!
//! After the driver loop succeeds, the run's actual intent is checked with
//! direct assertions, independent of the state machine. Assertions run in
//! order; the first failure aborts the rest. There is no partial credit.

use std::time::Duration;

use regex::Regex;
use tracing::info;

use crate::errors::DriveError;
use crate::selector::Selector;
use crate::surface::{ElementState, WaitUntil};
use crate::Session;

#[derive(Debug, Clone)]
pub enum VerifyOp {
    Goto { url: String, timeout: Duration },
    Click { selector: Selector },
    ExpectVisible { selector: Selector, timeout: Duration },
    ExpectUrl { pattern: Regex, timeout: Duration },
}

/// One named post-condition: a short op sequence whose bounded waits each
/// raise a failure naming this assertion and what was observed instead.
#[derive(Debug, Clone)]
pub struct Assertion {
    name: String,
    ops: Vec<VerifyOp>,
}

impl Assertion {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ops: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goto(mut self, url: impl Into<String>, timeout: Duration) -> Self {
        self.ops.push(VerifyOp::Goto {
            url: url.into(),
            timeout,
        });
        self
    }

    pub fn click(mut self, selector: Selector) -> Self {
        self.ops.push(VerifyOp::Click { selector });
        self
    }

    pub fn expect_visible(mut self, selector: Selector, timeout: Duration) -> Self {
        self.ops.push(VerifyOp::ExpectVisible { selector, timeout });
        self
    }

    pub fn expect_url(mut self, pattern: Regex, timeout: Duration) -> Self {
        self.ops.push(VerifyOp::ExpectUrl { pattern, timeout });
        self
    }

    async fn run(&self, session: &Session) -> Result<(), DriveError> {
        for op in &self.ops {
            match op {
                VerifyOp::Goto { url, timeout } => session
                    .navigate(url, WaitUntil::DomContentLoaded, *timeout)
                    .await
                    .map_err(|e| self.failed(format!("navigation to {url} failed: {e}")))?,
                VerifyOp::Click { selector } => session
                    .click(selector, false)
                    .await
                    .map_err(|e| self.failed(format!("click on {selector} failed: {e}")))?,
                VerifyOp::ExpectVisible { selector, timeout } => session
                    .wait_for_element(selector, ElementState::Visible, *timeout)
                    .await
                    .map_err(|e| {
                        self.failed(format!("{selector} not visible within {timeout:?}: {e}"))
                    })?,
                VerifyOp::ExpectUrl { pattern, timeout } => {
                    let matched =
                        session.wait_for_url(pattern, *timeout).await.map_err(|e| {
                            self.failed(format!(
                                "url did not match /{pattern}/ within {timeout:?}: {e}"
                            ))
                        })?;
                    info!(url = %matched, pattern = %pattern, "url matched");
                }
            }
        }
        Ok(())
    }

    fn failed(&self, observed: String) -> DriveError {
        DriveError::AssertionFailed {
            assertion: self.name.clone(),
            observed,
        }
    }
}

/// Run every assertion in order, aborting on the first failure.
pub async fn verify(session: &Session, assertions: &[Assertion]) -> Result<(), DriveError> {
    for assertion in assertions {
        info!(assertion = assertion.name(), "checking post-condition");
        assertion.run(session).await?;
        info!(assertion = assertion.name(), "post-condition held");
    }
    Ok(())
}
