//! The Secure Diary onboarding catalog and its post-conditions.
//!
//! Heading texts and control labels come straight from the app. States are
//! listed most-specific-first; the loop resolves textual overlap (the
//! "Setup Complete!" heading and its Download button are on screen
//! together) by catalog order.

use std::time::Duration;

use helmsman::{
    drive, verify, AppState, Assertion, Credentials, DriveError, DriverConfig, Op, Probe,
    Selector, Session, StateCatalog, WaitUntil,
};
use regex::Regex;
use tracing::info;

use crate::config::VerifyEnv;

const LOGIN_REDIRECT_TIMEOUT: Duration = Duration::from_secs(20);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(5);
const URL_TIMEOUT: Duration = Duration::from_secs(10);
const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

fn unlock_action(credentials: &Credentials) -> Vec<Op> {
    vec![
        Op::Fill {
            selector: Selector::placeholder("Your password"),
            value: credentials.password.clone(),
        },
        Op::Click {
            selector: Selector::role("button", "Unlock with Password"),
            force: false,
        },
    ]
}

/// The recognized onboarding states, in detection priority order, with the
/// dashboard's Timeline as the terminal condition.
pub fn onboarding_catalog(credentials: &Credentials) -> StateCatalog {
    StateCatalog::new()
        .terminal(Probe::Visible(Selector::text("Timeline")))
        .state(AppState::new(
            "AwaitingInitialization",
            Probe::Visible(Selector::role("heading", "Final Security Step")),
            vec![
                Op::Fill {
                    selector: Selector::placeholder("Your password"),
                    value: credentials.password.clone(),
                },
                Op::Check {
                    selector: Selector::css("input[type='checkbox']").nth(0),
                },
                Op::Check {
                    selector: Selector::css("input[type='checkbox']").nth(1),
                },
                Op::Click {
                    selector: Selector::role("button", "Initialize Diary"),
                    force: false,
                },
            ],
        ))
        .state(AppState::new(
            "SetupCompletePendingDownload",
            Probe::Visible(Selector::role("heading", "Setup Complete!")),
            vec![
                Op::Download {
                    trigger: Selector::role("button", "Download Recovery Kit"),
                    timeout: DOWNLOAD_TIMEOUT,
                },
                Op::ClickIfVisible {
                    selector: Selector::role("button", "Continue to App"),
                },
            ],
        ))
        .state(AppState::new(
            "Locked",
            Probe::Visible(Selector::role("heading", "Unlock Your Diary")),
            unlock_action(credentials),
        ))
        .state(AppState::new(
            "Initializing",
            Probe::Visible(Selector::text("Initializing Secure Session...")),
            vec![Op::Sleep(Duration::from_secs(1))],
        ))
}

/// Sign in and wait for the redirect into the app shell.
pub async fn login(session: &Session, env: &VerifyEnv) -> Result<(), DriveError> {
    info!("signing in");
    session
        .navigate(
            &env.url("#/login"),
            WaitUntil::DomContentLoaded,
            env.config.nav_timeout,
        )
        .await?;
    session
        .fill(
            &Selector::placeholder("Email"),
            &env.config.credentials.email,
        )
        .await?;
    session
        .fill(
            &Selector::placeholder("Password"),
            &env.config.credentials.password,
        )
        .await?;
    session
        .click(&Selector::role("button", "Sign In"), false)
        .await?;
    session
        .wait_for_url(&Regex::new(r"/app$").unwrap(), LOGIN_REDIRECT_TIMEOUT)
        .await?;
    Ok(())
}

/// The run's actual goal, checked after the driver loop succeeds: the
/// calendar deep link works and a date cell opens the new-entry editor.
pub async fn calendar_postconditions(
    session: &Session,
    env: &VerifyEnv,
) -> Result<(), DriveError> {
    verify(
        session,
        &[Assertion::new("calendar deep link")
            .goto(env.url("#/app/calendar"), env.config.nav_timeout)
            .expect_url(Regex::new(r"/calendar").unwrap(), URL_TIMEOUT)],
    )
    .await?;

    // A hard navigation can drop the unlocked session and bounce back to
    // the lock screen; run the Locked recovery until the date cell shows.
    let recovery = StateCatalog::new()
        .terminal(Probe::Visible(Selector::exact_text("10")))
        .state(AppState::new(
            "Locked",
            Probe::Visible(Selector::role("heading", "Unlock Your Diary")),
            unlock_action(&env.config.credentials),
        ));
    let recovery_config = DriverConfig {
        max_iterations: 10,
        ..env.config.clone()
    };
    let result = drive(session, &recovery, &recovery_config).await;
    if !result.is_success() {
        return Err(DriveError::AssertionFailed {
            assertion: "calendar date cell".to_string(),
            observed: format!(
                "date cell '10' not visible after {} iterations",
                result.iterations
            ),
        });
    }

    verify(
        session,
        &[Assertion::new("new entry from date cell")
            .click(Selector::exact_text("10"))
            .expect_visible(Selector::text("Write a new diary entry"), ELEMENT_TIMEOUT)
            .click(Selector::text("Write a new diary entry"))
            .expect_url(Regex::new(r"/new\?date=").unwrap(), URL_TIMEOUT)],
    )
    .await
}
