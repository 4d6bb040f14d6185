use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{AppState, Op, Probe, StateCatalog};
use crate::driver::{drive, DriverConfig, Outcome};
use crate::errors::DriveError;
use crate::selector::Selector;
use crate::step::{run_step, StepOutcome};
use crate::tests::mock::{MockSurface, Screen};
use crate::Session;

fn fast_config(max_iterations: u32) -> DriverConfig {
    DriverConfig {
        max_iterations,
        poll_delay: Duration::from_millis(1),
        settle_delay: Duration::from_millis(1),
        ..DriverConfig::default()
    }
}

fn unlock_catalog() -> StateCatalog {
    StateCatalog::new()
        .terminal(Probe::Visible(Selector::text("Timeline")))
        .state(AppState::new(
            "Locked",
            Probe::Visible(Selector::role("heading", "Unlock Your Diary")),
            vec![
                Op::Fill {
                    selector: Selector::placeholder("Your password"),
                    value: "test1234".to_string(),
                },
                Op::Click {
                    selector: Selector::role("button", "Unlock with Password"),
                    force: false,
                },
            ],
        ))
}

fn locked_screen() -> Screen {
    Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![
            Selector::role("heading", "Unlock Your Diary"),
            Selector::placeholder("Your password"),
            Selector::role("button", "Unlock with Password"),
        ],
    )
}

fn dashboard_screen() -> Screen {
    Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![Selector::text("Timeline")],
    )
}

#[tokio::test]
async fn unlock_transition_reaches_success() {
    // Scenario A: one action moves the surface from Locked to Ready.
    let surface = MockSurface::new(vec![locked_screen(), dashboard_screen()])
        .on_click(Selector::role("button", "Unlock with Password"), 1);
    let surface = Arc::new(surface);
    let session = Session::new(surface.clone());

    let result = drive(&session, &unlock_catalog(), &fast_config(30)).await;

    assert_eq!(result.outcome, Outcome::Success);
    // iteration 1 applies the action, iteration 2 observes the terminal
    assert_eq!(result.iterations, 2);
    assert_eq!(
        surface.fills(),
        vec![(
            Selector::placeholder("Your password"),
            "test1234".to_string()
        )]
    );
}

#[tokio::test]
async fn dead_surface_exhausts_after_exact_budget() {
    // Scenario B: no probe ever matches.
    let surface = Arc::new(MockSurface::new(vec![Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![],
    )]));
    let session = Session::new(surface);

    let result = drive(&session, &unlock_catalog(), &fast_config(30)).await;

    assert_eq!(result.outcome, Outcome::Exhausted);
    assert_eq!(result.iterations, 30);
    assert!(matches!(
        result.error,
        Some(DriveError::LoopExhausted { iterations: 30 })
    ));
}

#[tokio::test]
async fn stuck_state_reissues_action_safely() {
    // The action's effect never renders; the loop re-detects Locked and
    // re-issues the same action instead of failing or drifting.
    let surface = Arc::new(MockSurface::new(vec![locked_screen()]));
    let session = Session::new(surface.clone());

    let result = drive(&session, &unlock_catalog(), &fast_config(3)).await;

    assert_eq!(result.outcome, Outcome::Exhausted);
    assert_eq!(result.iterations, 3);
    assert_eq!(surface.fills().len(), 3);
    assert!(surface
        .clicks()
        .iter()
        .all(|c| *c == Selector::role("button", "Unlock with Password")));
}

#[tokio::test]
async fn terminal_detection_outranks_state_actions() {
    // Both a terminal probe and a state probe match; terminal wins and no
    // action runs.
    let both = Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![
            Selector::text("Timeline"),
            Selector::role("heading", "Unlock Your Diary"),
        ],
    );
    let surface = Arc::new(MockSurface::new(vec![both]));
    let session = Session::new(surface.clone());

    let outcome = run_step(&session, &unlock_catalog()).await.unwrap();

    assert!(matches!(outcome, StepOutcome::Terminal));
    assert!(surface.clicks().is_empty());
    assert!(surface.fills().is_empty());
}

#[tokio::test]
async fn overlapping_probes_resolve_by_catalog_order() {
    // Two states could match the same screen; the earlier entry wins.
    let catalog = StateCatalog::new()
        .terminal(Probe::Visible(Selector::text("Timeline")))
        .state(AppState::new(
            "SetupComplete",
            Probe::Visible(Selector::role("heading", "Setup Complete!")),
            vec![Op::Click {
                selector: Selector::role("button", "Continue to App"),
                force: false,
            }],
        ))
        .state(AppState::new(
            "DownloadVisible",
            Probe::ContentContains("Download".to_string()),
            vec![Op::Click {
                selector: Selector::role("button", "Download Recovery Kit"),
                force: false,
            }],
        ));

    let screen = Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![
            Selector::role("heading", "Setup Complete!"),
            Selector::role("button", "Continue to App"),
            Selector::role("button", "Download Recovery Kit"),
        ],
    )
    .with_content("<h2>Setup Complete!</h2><button>Download Recovery Kit</button>");
    let surface = Arc::new(MockSurface::new(vec![screen]));
    let session = Session::new(surface.clone());

    let outcome = run_step(&session, &catalog).await.unwrap();

    match outcome {
        StepOutcome::Advanced { state, .. } => assert_eq!(state, "SetupComplete"),
        other => panic!("expected Advanced, got {other:?}"),
    }
    assert_eq!(
        surface.clicks(),
        vec![Selector::role("button", "Continue to App")]
    );
}

#[tokio::test]
async fn terminal_produced_by_final_action_still_succeeds() {
    // The budget runs out on the very action that produced the terminal
    // state; the final re-check catches it.
    let surface = MockSurface::new(vec![locked_screen(), dashboard_screen()])
        .on_click(Selector::role("button", "Unlock with Password"), 1);
    let session = Session::new(Arc::new(surface));

    let result = drive(&session, &unlock_catalog(), &fast_config(1)).await;

    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.iterations, 1);
}

#[tokio::test]
async fn download_failure_does_not_block_the_state() {
    // The recovery-kit download is best-effort: a timed-out transfer logs
    // and the action's remaining ops still run.
    let catalog = StateCatalog::new()
        .terminal(Probe::Visible(Selector::text("Timeline")))
        .state(AppState::new(
            "SetupComplete",
            Probe::Visible(Selector::role("heading", "Setup Complete!")),
            vec![
                Op::Download {
                    trigger: Selector::role("button", "Download Recovery Kit"),
                    timeout: Duration::from_millis(1),
                },
                Op::ClickIfVisible {
                    selector: Selector::role("button", "Continue to App"),
                },
            ],
        ));

    let setup = Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![
            Selector::role("heading", "Setup Complete!"),
            Selector::role("button", "Download Recovery Kit"),
            Selector::role("button", "Continue to App"),
        ],
    );
    let surface = MockSurface::new(vec![setup, dashboard_screen()])
        .on_click(Selector::role("button", "Continue to App"), 1);
    let surface = Arc::new(surface);
    let session = Session::new(surface.clone());

    let result = drive(&session, &catalog, &fast_config(5)).await;

    assert_eq!(result.outcome, Outcome::Success);
    assert!(result.artifacts.is_empty());
    assert_eq!(surface.clicks().len(), 2);
}

#[tokio::test]
async fn full_onboarding_path_collects_artifacts() {
    // Initialization, then the recovery-kit download, then the dashboard.
    let kit = std::env::temp_dir().join("helmsman-recovery-kit.txt");
    let catalog = StateCatalog::new()
        .terminal(Probe::Visible(Selector::text("Timeline")))
        .state(AppState::new(
            "AwaitingInitialization",
            Probe::Visible(Selector::role("heading", "Final Security Step")),
            vec![
                Op::Fill {
                    selector: Selector::placeholder("Your password"),
                    value: "test1234".to_string(),
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
                    timeout: Duration::from_millis(10),
                },
                Op::ClickIfVisible {
                    selector: Selector::role("button", "Continue to App"),
                },
            ],
        ));

    let init = Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![
            Selector::role("heading", "Final Security Step"),
            Selector::role("button", "Initialize Diary"),
        ],
    );
    let setup = Screen::new(
        "http://localhost:5173/diary/#/app",
        vec![
            Selector::role("heading", "Setup Complete!"),
            Selector::role("button", "Download Recovery Kit"),
            Selector::role("button", "Continue to App"),
        ],
    );
    let surface = MockSurface::new(vec![init, setup, dashboard_screen()])
        .on_click(Selector::role("button", "Initialize Diary"), 1)
        .on_click(Selector::role("button", "Continue to App"), 2)
        .with_download(kit.clone());
    let surface = Arc::new(surface);
    let session = Session::new(surface.clone());

    let result = drive(&session, &catalog, &fast_config(10)).await;

    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.artifacts, vec![kit]);
    assert_eq!(surface.checks().len(), 2);

    session.close().await.unwrap();
    assert!(surface.is_closed());
}

#[tokio::test]
async fn synthetic_events_reach_the_surface() {
    let surface = Arc::new(MockSurface::new(vec![Screen::new(
        "http://localhost:5173/diary/",
        vec![],
    )]));
    let session = Session::new(surface.clone());

    session.dispatch_event("beforeinstallprompt").await.unwrap();

    assert_eq!(surface.dispatched(), vec!["beforeinstallprompt".to_string()]);
}

#[tokio::test]
async fn evaluate_returns_the_scripted_value() {
    let surface = MockSurface::new(vec![Screen::new("http://localhost:5173/diary/", vec![])])
        .with_eval_result(serde_json::json!(2));
    let session = Session::new(Arc::new(surface));

    let registrations = session
        .evaluate("navigator.serviceWorker.getRegistrations().then(regs => regs.length)")
        .await
        .unwrap();

    assert_eq!(registrations, serde_json::json!(2));
}

#[tokio::test]
async fn unreachable_endpoint_is_surface_unavailable() {
    // Scenario D: session acquisition fails before any iteration runs.
    let err = crate::cdp::CdpSurface::connect(
        "http://127.0.0.1:9",
        &crate::driver::DeviceProfile::default(),
        std::env::temp_dir().join("helmsman-nodl").as_path(),
    )
    .await
    .err()
    .expect("connect must fail against a closed port");

    assert!(matches!(err, DriveError::SurfaceUnavailable(_)), "{err}");
}
