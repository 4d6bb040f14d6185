use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use crate::errors::DriveError;
use crate::selector::Selector;
use crate::tests::mock::{MockSurface, Screen};
use crate::verify::{verify, Assertion};
use crate::Session;

const SHORT: Duration = Duration::from_millis(10);

fn calendar_assertions() -> Vec<Assertion> {
    vec![
        Assertion::new("calendar deep link")
            .goto("http://localhost:5173/diary/#/app/calendar", SHORT)
            .expect_url(Regex::new(r".*/calendar").unwrap(), SHORT),
        Assertion::new("new entry from date cell")
            .click(Selector::exact_text("10"))
            .expect_visible(Selector::text("Write a new diary entry"), SHORT)
            .click(Selector::text("Write a new diary entry"))
            .expect_url(Regex::new(r".*/new\?date=.*").unwrap(), SHORT),
    ]
}

fn calendar_screen() -> Screen {
    Screen::new(
        "http://localhost:5173/diary/#/app/calendar",
        vec![Selector::exact_text("10")],
    )
}

fn menu_screen() -> Screen {
    Screen::new(
        "http://localhost:5173/diary/#/app/calendar",
        vec![
            Selector::exact_text("10"),
            Selector::text("Write a new diary entry"),
        ],
    )
}

fn editor_screen() -> Screen {
    Screen::new(
        "http://localhost:5173/diary/#/app/new?date=2024-06-10",
        vec![],
    )
}

#[tokio::test]
async fn calendar_assertions_pass_when_surface_follows() {
    // Scenario C, success path: the click updates the URL as expected.
    let surface = MockSurface::new(vec![
        Screen::new("http://localhost:5173/diary/#/app", vec![]),
        calendar_screen(),
        menu_screen(),
        editor_screen(),
    ])
    .on_navigate("/app/calendar", 1)
    .on_click(Selector::exact_text("10"), 2)
    .on_click(Selector::text("Write a new diary entry"), 3);
    let surface = Arc::new(surface);
    let session = Session::new(surface.clone());

    verify(&session, &calendar_assertions()).await.unwrap();

    assert_eq!(
        surface.navigations(),
        vec!["http://localhost:5173/diary/#/app/calendar".to_string()]
    );
}

#[tokio::test]
async fn unmatched_url_fails_naming_the_pattern() {
    // Scenario C, failure path: the modal click never changes the URL.
    let surface = MockSurface::new(vec![
        Screen::new("http://localhost:5173/diary/#/app", vec![]),
        calendar_screen(),
        menu_screen(),
    ])
    .on_navigate("/app/calendar", 1)
    .on_click(Selector::exact_text("10"), 2);
    let session = Session::new(Arc::new(surface));

    let err = verify(&session, &calendar_assertions())
        .await
        .expect_err("url assertion must fail");

    match err {
        DriveError::AssertionFailed {
            assertion,
            observed,
        } => {
            assert_eq!(assertion, "new entry from date cell");
            assert!(observed.contains("/new\\?date="), "observed: {observed}");
        }
        other => panic!("expected AssertionFailed, got {other}"),
    }
}

#[tokio::test]
async fn first_failure_aborts_remaining_assertions() {
    // Navigation lands on a screen without the date cell: assertion two
    // fails at its first op and the modal is never clicked.
    let surface = MockSurface::new(vec![Screen::new(
        "http://localhost:5173/diary/#/app/calendar",
        vec![],
    )]);
    let surface = Arc::new(surface);
    let session = Session::new(surface.clone());

    let assertions = vec![
        Assertion::new("calendar deep link")
            .goto("http://localhost:5173/diary/#/app/calendar", SHORT)
            .expect_url(Regex::new(r".*/calendar").unwrap(), SHORT),
        Assertion::new("date cell present")
            .expect_visible(Selector::exact_text("10"), SHORT),
        Assertion::new("never reached").click(Selector::text("Write a new diary entry")),
    ];

    let err = verify(&session, &assertions).await.expect_err("must fail");
    match err {
        DriveError::AssertionFailed { assertion, .. } => {
            assert_eq!(assertion, "date cell present");
        }
        other => panic!("expected AssertionFailed, got {other}"),
    }
    assert!(surface.clicks().is_empty());
}
