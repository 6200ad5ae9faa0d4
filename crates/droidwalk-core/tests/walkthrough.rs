//! Walkthrough procedures driven against the scripted in-memory device.
//!
//! Every test runs on a paused tokio clock, so the fixed settle delays
//! advance virtual time instead of sleeping.

mod common;

use std::time::Duration;

use common::{config, ncl_app, ncl_home, session_on, shared, DeviceEvent, MockDevice, HOME};

use droidwalk_core::action::ActionType;
use droidwalk_core::config::{DroidwalkConfig, WaitStrategy};
use droidwalk_core::driver::Orientation;
use droidwalk_core::selector::Selector;
use droidwalk_core::walkthrough::{
    Procedure, Walkthrough, WalkthroughError, WalkthroughRunner, SWIPE_END, SWIPE_START, SWIPE_STEPS,
};

async fn fixture(device: MockDevice) -> (std::sync::Arc<MockDevice>, Walkthrough) {
    let (device, driver) = shared(device);
    let walkthrough = Walkthrough::setup(driver, &config(), "test", None)
        .await
        .expect("setup should succeed on a connected device");
    (device, walkthrough)
}

/// Selectors of every existence check the session performed, in order.
async fn existence_checks(walkthrough: &Walkthrough) -> Vec<(Option<String>, bool)> {
    walkthrough
        .session()
        .action_log()
        .await
        .into_iter()
        .filter_map(|log| match log.action {
            ActionType::Exists { selector, found } => Some((selector.text, found)),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Welcome screen and navigation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn welcome_walkthrough_passes_on_fresh_app() {
    let (device, walkthrough) = fixture(ncl_app()).await;

    walkthrough
        .test_welcome_screen_and_navigation()
        .await
        .expect("walkthrough should pass");

    let events = device.events();
    assert_eq!(events.first(), Some(&DeviceEvent::Relaunch));
    assert_eq!(device.taps(), 3);
    assert_eq!(events.iter().filter(|e| **e == DeviceEvent::Back).count(), 2);
    // No back after the last tap.
    assert_eq!(device.current_screen(), "admin");
}

#[tokio::test(start_paused = true)]
async fn welcome_walkthrough_taps_element_centres() {
    let (device, walkthrough) = fixture(ncl_app()).await;
    walkthrough.test_welcome_screen_and_navigation().await.unwrap();

    let taps: Vec<_> = device
        .events()
        .into_iter()
        .filter(|e| matches!(e, DeviceEvent::Tap(..)))
        .collect();
    // Rows start at y=300 and are 200px apart, 140px tall, x from 140 to 940.
    assert_eq!(
        taps,
        vec![DeviceEvent::Tap(540, 570), DeviceEvent::Tap(540, 770), DeviceEvent::Tap(540, 970)]
    );
}

#[tokio::test(start_paused = true)]
async fn welcome_walkthrough_honours_fixed_delays() {
    let (_device, walkthrough) = fixture(ncl_app()).await;
    let start = tokio::time::Instant::now();

    walkthrough.test_welcome_screen_and_navigation().await.unwrap();

    // 5000 launch + 3 taps x 3000 + 2 backs x 2000.
    assert!(start.elapsed() >= Duration::from_millis(18_000));
}

#[tokio::test(start_paused = true)]
async fn missing_welcome_text_fails_with_message() {
    let (device, walkthrough) =
        fixture(ncl_home(&["Customer Login", "Staff Access", "Admin Portal"])).await;

    let err = walkthrough.test_welcome_screen_and_navigation().await.unwrap_err();
    match err {
        WalkthroughError::AssertionFailure(msg) => assert_eq!(msg, "Welcome text not found!"),
        other => panic!("expected assertion failure, got {:?}", other),
    }
    assert_eq!(device.taps(), 0, "nothing is tapped after the first failed assertion");
}

#[tokio::test(start_paused = true)]
async fn missing_staff_access_stops_after_customer_login() {
    let (device, walkthrough) =
        fixture(ncl_home(&["Welcome to NCL", "Customer Login", "Admin Portal"])).await;

    let err = walkthrough.test_welcome_screen_and_navigation().await.unwrap_err();
    assert!(
        matches!(err, WalkthroughError::AssertionFailure(ref msg) if msg == "Staff Access button not found!"),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(device.taps(), 1);
    assert_eq!(device.current_screen(), HOME);
}

#[tokio::test(start_paused = true)]
async fn back_after_customer_login_makes_staff_access_queryable() {
    let (device, driver) = shared(ncl_app());
    let session = session_on(driver);

    session
        .find_object(Selector::text_view("Customer Login"))
        .click()
        .await
        .expect("tapping Customer Login should not fail");
    assert_eq!(device.current_screen(), "customer");
    assert!(!session.find_object(Selector::text_view("Staff Access")).exists().await.unwrap());

    session.press_back().await.unwrap();
    assert!(session.find_object(Selector::text_view("Staff Access")).exists().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn independent_sessions_assert_the_same_sequence() {
    let (_first_device, first) = fixture(ncl_app()).await;
    first.test_welcome_screen_and_navigation().await.unwrap();

    let (_second_device, second) = fixture(ncl_app()).await;
    second.test_welcome_screen_and_navigation().await.unwrap();

    let first_checks = existence_checks(&first).await;
    let second_checks = existence_checks(&second).await;
    assert_eq!(first_checks, second_checks);
    assert_eq!(
        first_checks,
        vec![
            (Some("Welcome to NCL".to_string()), true),
            (Some("Customer Login".to_string()), true),
            (Some("Staff Access".to_string()), true),
            (Some("Admin Portal".to_string()), true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unguarded_click_on_missing_element_is_element_not_found() {
    let (device, driver) = shared(ncl_app());
    let session = session_on(driver);

    let err = session
        .find_object(Selector::text_view("Logout"))
        .click()
        .await
        .unwrap_err();
    let err: WalkthroughError = err.into();
    assert!(matches!(err, WalkthroughError::ElementNotFound(ref s) if s.contains("Logout")));
    assert_eq!(device.taps(), 0);
}

// ---------------------------------------------------------------------------
// Button interactions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn long_press_happens_when_login_is_present() {
    let (device, walkthrough) = fixture(ncl_app()).await;

    walkthrough.test_button_interactions().await.unwrap();

    let events = device.events();
    assert!(events.contains(&DeviceEvent::LongPress(540, 570)));
    assert_eq!(
        events.last(),
        Some(&DeviceEvent::Swipe(SWIPE_START.0, SWIPE_START.1, SWIPE_END.0, SWIPE_END.1, SWIPE_STEPS))
    );
}

#[tokio::test(start_paused = true)]
async fn long_press_is_skipped_when_login_is_absent() {
    let (device, walkthrough) = fixture(ncl_home(&["Welcome to NCL"])).await;

    walkthrough
        .test_button_interactions()
        .await
        .expect("absence of Customer Login is tolerated");

    let events = device.events();
    assert!(!events.iter().any(|e| matches!(e, DeviceEvent::LongPress(..))));
    assert!(events.contains(&DeviceEvent::Swipe(500, 1000, 500, 200, 10)));
}

#[tokio::test(start_paused = true)]
async fn swipe_without_scrollable_content_succeeds() {
    let (device, walkthrough) = fixture(MockDevice::new().screen(HOME, &[])).await;

    walkthrough.test_button_interactions().await.unwrap();
    assert!(device.events().contains(&DeviceEvent::Swipe(500, 1000, 500, 200, 10)));
}

// ---------------------------------------------------------------------------
// Responsiveness
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn orientation_round_trip_from_portrait() {
    let (device, walkthrough) = fixture(ncl_app()).await;

    walkthrough.test_app_responsiveness().await.unwrap();

    let rotations: Vec<_> = device
        .events()
        .into_iter()
        .filter(|e| matches!(e, DeviceEvent::Orientation(_)))
        .collect();
    assert_eq!(
        rotations,
        vec![
            DeviceEvent::Orientation(Orientation::Landscape),
            DeviceEvent::Orientation(Orientation::Portrait),
        ]
    );
    assert_eq!(device.orientation(), Orientation::Portrait);
}

#[tokio::test(start_paused = true)]
async fn orientation_round_trip_from_landscape() {
    let (device, walkthrough) =
        fixture(ncl_app().with_orientation(Orientation::Landscape)).await;

    walkthrough.test_app_responsiveness().await.unwrap();
    assert_eq!(device.orientation(), Orientation::Portrait);
}

// ---------------------------------------------------------------------------
// Poll wait strategy
// ---------------------------------------------------------------------------

fn poll_config(timeout_ms: u64) -> DroidwalkConfig {
    DroidwalkConfig {
        wait: WaitStrategy::Poll { timeout_ms, interval_ms: 100 },
        ..config()
    }
}

#[tokio::test(start_paused = true)]
async fn poll_waits_for_late_welcome_text() {
    let (device, driver) = shared(ncl_app().reveal_after("Welcome to NCL", 5));
    let walkthrough = Walkthrough::setup(driver, &poll_config(2_000), "poll", None)
        .await
        .unwrap();
    let start = tokio::time::Instant::now();

    walkthrough.test_welcome_screen_and_navigation().await.unwrap();

    assert_eq!(device.current_screen(), "admin");
    // Far below the 18s the fixed delays would take.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn poll_times_out_when_element_never_appears() {
    let (_device, driver) = shared(ncl_home(&["Customer Login"]));
    let walkthrough = Walkthrough::setup(driver, &poll_config(1_000), "poll", None)
        .await
        .unwrap();
    let start = tokio::time::Instant::now();

    let err = walkthrough.test_welcome_screen_and_navigation().await.unwrap_err();
    assert!(matches!(err, WalkthroughError::AssertionFailure(_)));
    assert!(start.elapsed() >= Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn poll_long_press_waits_for_slow_login() {
    // Login shows up 2s after launch; the poll interval alone would miss it.
    let app = ncl_app().reveal_at("Customer Login", Duration::from_millis(2_000));
    let (device, driver) = shared(app);
    let walkthrough = Walkthrough::setup(driver, &poll_config(10_000), "poll", None)
        .await
        .unwrap();

    walkthrough.test_button_interactions().await.unwrap();

    assert!(device.events().contains(&DeviceEvent::LongPress(540, 570)));
}

#[tokio::test(start_paused = true)]
async fn fixed_long_press_sees_login_after_full_settle() {
    let app = ncl_app().reveal_at("Customer Login", Duration::from_millis(2_000));
    let (device, walkthrough) = fixture(app).await;

    walkthrough.test_button_interactions().await.unwrap();

    assert!(device.events().contains(&DeviceEvent::LongPress(540, 570)));
}

#[tokio::test(start_paused = true)]
async fn poll_long_press_tolerates_absent_login() {
    let (device, driver) = shared(ncl_home(&["Welcome to NCL"]));
    let walkthrough = Walkthrough::setup(driver, &poll_config(1_000), "poll", None)
        .await
        .unwrap();
    let start = tokio::time::Instant::now();

    walkthrough
        .test_button_interactions()
        .await
        .expect("absence of Customer Login is tolerated");

    let events = device.events();
    assert!(!events.iter().any(|e| matches!(e, DeviceEvent::LongPress(..))));
    assert!(events.contains(&DeviceEvent::Swipe(500, 1000, 500, 200, 10)));
    assert!(start.elapsed() >= Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn wait_for_with_zero_interval_still_advances() {
    let (device, driver) = shared(ncl_home(&["Welcome to NCL"]));
    let session = session_on(driver);

    let found = session
        .wait_for(&Selector::text_view("Admin Portal"), Duration::from_millis(100), Duration::ZERO)
        .await
        .unwrap();

    assert!(!found);
    // At most one snapshot per millisecond of the timeout, plus the first.
    assert!(device.dumps() <= 101, "took {} snapshots", device.dumps());
}

// ---------------------------------------------------------------------------
// Fixture and runner
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn setup_on_disconnected_device_is_a_fixture_error() {
    let (_device, driver) = shared(ncl_app().disconnected());
    let result = Walkthrough::setup(driver, &config(), "test", None).await;
    assert!(matches!(result, Err(WalkthroughError::Driver(_))));
}

#[tokio::test(start_paused = true)]
async fn runner_continues_after_a_failed_procedure() {
    let (device, driver) = shared(ncl_home(&["Customer Login"]));
    let runner = WalkthroughRunner::new(driver, config());

    let report = runner.run(Procedure::all()).await;

    assert_eq!(report.outcomes.len(), 3);
    assert!(!report.outcomes[0].passed);
    assert_eq!(
        report.outcomes[0].error.as_deref(),
        Some("Assertion failed: Welcome text not found!")
    );
    assert!(report.outcomes[1].passed);
    assert!(report.outcomes[2].passed);
    assert_eq!(report.failed(), 1);

    // Each procedure started from a relaunch.
    let relaunches = device.events().iter().filter(|e| **e == DeviceEvent::Relaunch).count();
    assert_eq!(relaunches, 3);
}

#[tokio::test(start_paused = true)]
async fn runner_reports_fixture_errors_per_procedure() {
    let (_device, driver) = shared(ncl_app().disconnected());
    let runner = WalkthroughRunner::new(driver, config());

    let report = runner.run(&[Procedure::AppResponsiveness]).await;
    assert_eq!(report.failed(), 1);
    assert_eq!(report.outcomes[0].actions, 0);
    assert!(report.outcomes[0].error.as_deref().unwrap().contains("Not connected"));
}

#[tokio::test(start_paused = true)]
async fn runner_writes_action_log_files() {
    let dir = std::env::temp_dir().join(format!("droidwalk_test_{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let (_device, driver) = shared(ncl_app());
    let runner = WalkthroughRunner::new(driver, config()).with_log_dir(&dir);
    let report = runner.run(&[Procedure::ButtonInteractions]).await;
    assert!(report.all_passed());

    let files: Vec<_> = std::fs::read_dir(&dir).unwrap().flatten().collect();
    assert_eq!(files.len(), 1);
    let contents = std::fs::read_to_string(files[0].path()).unwrap();
    let _ = std::fs::remove_dir_all(&dir);

    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).expect("each line is JSON"))
        .collect();
    assert_eq!(lines.len(), report.outcomes[0].actions);
    assert_eq!(lines[0]["action"]["type"], "Relaunch");
    assert!(lines.iter().any(|l| l["action"]["type"] == "Swipe"));
}
