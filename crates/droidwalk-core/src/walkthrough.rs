//! The scripted UI walkthrough.
//!
//! Three procedures share one fixture setup. Each procedure gets a fresh
//! [`DeviceSession`] (and, when a package is configured, a freshly relaunched
//! application), runs its interactions in order, and stops at the first
//! failure. [`WalkthroughRunner`] runs a selection of procedures one after the
//! other and keeps going after a failed one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use droidwalk_core::adb_driver::AdbDriver;
//! use droidwalk_core::config::DroidwalkConfig;
//! use droidwalk_core::driver::DeviceDriver;
//! use droidwalk_core::walkthrough::{Procedure, WalkthroughRunner};
//!
//! # async fn demo() -> Result<(), droidwalk_core::driver::DriverError> {
//! let config = DroidwalkConfig::load();
//! let mut driver = AdbDriver::from_config(&config);
//! driver.connect().await?;
//!
//! let runner = WalkthroughRunner::new(Arc::new(driver), config);
//! let report = runner.run(Procedure::all()).await;
//! println!("{} passed, {} failed", report.passed(), report.failed());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{DroidwalkConfig, Timings, WaitStrategy};
use crate::driver::{DeviceDriver, DriverError};
use crate::selector::Selector;
use crate::session::{DeviceSession, UiObject};

pub const WELCOME_TEXT: &str = "Welcome to NCL";
pub const CUSTOMER_LOGIN: &str = "Customer Login";
pub const STAFF_ACCESS: &str = "Staff Access";
pub const ADMIN_PORTAL: &str = "Admin Portal";

/// Start and end points of the scroll gesture, and its step count.
pub const SWIPE_START: (i32, i32) = (500, 1000);
pub const SWIPE_END: (i32, i32) = (500, 200);
pub const SWIPE_STEPS: u32 = 10;

/// Errors that end a walkthrough procedure.
#[derive(Error, Debug)]
pub enum WalkthroughError {
    /// An expected element was not on screen.
    #[error("Assertion failed: {0}")]
    AssertionFailure(String),

    /// An unguarded interaction targeted an element that does not exist.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// The device backend failed.
    #[error(transparent)]
    Driver(DriverError),
}

impl From<DriverError> for WalkthroughError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::ElementNotFound(selector) => WalkthroughError::ElementNotFound(selector),
            other => WalkthroughError::Driver(other),
        }
    }
}

/// One of the walkthrough procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Procedure {
    WelcomeScreenAndNavigation,
    ButtonInteractions,
    AppResponsiveness,
}

impl Procedure {
    /// Every procedure, in run order.
    pub fn all() -> &'static [Procedure] {
        &[
            Procedure::WelcomeScreenAndNavigation,
            Procedure::ButtonInteractions,
            Procedure::AppResponsiveness,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            Procedure::WelcomeScreenAndNavigation => "welcome-screen-and-navigation",
            Procedure::ButtonInteractions => "button-interactions",
            Procedure::AppResponsiveness => "app-responsiveness",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Procedure {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "welcome-screen-and-navigation" | "welcome" => Ok(Procedure::WelcomeScreenAndNavigation),
            "button-interactions" | "buttons" => Ok(Procedure::ButtonInteractions),
            "app-responsiveness" | "responsiveness" => Ok(Procedure::AppResponsiveness),
            other => Err(format!(
                "unknown procedure '{}'. Use: welcome-screen-and-navigation, button-interactions, app-responsiveness",
                other
            )),
        }
    }
}

/// Walkthrough fixture: one device session plus the timing policy.
pub struct Walkthrough {
    session: DeviceSession,
    timings: Timings,
    wait: WaitStrategy,
}

impl Walkthrough {
    /// Wraps an already acquired session.
    pub fn new(session: DeviceSession, timings: Timings, wait: WaitStrategy) -> Self {
        Self { session, timings, wait }
    }

    /// Acquires a fresh session on `driver` and relaunches the application.
    ///
    /// Failures here are fixture errors: the procedure never starts.
    pub async fn setup(
        driver: Arc<dyn DeviceDriver>,
        config: &DroidwalkConfig,
        session_name: &str,
        log_dir: Option<&std::path::Path>,
    ) -> Result<Self, WalkthroughError> {
        if !driver.is_connected() {
            return Err(WalkthroughError::Driver(DriverError::NotConnected));
        }
        let session = match log_dir {
            Some(dir) => DeviceSession::with_log_dir(driver, session_name, dir),
            None => DeviceSession::new(driver, session_name),
        };
        session.relaunch().await?;
        Ok(Self::new(session, config.timings.clone(), config.wait))
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Consumes the fixture, returning its session (e.g. to read the action log).
    pub fn into_session(self) -> DeviceSession {
        self.session
    }

    /// Runs one procedure.
    pub async fn run(&self, procedure: Procedure) -> Result<(), WalkthroughError> {
        match procedure {
            Procedure::WelcomeScreenAndNavigation => self.test_welcome_screen_and_navigation().await,
            Procedure::ButtonInteractions => self.test_button_interactions().await,
            Procedure::AppResponsiveness => self.test_app_responsiveness().await,
        }
    }

    /// Checks the welcome screen, then visits each entry point and comes back.
    pub async fn test_welcome_screen_and_navigation(&self) -> Result<(), WalkthroughError> {
        info!("testing welcome screen");
        self.settle(self.timings.launch_settle_ms).await;

        self.assert_text(WELCOME_TEXT, "Welcome text not found!").await?;
        info!("{} found", WELCOME_TEXT);

        self.visit(CUSTOMER_LOGIN, "Customer Login button not found!").await?;
        self.go_back().await?;

        self.visit(STAFF_ACCESS, "Staff Access button not found!").await?;
        self.go_back().await?;

        self.visit(ADMIN_PORTAL, "Admin Portal button not found!").await?;

        info!("welcome screen and navigation completed");
        Ok(())
    }

    /// Long-presses the login entry if it is there, then scrolls.
    pub async fn test_button_interactions(&self) -> Result<(), WalkthroughError> {
        info!("testing button interactions");
        self.settle(self.timings.interaction_settle_ms).await;

        // Presence is optional here, unlike the welcome-screen procedure.
        let selector = Selector::text_view(CUSTOMER_LOGIN);
        self.await_visible(&selector).await?;
        let login = self.session.find_object(selector);
        if login.exists().await? {
            login.long_click().await?;
            info!("long press done");
        } else {
            info!("{} not on screen, skipping long press", CUSTOMER_LOGIN);
        }

        self.session
            .swipe(SWIPE_START.0, SWIPE_START.1, SWIPE_END.0, SWIPE_END.1, SWIPE_STEPS)
            .await?;
        info!("swipe done");
        Ok(())
    }

    /// Rotates to landscape and back. Only checks that the calls succeed.
    pub async fn test_app_responsiveness(&self) -> Result<(), WalkthroughError> {
        info!("testing app responsiveness");
        self.settle(self.timings.interaction_settle_ms).await;

        self.session.set_orientation_landscape().await?;
        info!("landscape set");
        self.settle(self.timings.rotation_settle_ms).await;

        self.session.set_orientation_portrait().await?;
        info!("portrait set");
        Ok(())
    }

    async fn visit(&self, text: &str, message: &str) -> Result<(), WalkthroughError> {
        let target = self.assert_text(text, message).await?;
        info!("tapping {}", text);
        target.click().await?;
        self.settle(self.timings.post_tap_ms).await;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), WalkthroughError> {
        self.session.press_back().await?;
        self.settle(self.timings.post_back_ms).await;
        Ok(())
    }

    /// Fails with `message` unless a `TextView` showing `text` exists.
    async fn assert_text(&self, text: &str, message: &str) -> Result<UiObject<'_>, WalkthroughError> {
        let selector = Selector::text_view(text);
        self.await_visible(&selector).await?;
        let object = self.session.find_object(selector);
        if !object.exists().await? {
            return Err(WalkthroughError::AssertionFailure(message.to_string()));
        }
        Ok(object)
    }

    /// In poll mode, waits until `selector` is queryable or the poll times
    /// out. A timeout is not an error; the caller's existence check decides.
    async fn await_visible(&self, selector: &Selector) -> Result<(), WalkthroughError> {
        if let WaitStrategy::Poll { timeout_ms, interval_ms } = self.wait {
            let found = self
                .session
                .wait_for(
                    selector,
                    Duration::from_millis(timeout_ms),
                    Duration::from_millis(interval_ms),
                )
                .await?;
            if !found {
                debug!(%selector, timeout_ms, "element not visible before poll timeout");
            }
        }
        Ok(())
    }

    async fn settle(&self, fixed_ms: u64) {
        let duration = self.wait.settle_duration(Duration::from_millis(fixed_ms));
        self.session.settle(duration).await;
    }
}

/// Result of one procedure run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureOutcome {
    pub procedure: Procedure,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
    /// Number of device actions the procedure performed.
    pub actions: usize,
}

/// Results of a runner invocation, in run order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub outcomes: Vec<ProcedureOutcome>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }
}

/// Runs procedures sequentially, each with its own fixture.
pub struct WalkthroughRunner {
    driver: Arc<dyn DeviceDriver>,
    config: DroidwalkConfig,
    log_dir: Option<PathBuf>,
}

impl WalkthroughRunner {
    /// Creates a runner over a connected driver.
    pub fn new(driver: Arc<dyn DeviceDriver>, config: DroidwalkConfig) -> Self {
        Self { driver, config, log_dir: None }
    }

    /// Persists each procedure's action log under `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Runs `procedures` in order. A failure ends only its own procedure.
    pub async fn run(&self, procedures: &[Procedure]) -> RunReport {
        let mut report = RunReport::default();
        for &procedure in procedures {
            report.outcomes.push(self.run_one(procedure).await);
        }
        info!(passed = report.passed(), failed = report.failed(), "walkthrough finished");
        report
    }

    /// Runs a single procedure with a fresh fixture.
    pub async fn run_one(&self, procedure: Procedure) -> ProcedureOutcome {
        let span = info_span!("procedure", name = procedure.name());
        async {
            let start = Instant::now();
            let fixture = Walkthrough::setup(
                Arc::clone(&self.driver),
                &self.config,
                procedure.name(),
                self.log_dir.as_deref(),
            )
            .await;

            let (result, actions) = match fixture {
                Ok(walkthrough) => {
                    let result = walkthrough.run(procedure).await;
                    let actions = walkthrough.session().action_log().await.len();
                    (result, actions)
                }
                Err(e) => (Err(e), 0),
            };

            let elapsed_ms = start.elapsed().as_millis() as u64;
            match result {
                Ok(()) => {
                    info!(elapsed_ms, "passed");
                    ProcedureOutcome { procedure, passed: true, error: None, elapsed_ms, actions }
                }
                Err(e) => {
                    warn!(elapsed_ms, error = %e, "failed");
                    ProcedureOutcome {
                        procedure,
                        passed: false,
                        error: Some(e.to_string()),
                        elapsed_ms,
                        actions,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}
