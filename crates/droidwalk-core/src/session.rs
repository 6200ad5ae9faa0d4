//! Device session and element handles.
//!
//! A [`DeviceSession`] is the handle a walkthrough procedure holds on the
//! running application. It is passed explicitly (there is no global device),
//! wraps a [`DeviceDriver`], and records every action it performs in an
//! in-memory log that can also be persisted as JSON Lines.
//!
//! [`UiObject`] is the element handle returned by
//! [`DeviceSession::find_object`]. It holds only the selector: each call
//! resolves the element against a fresh hierarchy snapshot, so a handle never
//! refers to stale UI state.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use droidwalk_core::adb::Adb;
//! use droidwalk_core::adb_driver::AdbDriver;
//! use droidwalk_core::driver::DeviceDriver;
//! use droidwalk_core::selector::Selector;
//! use droidwalk_core::session::DeviceSession;
//!
//! # async fn demo() -> Result<(), droidwalk_core::driver::DriverError> {
//! let mut driver = AdbDriver::new(Adb::new(), None);
//! driver.connect().await?;
//! let session = DeviceSession::new(Arc::new(driver), "demo");
//!
//! let login = session.find_object(Selector::text_view("Customer Login"));
//! if login.exists().await? {
//!     login.click().await?;
//! }
//! session.press_back().await?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::action::{ActionLog, ActionResult, ActionType};
use crate::driver::{DeviceDriver, DriverError, Orientation};
use crate::element::{ElementFrame, UIElement};
use crate::selector::Selector;

/// Lower bound on the pause between two hierarchy snapshots in [`DeviceSession::wait_for`].
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to the application running on a device.
pub struct DeviceSession {
    id: Uuid,
    name: String,
    driver: Arc<dyn DeviceDriver>,
    action_log: Mutex<Vec<ActionLog>>,
    log_writer: Mutex<Option<BufWriter<File>>>,
}

impl DeviceSession {
    /// Creates a session with an in-memory action log only.
    pub fn new(driver: Arc<dyn DeviceDriver>, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            driver,
            action_log: Mutex::new(Vec::new()),
            log_writer: Mutex::new(None),
        }
    }

    /// Creates a session that also appends its actions to
    /// `{log_dir}/{name}_{timestamp}.jsonl`.
    ///
    /// If the file cannot be created the session still works, logging in
    /// memory only.
    pub fn with_log_dir(driver: Arc<dyn DeviceDriver>, name: &str, log_dir: &Path) -> Self {
        let session = Self::new(driver, name);
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("{}_{}.jsonl", name, timestamp));
        let writer = match File::create(&log_path) {
            Ok(file) => Some(BufWriter::new(file)),
            Err(e) => {
                warn!(path = %log_path.display(), error = %e, "cannot create action log file");
                None
            }
        };
        Self {
            log_writer: Mutex::new(writer),
            ..session
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the underlying driver.
    pub fn driver(&self) -> &Arc<dyn DeviceDriver> {
        &self.driver
    }

    /// Returns a handle for the element described by `selector`.
    ///
    /// No query happens until the handle is used.
    pub fn find_object(&self, selector: Selector) -> UiObject<'_> {
        UiObject { session: self, selector }
    }

    /// Returns a snapshot of every action recorded so far.
    pub async fn action_log(&self) -> Vec<ActionLog> {
        self.action_log.lock().await.clone()
    }

    /// Relaunches the application under test.
    pub async fn relaunch(&self) -> Result<(), DriverError> {
        self.perform(ActionType::Relaunch, self.driver.relaunch()).await
    }

    /// Presses the system back button.
    pub async fn press_back(&self) -> Result<(), DriverError> {
        self.perform(ActionType::PressBack, self.driver.press_back()).await
    }

    /// Swipes from (`start_x`, `start_y`) to (`end_x`, `end_y`) in `steps` steps.
    pub async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError> {
        let action = ActionType::Swipe { start_x, start_y, end_x, end_y, steps };
        self.perform(action, self.driver.swipe(start_x, start_y, end_x, end_y, steps))
            .await
    }

    pub async fn set_orientation_landscape(&self) -> Result<(), DriverError> {
        self.set_orientation(Orientation::Landscape).await
    }

    pub async fn set_orientation_portrait(&self) -> Result<(), DriverError> {
        self.set_orientation(Orientation::Portrait).await
    }

    async fn set_orientation(&self, orientation: Orientation) -> Result<(), DriverError> {
        self.perform(
            ActionType::SetOrientation { orientation },
            self.driver.set_orientation(orientation),
        )
        .await
    }

    /// Captures the screen and returns it base64-encoded.
    pub async fn screenshot_base64(&self) -> Result<String, DriverError> {
        let bytes = self.perform(ActionType::Screenshot, self.driver.screenshot()).await?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    /// Blocks the procedure for `duration`.
    pub async fn settle(&self, duration: Duration) {
        let action = ActionType::Sleep { duration_ms: duration.as_millis() as u64 };
        let _ = self
            .perform(action, async {
                tokio::time::sleep(duration).await;
                Ok::<(), DriverError>(())
            })
            .await;
    }

    /// Polls until an element matching `selector` is present or `timeout`
    /// elapses.
    ///
    /// Returns `Ok(true)` as soon as the element is found and `Ok(false)` on
    /// timeout. Snapshot errors while polling are treated as "not yet
    /// present"; the last one is returned only if the wait times out without
    /// ever getting a clean snapshot.
    pub async fn wait_for(
        &self,
        selector: &Selector,
        timeout: Duration,
        interval: Duration,
    ) -> Result<bool, DriverError> {
        let action = ActionType::WaitFor {
            selector: selector.clone(),
            timeout_ms: timeout.as_millis() as u64,
        };
        let interval = interval.max(MIN_POLL_INTERVAL);
        let driver = Arc::clone(&self.driver);
        let poll = async move {
            let start = Instant::now();
            let mut last_error = None;
            let mut saw_snapshot = false;
            loop {
                match driver.find_element(selector).await {
                    Ok(Some(_)) => return Ok(true),
                    Ok(None) => saw_snapshot = true,
                    Err(e) => {
                        debug!(error = %e, "snapshot failed while waiting");
                        last_error = Some(e);
                    }
                }
                if start.elapsed() >= timeout {
                    return match last_error {
                        Some(e) if !saw_snapshot => Err(e),
                        _ => Ok(false),
                    };
                }
                tokio::time::sleep(interval).await;
            }
        };
        self.perform(action, poll).await
    }

    async fn resolve(&self, selector: &Selector) -> Result<UIElement, DriverError> {
        self.driver
            .find_element(selector)
            .await?
            .ok_or_else(|| DriverError::ElementNotFound(selector.to_string()))
    }

    /// Runs `fut`, recording it as `action`.
    async fn perform<T, F>(&self, action: ActionType, fut: F) -> Result<T, DriverError>
    where
        F: std::future::Future<Output = Result<T, DriverError>>,
    {
        let span = info_span!("device_action", session = %self.name, action = action.name());
        async {
            let start = Instant::now();
            let result = fut.await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            let outcome = match result {
                Ok(_) => ActionResult::Success,
                Err(ref e) => ActionResult::Failure(e.to_string()),
            };
            debug!(elapsed_ms, success = result.is_ok(), "action complete");
            self.record(ActionLog::new(action, outcome, Some(elapsed_ms))).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn record(&self, log: ActionLog) {
        {
            let mut writer_guard = self.log_writer.lock().await;
            if let Some(ref mut writer) = *writer_guard {
                if let Ok(json) = serde_json::to_string(&log) {
                    let _ = writeln!(writer, "{}", json);
                    let _ = writer.flush();
                }
            }
        }
        self.action_log.lock().await.push(log);
    }
}

/// Handle for a UI element, as returned by [`DeviceSession::find_object`].
pub struct UiObject<'a> {
    session: &'a DeviceSession,
    selector: Selector,
}

impl<'a> UiObject<'a> {
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Returns whether a matching element is in the current hierarchy.
    pub async fn exists(&self) -> Result<bool, DriverError> {
        let start = Instant::now();
        let result = self.session.driver.find_element(&self.selector).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        let (outcome, found) = match result {
            Ok(ref found) => (ActionResult::Success, found.is_some()),
            Err(ref e) => (ActionResult::Failure(e.to_string()), false),
        };
        let action = ActionType::Exists { selector: self.selector.clone(), found };
        self.session
            .record(ActionLog::new(action, outcome, Some(elapsed_ms)))
            .await;
        result.map(|found| found.is_some())
    }

    /// Returns the element's bounds in the current hierarchy.
    ///
    /// # Errors
    ///
    /// [`DriverError::ElementNotFound`] if no element matches.
    pub async fn bounds(&self) -> Result<Option<ElementFrame>, DriverError> {
        Ok(self.session.resolve(&self.selector).await?.bounds)
    }

    /// Taps the centre of the element.
    ///
    /// # Errors
    ///
    /// [`DriverError::ElementNotFound`] if no element matches.
    pub async fn click(&self) -> Result<(), DriverError> {
        let action = ActionType::Click { selector: self.selector.clone() };
        let session = self.session;
        self.session
            .perform(action, async {
                let (x, y) = self.target_point().await?;
                session.driver.tap(x, y).await
            })
            .await
    }

    /// Presses and holds the centre of the element.
    ///
    /// # Errors
    ///
    /// [`DriverError::ElementNotFound`] if no element matches.
    pub async fn long_click(&self) -> Result<(), DriverError> {
        let action = ActionType::LongClick { selector: self.selector.clone() };
        let session = self.session;
        self.session
            .perform(action, async {
                let (x, y) = self.target_point().await?;
                session.driver.long_press(x, y).await
            })
            .await
    }

    async fn target_point(&self) -> Result<(i32, i32), DriverError> {
        let element = self.session.resolve(&self.selector).await?;
        element
            .bounds
            .map(|frame| frame.center())
            .ok_or_else(|| DriverError::CommandFailed(format!("{} has no bounds", self.selector)))
    }
}
