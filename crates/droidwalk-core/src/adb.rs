//! Interface to the Android Debug Bridge (`adb`) command-line tool.
//!
//! This module provides a Rust wrapper around `adb`, enabling device listing,
//! window hierarchy dumps, input injection, rotation control, screenshots and
//! application launch on a connected device or emulator.
//!
//! # Requirements
//!
//! The Android platform tools must be installed and `adb` must be on `PATH`
//! (or configured explicitly via [`Adb::with_path`]).
//!
//! # Example
//!
//! ```no_run
//! use droidwalk_core::adb::Adb;
//!
//! let adb = Adb::new();
//! for device in adb.list_devices().unwrap() {
//!     println!("{} ({})", device.serial, device.state);
//! }
//!
//! let serial = adb.get_online_serial().unwrap();
//! let xml = adb.dump_hierarchy(&serial).unwrap();
//! ```

use std::path::PathBuf;
use std::process::{Command, Output};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::driver::Orientation;

/// Android key code for the system back button.
pub const KEYCODE_BACK: u32 = 4;

/// Where `uiautomator dump` writes on the device before we read it back.
const DUMP_PATH: &str = "/sdcard/window_dump.xml";

/// Milliseconds UiDevice spends per swipe step.
pub const MS_PER_SWIPE_STEP: u32 = 5;

/// Errors that can occur when interacting with adb.
#[derive(Error, Debug)]
pub enum AdbError {
    /// An adb command failed to execute successfully.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// The adb executable could not be found.
    #[error("adb not found - install the Android platform tools or set DROIDWALK_ADB")]
    NotInstalled,

    /// No device is in the "device" (online) state.
    #[error("No online device found")]
    NoDevice,

    /// Output from adb did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An I/O error occurred while executing the command.
    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for AdbError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            AdbError::NotInstalled
        } else {
            AdbError::Io(e)
        }
    }
}

/// A device as reported by `adb devices -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidDevice {
    /// The device serial (e.g., "emulator-5554").
    pub serial: String,

    /// The connection state (e.g., "device", "offline", "unauthorized").
    pub state: String,

    /// The model name, when adb reports one.
    pub model: Option<String>,

    /// The product name, when adb reports one.
    pub product: Option<String>,
}

impl AndroidDevice {
    pub fn is_online(&self) -> bool {
        self.state == "device"
    }
}

/// Wrapper for `adb` commands.
///
/// All methods are synchronous and execute child processes.
#[derive(Debug, Clone)]
pub struct Adb {
    program: PathBuf,
}

impl Default for Adb {
    fn default() -> Self {
        Self::new()
    }
}

impl Adb {
    /// Uses `adb` from `PATH`.
    pub fn new() -> Self {
        Self { program: PathBuf::from("adb") }
    }

    /// Uses an explicit adb executable.
    pub fn with_path(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    fn run(&self, serial: Option<&str>, args: &[&str]) -> Result<Output, AdbError> {
        let mut cmd = Command::new(&self.program);
        if let Some(serial) = serial {
            cmd.args(["-s", serial]);
        }
        cmd.args(args);
        debug!(program = %self.program.display(), ?serial, ?args, "adb");

        let output = cmd.output()?;
        if !output.status.success() {
            return Err(AdbError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).trim().to_string()
            ));
        }
        Ok(output)
    }

    /// Runs `adb -s <serial> shell <args...>` and returns stdout.
    pub fn shell(&self, serial: &str, args: &[&str]) -> Result<String, AdbError> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        let output = self.run(Some(serial), &full)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Lists all devices known to the adb server.
    ///
    /// # Errors
    ///
    /// - [`AdbError::NotInstalled`] if adb cannot be executed
    /// - [`AdbError::CommandFailed`] if adb returns a non-zero exit code
    pub fn list_devices(&self) -> Result<Vec<AndroidDevice>, AdbError> {
        let output = self.run(None, &["devices", "-l"])?;
        Self::parse_device_list(&String::from_utf8_lossy(&output.stdout))
    }

    /// Returns the serial of the first online device.
    ///
    /// # Errors
    ///
    /// - [`AdbError::NoDevice`] if no device is online
    /// - Any errors from [`Self::list_devices`]
    pub fn get_online_serial(&self) -> Result<String, AdbError> {
        let devices = self.list_devices()?;
        Self::find_online_device(&devices)
            .map(|d| d.serial.clone())
            .ok_or(AdbError::NoDevice)
    }

    /// Dumps the current window hierarchy as uiautomator XML.
    pub fn dump_hierarchy(&self, serial: &str) -> Result<String, AdbError> {
        let out = self.shell(serial, &["uiautomator", "dump", DUMP_PATH])?;
        // uiautomator exits 0 even when the dump fails, so check what it printed.
        if out.contains("ERROR") {
            return Err(AdbError::CommandFailed(out.trim().to_string()));
        }
        let output = self.run(Some(serial), &["exec-out", "cat", DUMP_PATH])?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Taps at x,y screen coordinates.
    pub fn tap(&self, serial: &str, x: i32, y: i32) -> Result<(), AdbError> {
        self.shell(serial, &["input", "tap", &x.to_string(), &y.to_string()])?;
        Ok(())
    }

    /// Swipes between two points over `duration_ms`.
    pub fn swipe(
        &self,
        serial: &str,
        start: (i32, i32),
        end: (i32, i32),
        duration_ms: u32,
    ) -> Result<(), AdbError> {
        self.shell(serial, &[
            "input",
            "swipe",
            &start.0.to_string(),
            &start.1.to_string(),
            &end.0.to_string(),
            &end.1.to_string(),
            &duration_ms.to_string(),
        ])?;
        Ok(())
    }

    /// Long-presses at x,y by swiping zero distance for `duration_ms`.
    pub fn long_press(&self, serial: &str, x: i32, y: i32, duration_ms: u32) -> Result<(), AdbError> {
        self.swipe(serial, (x, y), (x, y), duration_ms)
    }

    /// Sends a key event (see [`KEYCODE_BACK`]).
    pub fn key_event(&self, serial: &str, keycode: u32) -> Result<(), AdbError> {
        self.shell(serial, &["input", "keyevent", &keycode.to_string()])?;
        Ok(())
    }

    /// Locks the display rotation to the given orientation.
    ///
    /// Auto-rotate is switched off first, otherwise the sensor overrides
    /// `user_rotation` immediately.
    pub fn set_rotation(&self, serial: &str, orientation: Orientation) -> Result<(), AdbError> {
        self.shell(serial, &["settings", "put", "system", "accelerometer_rotation", "0"])?;
        self.shell(serial, &[
            "settings",
            "put",
            "system",
            "user_rotation",
            &orientation.user_rotation().to_string(),
        ])?;
        Ok(())
    }

    /// Captures the screen as PNG bytes.
    pub fn screenshot(&self, serial: &str) -> Result<Vec<u8>, AdbError> {
        let output = self.run(Some(serial), &["exec-out", "screencap", "-p"])?;
        Ok(output.stdout)
    }

    /// Stops every process of the given package.
    pub fn force_stop(&self, serial: &str, package: &str) -> Result<(), AdbError> {
        self.shell(serial, &["am", "force-stop", package])?;
        Ok(())
    }

    /// Launches an application.
    ///
    /// With an activity, starts `package/activity` explicitly; otherwise fires
    /// the launcher intent for the package.
    pub fn launch(&self, serial: &str, package: &str, activity: Option<&str>) -> Result<(), AdbError> {
        let out = match activity {
            Some(activity) => {
                let component = format!("{}/{}", package, activity);
                self.shell(serial, &["am", "start", "-W", "-n", &component])?
            }
            None => self.shell(serial, &[
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])?,
        };
        if out.contains("Error") || out.contains("No activities found") {
            return Err(AdbError::CommandFailed(out.trim().to_string()));
        }
        Ok(())
    }

    /// Parses the output of `adb devices -l`.
    ///
    /// This method is exposed primarily for testing purposes.
    pub fn parse_device_list(output: &str) -> Result<Vec<AndroidDevice>, AdbError> {
        let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

        // Daemon start-up chatter ("* daemon started successfully") can precede the header.
        let header_seen = lines
            .by_ref()
            .any(|l| l.starts_with("List of devices attached"));
        if !header_seen {
            return Err(AdbError::Parse(format!(
                "missing device list header in: {:?}",
                output
            )));
        }

        let mut devices = Vec::new();
        for line in lines {
            if line.starts_with('*') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(serial), Some(state)) = (fields.next(), fields.next()) else {
                return Err(AdbError::Parse(format!("malformed device line: {:?}", line)));
            };
            let mut device = AndroidDevice {
                serial: serial.to_string(),
                state: state.to_string(),
                model: None,
                product: None,
            };
            for field in fields {
                if let Some((key, value)) = field.split_once(':') {
                    match key {
                        "model" => device.model = Some(value.to_string()),
                        "product" => device.product = Some(value.to_string()),
                        _ => {}
                    }
                }
            }
            devices.push(device);
        }
        Ok(devices)
    }

    /// Finds the first online device in a list.
    ///
    /// This method is exposed primarily for testing purposes.
    pub fn find_online_device(devices: &[AndroidDevice]) -> Option<&AndroidDevice> {
        devices.iter().find(|d| d.is_online())
    }
}

/// Converts a UiDevice-style step count into a swipe duration.
pub fn swipe_duration_ms(steps: u32) -> u32 {
    steps.max(1).saturating_mul(MS_PER_SWIPE_STEP)
}
