//! Automation driver trait for backend-agnostic device automation.
//!
//! This module defines the [`DeviceDriver`] trait, the query/action surface
//! the walkthrough consumes: a UI tree snapshot, coordinate input, back
//! navigation and orientation control. The production backend is
//! [`AdbDriver`](crate::adb_driver::AdbDriver); tests drive the same code
//! through an in-memory device.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adb::AdbError;
use crate::element::UIElement;
use crate::hierarchy::{self, HierarchyError};
use crate::selector::Selector;

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The backend is not available or not connected.
    #[error("Not connected to a device")]
    NotConnected,

    /// No element matched the selector in the current snapshot.
    #[error("UiObject not found: {0}")]
    ElementNotFound(String),

    /// An adb invocation failed.
    #[error("adb error: {0}")]
    Adb(#[from] AdbError),

    /// The window hierarchy could not be parsed.
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking backend task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(String),
}

/// Display orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// The value Android's `user_rotation` setting uses for this orientation.
    pub fn user_rotation(self) -> u8 {
        match self {
            Orientation::Portrait => 0,
            Orientation::Landscape => 1,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

/// Trait for backend-agnostic Android UI automation.
///
/// Implementors provide the device capabilities using their specific backend.
/// Element search is provided by default methods that fetch the full
/// hierarchy via [`dump_tree`](DeviceDriver::dump_tree) and search locally.
///
/// All device methods are async so that blocking backends can offload work
/// with `spawn_blocking` while in-memory backends stay trivial.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Establish connection to the device.
    async fn connect(&mut self) -> Result<(), DriverError>;

    /// Check if the backend is ready to accept commands.
    fn is_connected(&self) -> bool;

    /// Take a fresh snapshot of the window hierarchy.
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError>;

    /// Tap at screen coordinates.
    async fn tap(&self, x: i32, y: i32) -> Result<(), DriverError>;

    /// Press and hold at screen coordinates.
    async fn long_press(&self, x: i32, y: i32) -> Result<(), DriverError>;

    /// Swipe from one point to another.
    ///
    /// `steps` follows UiDevice semantics: each step takes about 5 ms, so the
    /// step count controls the gesture's speed.
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError>;

    /// Press the system back button.
    async fn press_back(&self) -> Result<(), DriverError>;

    /// Lock the display to the given orientation.
    async fn set_orientation(&self, orientation: Orientation) -> Result<(), DriverError>;

    /// Capture the screen as PNG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Relaunch the application under test from a clean state.
    ///
    /// Backends without an application notion accept this as a no-op.
    async fn relaunch(&self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Find the first element matching `selector` in a fresh snapshot.
    async fn find_element(&self, selector: &Selector) -> Result<Option<UIElement>, DriverError> {
        let tree = self.dump_tree().await?;
        Ok(hierarchy::find_element(&tree, selector))
    }

    /// Get a flattened list of identifiable elements on screen.
    async fn list_elements(&self) -> Result<Vec<UIElement>, DriverError> {
        let tree = self.dump_tree().await?;
        Ok(hierarchy::flatten_elements(&tree))
    }
}
