//! Action types and logging for device automation.
//!
//! Every operation a [`DeviceSession`](crate::session::DeviceSession) performs
//! is recorded as an [`ActionLog`] entry, which can be persisted as JSON Lines
//! for later inspection.
//!
//! # Example
//!
//! ```
//! use droidwalk_core::action::{ActionLog, ActionResult, ActionType};
//! use droidwalk_core::selector::Selector;
//!
//! let action = ActionType::Click { selector: Selector::text_view("Customer Login") };
//! let log = ActionLog::new(action, ActionResult::Success, Some(12));
//! println!("Action {} at {}", log.id, log.timestamp);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::driver::Orientation;
use crate::selector::Selector;

/// The result of executing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
    /// The action completed successfully.
    Success,

    /// The action failed with the given error message.
    Failure(String),
}

/// Types of actions performed against a device.
///
/// Actions are serialized as JSON with a `type` tag discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActionType {
    /// Relaunch the application under test.
    Relaunch,

    /// Check whether an element exists.
    Exists {
        selector: Selector,
        /// Whether the element was found.
        found: bool,
    },

    /// Tap an element at the centre of its bounds.
    Click { selector: Selector },

    /// Press and hold an element at the centre of its bounds.
    LongClick { selector: Selector },

    /// Swipe between two points.
    Swipe {
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    },

    /// Press the system back button.
    PressBack,

    /// Lock the display orientation.
    SetOrientation { orientation: Orientation },

    /// Poll until an element is queryable.
    WaitFor { selector: Selector, timeout_ms: u64 },

    /// Fixed pause.
    Sleep { duration_ms: u64 },

    /// Capture the screen.
    Screenshot,

    /// Free-form note.
    LogComment { message: String },
}

impl ActionType {
    /// Returns a short, static name for this action type suitable for use in
    /// tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            ActionType::Relaunch => "relaunch",
            ActionType::Exists { .. } => "exists",
            ActionType::Click { .. } => "click",
            ActionType::LongClick { .. } => "long_click",
            ActionType::Swipe { .. } => "swipe",
            ActionType::PressBack => "press_back",
            ActionType::SetOrientation { .. } => "set_orientation",
            ActionType::WaitFor { .. } => "wait_for",
            ActionType::Sleep { .. } => "sleep",
            ActionType::Screenshot => "screenshot",
            ActionType::LogComment { .. } => "log_comment",
        }
    }
}

/// A logged action with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    /// Unique identifier for this log entry.
    pub id: Uuid,

    /// When the action finished.
    pub timestamp: DateTime<Utc>,

    pub action: ActionType,

    pub result: ActionResult,

    /// How long the action took in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ActionLog {
    /// Creates a new action log entry with a fresh id and the current time.
    pub fn new(action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            result,
            duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result == ActionResult::Success
    }
}
