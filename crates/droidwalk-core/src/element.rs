//! Shared UI element types for uiautomator-based automation.
//!
//! This module defines the core data structures representing UI elements
//! from an Android window hierarchy dump. These types are independent of
//! how the hierarchy was obtained.

use serde::{Deserialize, Serialize};

/// Represents a UI element from the window hierarchy.
///
/// Each element corresponds to one `<node>` of a uiautomator dump. Elements
/// form a tree structure via the `children` field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UIElement {
    /// The widget class name (e.g., "android.widget.TextView").
    #[serde(default)]
    pub class_name: Option<String>,

    /// The visible text of the element.
    #[serde(default)]
    pub text: Option<String>,

    /// The view resource id (e.g., "com.example:id/login").
    #[serde(default)]
    pub resource_id: Option<String>,

    /// The content description, typically set for icons and images.
    #[serde(default)]
    pub content_desc: Option<String>,

    /// The package the element belongs to.
    #[serde(default)]
    pub package: Option<String>,

    /// The element's bounds in screen pixels.
    #[serde(default)]
    pub bounds: Option<ElementFrame>,

    #[serde(default)]
    pub clickable: bool,

    #[serde(default)]
    pub long_clickable: bool,

    #[serde(default)]
    pub scrollable: bool,

    #[serde(default)]
    pub enabled: bool,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,
}

/// The bounds of a UI element.
///
/// Coordinates are in screen pixels, with the origin at the top-left
/// corner of the screen. `right` and `bottom` are exclusive edges, as
/// reported by uiautomator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementFrame {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ElementFrame {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Returns the centre point, which is where taps on the element land.
    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}
