//! Element selectors for querying the window hierarchy.
//!
//! A [`Selector`] is an immutable description of the element to look for.
//! Every field that is set must match; unset fields match anything. All
//! fields compare exactly. Pattern matching on the text is opt-in through
//! [`Selector::text_matches`], which takes a glob with `*` and `?`.
//!
//! # Example
//!
//! ```
//! use droidwalk_core::selector::Selector;
//!
//! let welcome = Selector::new()
//!     .class_name("android.widget.TextView")
//!     .text("Welcome to NCL");
//! assert_eq!(
//!     welcome.to_string(),
//!     r#"class=android.widget.TextView text="Welcome to NCL""#
//! );
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::UIElement;

/// The widget class Android uses for plain text labels.
pub const TEXT_VIEW: &str = "android.widget.TextView";

/// Query descriptor used to locate a UI element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Glob pattern (`*`, `?`) the element text must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_matches: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_desc: Option<String>,
}

impl Selector {
    /// Creates a selector that matches every element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a `TextView` with the given text.
    pub fn text_view(text: impl Into<String>) -> Self {
        Self::new().class_name(TEXT_VIEW).text(text)
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn text_matches(mut self, pattern: impl Into<String>) -> Self {
        self.text_matches = Some(pattern.into());
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn description(mut self, content_desc: impl Into<String>) -> Self {
        self.content_desc = Some(content_desc.into());
        self
    }

    /// Returns true if `element` satisfies every field set on this selector.
    pub fn matches(&self, element: &UIElement) -> bool {
        field_matches(self.class_name.as_deref(), element.class_name.as_deref(), false)
            && field_matches(self.text.as_deref(), element.text.as_deref(), false)
            && field_matches(self.text_matches.as_deref(), element.text.as_deref(), true)
            && field_matches(self.resource_id.as_deref(), element.resource_id.as_deref(), false)
            && field_matches(self.content_desc.as_deref(), element.content_desc.as_deref(), false)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref class_name) = self.class_name {
            parts.push(format!("class={}", class_name));
        }
        if let Some(ref text) = self.text {
            parts.push(format!("text=\"{}\"", text));
        }
        if let Some(ref pattern) = self.text_matches {
            parts.push(format!("text~\"{}\"", pattern));
        }
        if let Some(ref id) = self.resource_id {
            parts.push(format!("id={}", id));
        }
        if let Some(ref desc) = self.content_desc {
            parts.push(format!("desc=\"{}\"", desc));
        }
        if parts.is_empty() {
            write!(f, "<any>")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

fn field_matches(wanted: Option<&str>, actual: Option<&str>, allow_glob: bool) -> bool {
    match wanted {
        None => true,
        Some(pattern) => actual.map_or(false, |value| {
            if allow_glob {
                glob_match(pattern, value)
            } else {
                pattern == value
            }
        }),
    }
}

/// Returns true if the pattern contains glob wildcard characters (`*` or `?`).
fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Matches a string against a glob pattern with `*` (any chars) and `?` (single char).
///
/// When the pattern has no wildcards, falls back to exact equality.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == text;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    let (plen, tlen) = (pat.len(), txt.len());

    // dp[i][j] = pattern[..i] matches text[..j]
    let mut dp = vec![vec![false; tlen + 1]; plen + 1];
    dp[0][0] = true;

    for i in 1..=plen {
        if pat[i - 1] == '*' {
            dp[i][0] = dp[i - 1][0];
        }
    }

    for i in 1..=plen {
        for j in 1..=tlen {
            if pat[i - 1] == '*' {
                dp[i][j] = dp[i - 1][j] || dp[i][j - 1];
            } else if pat[i - 1] == '?' || pat[i - 1] == txt[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }

    dp[plen][tlen]
}
