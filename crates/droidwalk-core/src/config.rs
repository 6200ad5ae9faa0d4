//! Persistent configuration for droidwalk.
//!
//! Stores user settings in `~/.droidwalk/config.json`: which adb executable
//! and device to use, the application to relaunch before each procedure, and
//! the walkthrough timings.
//!
//! # Example
//!
//! ```no_run
//! use droidwalk_core::config::DroidwalkConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = DroidwalkConfig::load();
//! println!("launch settle: {}ms", config.timings.launch_settle_ms);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_FILENAME: &str = "config.json";

/// Returns `~/.droidwalk`, creating it if needed.
pub fn droidwalk_dir() -> PathBuf {
    let dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".droidwalk");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Returns `~/.droidwalk/logs`, creating it if needed.
pub fn logs_dir() -> PathBuf {
    let dir = droidwalk_dir().join("logs");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Fixed delays used at each suspension point of the walkthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Wait after launch before the first query.
    pub launch_settle_ms: u64,
    /// Initial wait of the interaction and responsiveness procedures.
    pub interaction_settle_ms: u64,
    /// Wait after tapping a navigation element.
    pub post_tap_ms: u64,
    /// Wait after back navigation.
    pub post_back_ms: u64,
    /// Wait between the two orientation changes.
    pub rotation_settle_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            launch_settle_ms: 5000,
            interaction_settle_ms: 3000,
            post_tap_ms: 3000,
            post_back_ms: 2000,
            rotation_settle_ms: 2000,
        }
    }
}

/// Poll interval used when a configured interval is unusable.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// How the walkthrough waits for the UI to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Sleep the full configured delay at every suspension point.
    Fixed,
    /// Poll for expected elements until they appear or the timeout elapses.
    Poll {
        timeout_ms: u64,
        interval_ms: u64,
    },
}

impl Default for WaitStrategy {
    fn default() -> Self {
        WaitStrategy::Fixed
    }
}

impl WaitStrategy {
    /// The pause to take at a settle point whose fixed delay is `fixed`.
    pub fn settle_duration(&self, fixed: Duration) -> Duration {
        match self {
            WaitStrategy::Fixed => fixed,
            WaitStrategy::Poll { interval_ms, .. } => fixed.min(Duration::from_millis(*interval_ms)),
        }
    }
}

/// Persistent droidwalk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroidwalkConfig {
    /// Explicit adb executable; `adb` from `PATH` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adb_path: Option<PathBuf>,

    /// Device serial; the first online device when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    /// Package relaunched before each procedure. No relaunch when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,

    /// Activity to start; the launcher activity when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,

    pub timings: Timings,

    pub wait: WaitStrategy,

    /// How long a long-press holds, in milliseconds.
    pub long_press_ms: u32,

    /// Whether to write the JSON Lines action log.
    pub action_log: bool,
}

impl Default for DroidwalkConfig {
    fn default() -> Self {
        Self {
            adb_path: None,
            serial: None,
            package: None,
            activity: None,
            timings: Timings::default(),
            wait: WaitStrategy::default(),
            long_press_ms: 1500,
            action_log: true,
        }
    }
}

impl DroidwalkConfig {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        droidwalk_dir().join(CONFIG_FILENAME)
    }

    /// Load config from `~/.droidwalk/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, with the same fallback as [`load`](Self::load).
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match serde_json::from_str::<Self>(&s) {
                Ok(config) => config.validated(),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Replaces values that would make the walkthrough misbehave.
    ///
    /// A zero poll interval would re-dump the hierarchy back to back, so it
    /// becomes [`DEFAULT_POLL_INTERVAL_MS`].
    pub fn validated(mut self) -> Self {
        if let WaitStrategy::Poll { timeout_ms, interval_ms: 0 } = self.wait {
            tracing::warn!(
                interval_ms = DEFAULT_POLL_INTERVAL_MS,
                "poll interval of 0 ms is not allowed, using default"
            );
            self.wait = WaitStrategy::Poll { timeout_ms, interval_ms: DEFAULT_POLL_INTERVAL_MS };
        }
        self
    }

    /// Save config to `path`.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}
