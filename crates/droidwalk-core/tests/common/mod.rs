//! Shared test helpers for droidwalk-core integration tests.
//!
//! This module provides a scripted in-memory device that implements
//! [`DeviceDriver`]: a set of named screens, tap transitions between them, a
//! back stack, and a record of every call the walkthrough made.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use droidwalk_core::config::DroidwalkConfig;
use droidwalk_core::driver::{DeviceDriver, DriverError, Orientation};
use droidwalk_core::element::{ElementFrame, UIElement};
use droidwalk_core::selector::TEXT_VIEW;
use droidwalk_core::session::DeviceSession;

pub const HOME: &str = "home";

/// Something the walkthrough did to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Relaunch,
    Tap(i32, i32),
    LongPress(i32, i32),
    Swipe(i32, i32, i32, i32, u32),
    Back,
    Orientation(Orientation),
}

struct DeviceState {
    stack: Vec<String>,
    orientation: Orientation,
    dumps: usize,
    events: Vec<DeviceEvent>,
}

/// Scripted in-memory device.
pub struct MockDevice {
    connected: bool,
    screens: HashMap<String, Vec<UIElement>>,
    transitions: HashMap<(String, String), String>,
    /// Text hidden from dumps until the given number of dumps has happened.
    delayed: HashMap<String, usize>,
    /// Text hidden from dumps until the given (virtual) time has elapsed.
    timed: HashMap<String, Duration>,
    created: Instant,
    state: Mutex<DeviceState>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            connected: true,
            screens: HashMap::new(),
            transitions: HashMap::new(),
            delayed: HashMap::new(),
            timed: HashMap::new(),
            created: Instant::now(),
            state: Mutex::new(DeviceState {
                stack: vec![HOME.to_string()],
                orientation: Orientation::Portrait,
                dumps: 0,
                events: Vec::new(),
            }),
        }
    }

    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Adds a screen made of full-width `TextView` rows.
    pub fn screen(mut self, name: &str, texts: &[&str]) -> Self {
        let rows = texts
            .iter()
            .enumerate()
            .map(|(i, text)| text_view(text, 300 + i as i32 * 200))
            .collect();
        let root = UIElement {
            class_name: Some("android.widget.FrameLayout".to_string()),
            bounds: Some(ElementFrame { left: 0, top: 0, right: 1080, bottom: 2400 }),
            enabled: true,
            children: rows,
            ..Default::default()
        };
        self.screens.insert(name.to_string(), vec![root]);
        self
    }

    /// Tapping `text` on `from` opens `to`.
    pub fn transition(mut self, from: &str, text: &str, to: &str) -> Self {
        self.transitions
            .insert((from.to_string(), text.to_string()), to.to_string());
        self
    }

    /// `text` is absent from the first `dumps` hierarchy snapshots.
    pub fn reveal_after(mut self, text: &str, dumps: usize) -> Self {
        self.delayed.insert(text.to_string(), dumps);
        self
    }

    /// `text` is absent until `after` has elapsed since the device was built.
    pub fn reveal_at(mut self, text: &str, after: Duration) -> Self {
        self.timed.insert(text.to_string(), after);
        self
    }

    pub fn with_orientation(self, orientation: Orientation) -> Self {
        self.state.lock().unwrap().orientation = orientation;
        self
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn current_screen(&self) -> String {
        self.state.lock().unwrap().stack.last().cloned().unwrap_or_default()
    }

    pub fn orientation(&self) -> Orientation {
        self.state.lock().unwrap().orientation
    }

    /// Number of hierarchy snapshots taken so far.
    pub fn dumps(&self) -> usize {
        self.state.lock().unwrap().dumps
    }

    pub fn taps(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Tap(..)))
            .count()
    }

    fn element_at(&self, screen: &str, x: i32, y: i32) -> Option<UIElement> {
        self.screens.get(screen)?.iter().flat_map(|root| root.children.iter()).find(|e| {
            e.bounds.map_or(false, |b| x >= b.left && x < b.right && y >= b.top && y < b.bottom)
        }).cloned()
    }
}

fn text_view(text: &str, top: i32) -> UIElement {
    UIElement {
        class_name: Some(TEXT_VIEW.to_string()),
        text: Some(text.to_string()),
        bounds: Some(ElementFrame { left: 140, top, right: 940, bottom: top + 140 }),
        clickable: true,
        long_clickable: true,
        enabled: true,
        ..Default::default()
    }
}

#[async_trait]
impl DeviceDriver for MockDevice {
    async fn connect(&mut self) -> Result<(), DriverError> {
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.dumps += 1;
        let dumps = state.dumps;
        let screen = state.stack.last().cloned().unwrap_or_default();
        let elapsed = self.created.elapsed();
        let mut tree = self.screens.get(&screen).cloned().unwrap_or_default();
        for root in &mut tree {
            root.children.retain(|e| {
                let text = e.text.clone().unwrap_or_default();
                self.delayed.get(&text).map_or(true, |&after| dumps > after)
                    && self.timed.get(&text).map_or(true, |&after| elapsed >= after)
            });
        }
        Ok(tree)
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), DriverError> {
        let screen = self.current_screen();
        let target = self
            .element_at(&screen, x, y)
            .and_then(|e| e.text)
            .and_then(|text| self.transitions.get(&(screen.clone(), text)).cloned());
        let mut state = self.state.lock().unwrap();
        state.events.push(DeviceEvent::Tap(x, y));
        if let Some(next) = target {
            state.stack.push(next);
        }
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.state.lock().unwrap().events.push(DeviceEvent::LongPress(x, y));
        Ok(())
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .events
            .push(DeviceEvent::Swipe(start_x, start_y, end_x, end_y, steps));
        Ok(())
    }

    async fn press_back(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(DeviceEvent::Back);
        if state.stack.len() > 1 {
            state.stack.pop();
        }
        Ok(())
    }

    async fn set_orientation(&self, orientation: Orientation) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(DeviceEvent::Orientation(orientation));
        state.orientation = orientation;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn relaunch(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(DeviceEvent::Relaunch);
        state.stack = vec![HOME.to_string()];
        Ok(())
    }
}

/// The NCL app: a home screen with three entry points, each opening a page.
pub fn ncl_app() -> MockDevice {
    ncl_home(&["Welcome to NCL", "Customer Login", "Staff Access", "Admin Portal"])
}

/// The NCL app with a custom home screen.
pub fn ncl_home(home: &[&str]) -> MockDevice {
    MockDevice::new()
        .screen(HOME, home)
        .screen("customer", &["Sign in"])
        .screen("staff", &["Staff sign in"])
        .screen("admin", &["Admin dashboard"])
        .transition(HOME, "Customer Login", "customer")
        .transition(HOME, "Staff Access", "staff")
        .transition(HOME, "Admin Portal", "admin")
}

/// Returns the device both as the concrete mock and as a trait object.
pub fn shared(device: MockDevice) -> (Arc<MockDevice>, Arc<dyn DeviceDriver>) {
    let device = Arc::new(device);
    let driver: Arc<dyn DeviceDriver> = device.clone();
    (device, driver)
}

pub fn session_on(driver: Arc<dyn DeviceDriver>) -> DeviceSession {
    DeviceSession::new(driver, "test")
}

/// Default config: fixed waits, no relaunch package.
pub fn config() -> DroidwalkConfig {
    DroidwalkConfig { action_log: false, ..Default::default() }
}
