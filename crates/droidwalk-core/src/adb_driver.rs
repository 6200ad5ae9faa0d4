//! [`DeviceDriver`] backend that talks to a device through adb.
//!
//! Every call shells out to the `adb` executable, so each operation runs on
//! tokio's blocking pool via [`tokio::task::spawn_blocking`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::adb::{swipe_duration_ms, Adb, AdbError, KEYCODE_BACK};
use crate::config::DroidwalkConfig;
use crate::driver::{DeviceDriver, DriverError, Orientation};
use crate::element::UIElement;
use crate::hierarchy::parse_hierarchy;

/// Application launched by [`DeviceDriver::relaunch`].
#[derive(Debug, Clone)]
pub struct LaunchTarget {
    pub package: String,
    pub activity: Option<String>,
}

/// Automation backend over the Android Debug Bridge.
pub struct AdbDriver {
    adb: Arc<Adb>,
    requested_serial: Option<String>,
    serial: Option<String>,
    launch: Option<LaunchTarget>,
    long_press_ms: u32,
}

impl AdbDriver {
    /// Creates a driver. It is **not** connected yet; call
    /// [`connect`](DeviceDriver::connect) first.
    ///
    /// # Arguments
    ///
    /// * `adb` - The adb wrapper to use
    /// * `serial` - The device serial, or `None` for the first online device
    pub fn new(adb: Adb, serial: Option<String>) -> Self {
        Self {
            adb: Arc::new(adb),
            requested_serial: serial,
            serial: None,
            launch: None,
            long_press_ms: 1500,
        }
    }

    /// Creates a driver from the persisted configuration.
    pub fn from_config(config: &DroidwalkConfig) -> Self {
        let adb = match config.adb_path {
            Some(ref path) => Adb::with_path(path),
            None => Adb::new(),
        };
        let mut driver = Self::new(adb, config.serial.clone());
        driver.long_press_ms = config.long_press_ms;
        driver.launch = config.package.as_ref().map(|package| LaunchTarget {
            package: package.clone(),
            activity: config.activity.clone(),
        });
        driver
    }

    /// The serial this driver is bound to, once connected.
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    fn bound_serial(&self) -> Result<String, DriverError> {
        self.serial.clone().ok_or(DriverError::NotConnected)
    }

    /// Runs `f` against the adb wrapper on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T, DriverError>
    where
        T: Send + 'static,
        F: FnOnce(&Adb, &str) -> Result<T, AdbError> + Send + 'static,
    {
        let serial = self.bound_serial()?;
        let adb = Arc::clone(&self.adb);
        tokio::task::spawn_blocking(move || f(&adb, &serial))
            .await
            .map_err(|e| DriverError::Join(e.to_string()))?
            .map_err(DriverError::from)
    }
}

#[async_trait]
impl DeviceDriver for AdbDriver {
    async fn connect(&mut self) -> Result<(), DriverError> {
        let adb = Arc::clone(&self.adb);
        let requested = self.requested_serial.clone();
        let serial = tokio::task::spawn_blocking(move || -> Result<String, AdbError> {
            let devices = adb.list_devices()?;
            match requested {
                Some(serial) => devices
                    .iter()
                    .find(|d| d.serial == serial && d.is_online())
                    .map(|d| d.serial.clone())
                    .ok_or(AdbError::NoDevice),
                None => Adb::find_online_device(&devices)
                    .map(|d| d.serial.clone())
                    .ok_or(AdbError::NoDevice),
            }
        })
        .await
        .map_err(|e| DriverError::Join(e.to_string()))??;

        info!(%serial, "connected to device");
        self.serial = Some(serial);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.serial.is_some()
    }

    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        let xml = self.blocking(|adb, serial| adb.dump_hierarchy(serial)).await?;
        let tree = parse_hierarchy(&xml)?;
        debug!(roots = tree.len(), bytes = xml.len(), "hierarchy dumped");
        Ok(tree)
    }

    async fn tap(&self, x: i32, y: i32) -> Result<(), DriverError> {
        self.blocking(move |adb, serial| adb.tap(serial, x, y)).await
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<(), DriverError> {
        let duration_ms = self.long_press_ms;
        self.blocking(move |adb, serial| adb.long_press(serial, x, y, duration_ms)).await
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        steps: u32,
    ) -> Result<(), DriverError> {
        let duration_ms = swipe_duration_ms(steps);
        self.blocking(move |adb, serial| {
            adb.swipe(serial, (start_x, start_y), (end_x, end_y), duration_ms)
        })
        .await
    }

    async fn press_back(&self) -> Result<(), DriverError> {
        self.blocking(|adb, serial| adb.key_event(serial, KEYCODE_BACK)).await
    }

    async fn set_orientation(&self, orientation: Orientation) -> Result<(), DriverError> {
        self.blocking(move |adb, serial| adb.set_rotation(serial, orientation)).await
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.blocking(|adb, serial| adb.screenshot(serial)).await
    }

    async fn relaunch(&self) -> Result<(), DriverError> {
        let Some(target) = self.launch.clone() else {
            return Ok(());
        };
        info!(package = %target.package, "relaunching application");
        self.blocking(move |adb, serial| {
            adb.force_stop(serial, &target.package)?;
            adb.launch(serial, &target.package, target.activity.as_deref())
        })
        .await
    }
}
