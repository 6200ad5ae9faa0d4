//! # droidwalk-core
//!
//! Core library for scripted UI walkthroughs of Android applications.
//!
//! This crate provides the element model and selectors used to query a
//! device's window hierarchy, an `adb`-backed automation driver, the device
//! session and element handles the walkthrough procedures are written
//! against, and the walkthrough itself.
//!
//! ## Modules
//!
//! - [`adb`] - Wrapper around the `adb` CLI for device control
//! - [`hierarchy`] - uiautomator XML parsing and local element search
//! - [`driver`] - The backend-agnostic [`DeviceDriver`](driver::DeviceDriver) trait
//! - [`adb_driver`] - `DeviceDriver` implementation over adb
//! - [`session`] - Device session and element handles with action logging
//! - [`walkthrough`] - The three walkthrough procedures and their runner
//!
//! ## External Dependencies
//!
//! The adb backend requires the Android platform tools (`adb`) and a device
//! or emulator that shows up as `device` in `adb devices`.
//!
//! ## Example
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
//! let session = DeviceSession::new(Arc::new(driver), "example");
//!
//! let welcome = session.find_object(Selector::text_view("Welcome to NCL"));
//! assert!(welcome.exists().await?);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod adb;
pub mod adb_driver;
pub mod config;
pub mod driver;
pub mod element;
pub mod hierarchy;
pub mod selector;
pub mod session;
pub mod walkthrough;
