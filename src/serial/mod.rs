//! Serial communication module
//!
//! This module provides functionality for:
//! - Listing and auto-detecting USB-to-serial adapters (feature `serial`)
//! - Line-oriented reads from the analyzer's serial link
//! - Headless terminal monitoring with capture logging

pub mod monitor;
#[cfg(feature = "serial")]
pub mod port;

pub use monitor::{MonitorConfig, SweepMonitor};
#[cfg(feature = "serial")]
pub use port::{PortConfig, SerialConnection};
