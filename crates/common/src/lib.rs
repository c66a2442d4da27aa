//! Common utilities for vpad-bus
//!
//! This crate provides shared functionality between the bus core and the
//! hosts that drive it: error handling, logging setup, and the async channel
//! bridge between a Tokio runtime and the blocking bus worker thread.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{BusBridge, BusCommand, BusEvent, BusWorker, create_bus_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
