//! Test utilities for vpad-bus
//!
//! Provides request builders and helper functions for testing across crates.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{mock_target_info, plugin_bytes};
//! use protocol::{Presence, TargetKind};
//!
//! # fn main() {
//! let info = mock_target_info(7, 1, TargetKind::Xbox360Wired, Presence::Present);
//! assert_eq!(info.ids.vendor_id, 0x045E);
//!
//! let bytes = plugin_bytes(7, TargetKind::Xbox360Wired);
//! assert_eq!(bytes.len(), protocol::PLUGIN_RECORD_SIZE);
//! # }
//! ```

use protocol::{
    PlugInRecord, Presence, RequestContext, SerialNo, SessionId, TargetInfo, TargetKind,
    UnplugRecord,
};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default test timeout (5 seconds)
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a TargetInfo with the default IDs of `kind`
pub fn mock_target_info(
    serial: u32,
    session: u32,
    kind: TargetKind,
    presence: Presence,
) -> TargetInfo {
    TargetInfo {
        serial_no: SerialNo(serial),
        session_id: SessionId(session),
        kind,
        ids: kind.default_ids(),
        presence,
    }
}

/// Encoded plug-in request with default IDs
pub fn plugin_bytes(serial: u32, kind: TargetKind) -> Vec<u8> {
    PlugInRecord::new(SerialNo(serial), kind).to_bytes()
}

/// Encoded plug-in request with a raw (possibly unsupported) type tag
pub fn plugin_bytes_raw(
    serial: u32,
    target_type: u32,
    vendor_id: u16,
    product_id: u16,
) -> Vec<u8> {
    let mut record = PlugInRecord::new(SerialNo(serial), TargetKind::Xbox360Wired)
        .with_ids(vendor_id, product_id);
    record.target_type = target_type;
    record.to_bytes()
}

/// Encoded unplug request (0 = wildcard)
pub fn unplug_bytes(serial: u32) -> Vec<u8> {
    UnplugRecord::new(SerialNo(serial)).to_bytes()
}

/// Ordinary session context
pub fn session(id: u32) -> RequestContext {
    RequestContext::session(SessionId(id))
}

/// Privileged context
pub fn internal(id: u32) -> RequestContext {
    RequestContext::internal(SessionId(id))
}

/// Timeout wrapper for async tests
///
/// Wraps an async operation with a timeout to prevent tests from hanging.
///
/// # Example
/// ```ignore
/// use common::test_utils::{with_timeout, DEFAULT_TEST_TIMEOUT};
///
/// #[tokio::test]
/// async fn test_with_timeout() {
///     let result = with_timeout(DEFAULT_TEST_TIMEOUT, async { 42 }).await.unwrap();
///     assert_eq!(result, 42);
/// }
/// ```
pub async fn with_timeout<T, F>(duration: Duration, future: F) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { duration })
}

/// Error returned when a test times out
#[derive(Debug, Error)]
#[error("Test timed out after {duration:?}")]
pub struct TimeoutError {
    /// The timeout duration that was exceeded
    pub duration: Duration,
}
