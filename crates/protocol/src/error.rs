//! Bus error types

use crate::types::SerialNo;
use thiserror::Error;

/// Errors returned by plug-in and unplug requests
///
/// Every failure a caller can observe is one of these four kinds. The detail
/// carried by each variant is enough to tell a malformed request apart from a
/// legitimate identity conflict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Malformed request or missing caller context
    #[error("Invalid parameter: {0}")]
    InvalidParameter(#[from] InvalidParameter),

    /// Requested target type is not emulated by this bus
    #[error("Unsupported target type: {0}")]
    UnsupportedType(u32),

    /// Type-specific target preparation failed
    #[error("Failed to prepare target {serial_no}: {reason}")]
    PrepareFailed { serial_no: SerialNo, reason: String },

    /// A present target already uses this serial number
    #[error("Target with serial number {serial_no} already exists")]
    AlreadyExists { serial_no: SerialNo },
}

/// Detail for [`BusError::InvalidParameter`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidParameter {
    /// Record size field or transport buffer length disagree with the record layout
    #[error("record size mismatch: expected {expected}, declared {declared}, buffer {actual}")]
    SizeMismatch {
        expected: usize,
        declared: usize,
        actual: usize,
    },

    /// Serial number 0 is reserved and cannot be plugged in
    #[error("serial number 0 is not allowed")]
    ZeroSerial,

    /// The transport could not resolve the calling session
    #[error("request carries no session context")]
    NoSession,
}

/// Error category, stable across detail changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    UnsupportedType,
    PrepareFailed,
    AlreadyExists,
}

impl ErrorKind {
    /// Numeric result code reported to transports (0 is success)
    pub fn status_code(self) -> u32 {
        match self {
            ErrorKind::InvalidParameter => 1,
            ErrorKind::UnsupportedType => 2,
            ErrorKind::PrepareFailed => 3,
            ErrorKind::AlreadyExists => 4,
        }
    }
}

impl BusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BusError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            BusError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            BusError::PrepareFailed { .. } => ErrorKind::PrepareFailed,
            BusError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
        }
    }
}

/// Type alias for bus results
pub type Result<T> = std::result::Result<T, BusError>;
