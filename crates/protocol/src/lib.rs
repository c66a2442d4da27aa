//! Request protocol for the virtual gamepad bus
//!
//! This crate defines what travels between a transport and the bus core:
//! the fixed-size plug-in and unplug request records, the identities they
//! carry (serial number, session, target kind), and the error taxonomy every
//! request resolves to.
//!
//! # Example
//!
//! ```
//! use protocol::{PlugInRecord, SerialNo, TargetKind, PLUGIN_RECORD_SIZE};
//!
//! // Build a request for an Xbox 360 target with default IDs
//! let record = PlugInRecord::new(SerialNo(1), TargetKind::Xbox360Wired);
//!
//! // Encode it as a transport would deliver it
//! let bytes = record.to_bytes();
//! assert_eq!(bytes.len(), PLUGIN_RECORD_SIZE);
//!
//! // Decode with size validation
//! let decoded = PlugInRecord::decode(&bytes).unwrap();
//! assert_eq!(decoded.serial_no, SerialNo(1));
//! ```
//!
//! # Size validation
//!
//! Buffers whose length or declared size differ from the record layout are
//! rejected before any field is interpreted:
//!
//! ```
//! use protocol::{ErrorKind, UnplugRecord};
//!
//! let err = UnplugRecord::decode(&[4, 0, 0, 0]).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidParameter);
//! ```

pub mod error;
pub mod records;
pub mod types;

pub use error::{BusError, ErrorKind, InvalidParameter, Result};
pub use records::{PLUGIN_RECORD_SIZE, PlugInRecord, UNPLUG_RECORD_SIZE, UnplugRecord};
pub use types::{
    DUALSHOCK4_WIRED_IDS, Presence, RequestContext, SerialNo, SessionId, TargetInfo, TargetKind,
    UnplugReport, VendorProduct, XBOX360_WIRED_IDS,
};
