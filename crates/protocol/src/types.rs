//! Bus identity and target type definitions
//!
//! This module defines the identities a virtual target carries on the bus
//! (serial number, owning session), the supported target kinds with their
//! default USB IDs, and the read-only views handed out by the registry.

use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-chosen serial number of a virtual target
///
/// Unique among present targets at any instant. Zero is reserved: plug-in
/// rejects it and unplug treats it as "every target".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SerialNo(pub u32);

impl SerialNo {
    /// Wildcard serial number ("all targets" on unplug)
    pub const ALL: SerialNo = SerialNo(0);

    /// Whether this is the reserved wildcard value
    pub fn is_wildcard(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SerialNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of the session (connection) that issued a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl SessionId {
    /// Session used by the host for targets it declares itself
    pub const HOST: SessionId = SessionId(0);
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// USB vendor/product ID pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorProduct {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl VendorProduct {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// An override is only honoured when both IDs are non-zero
    pub fn is_complete(&self) -> bool {
        self.vendor_id != 0 && self.product_id != 0
    }
}

impl fmt::Display for VendorProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)
    }
}

/// Kind of emulated controller
///
/// Numeric tags are the values carried in the plug-in record's type field.
/// Tag 1 belongs to a wired Xbox One target the bus never implemented and is
/// rejected as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum TargetKind {
    /// Microsoft Xbox 360 wired controller (XUSB)
    #[serde(rename = "xbox360-wired")]
    Xbox360Wired = 0,
    /// Sony DualShock 4 wired controller
    #[serde(rename = "dualshock4-wired")]
    DualShock4Wired = 2,
}

/// Xbox 360 wired controller (Microsoft)
pub const XBOX360_WIRED_IDS: VendorProduct = VendorProduct::new(0x045E, 0x028E);

/// DualShock 4 wired controller (Sony)
pub const DUALSHOCK4_WIRED_IDS: VendorProduct = VendorProduct::new(0x054C, 0x05C4);

impl TargetKind {
    /// Built-in vendor/product pair used when a request carries no override
    pub const fn default_ids(self) -> VendorProduct {
        match self {
            TargetKind::Xbox360Wired => XBOX360_WIRED_IDS,
            TargetKind::DualShock4Wired => DUALSHOCK4_WIRED_IDS,
        }
    }

    /// Raw tag as carried on the wire
    pub fn as_raw(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for TargetKind {
    type Error = BusError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TargetKind::Xbox360Wired),
            2 => Ok(TargetKind::DualShock4Wired),
            other => Err(BusError::UnsupportedType(other)),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Xbox360Wired => write!(f, "Xbox 360 wired"),
            TargetKind::DualShock4Wired => write!(f, "DualShock 4 wired"),
        }
    }
}

/// Visibility of a registry entry to the rest of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Missing,
}

/// Per-request caller context supplied by the transport
///
/// `session` is `None` when the transport could not resolve the connection a
/// request arrived on. `internal` marks the privileged path that may unplug
/// targets owned by any session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestContext {
    pub session: Option<SessionId>,
    pub internal: bool,
}

impl RequestContext {
    /// Context of an ordinary session
    pub fn session(session: SessionId) -> Self {
        Self {
            session: Some(session),
            internal: false,
        }
    }

    /// Privileged context used by the host itself
    pub fn internal(session: SessionId) -> Self {
        Self {
            session: Some(session),
            internal: true,
        }
    }

    /// Context for a request whose connection could not be resolved
    pub fn unresolved() -> Self {
        Self {
            session: None,
            internal: false,
        }
    }
}

/// Snapshot of one registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetInfo {
    pub serial_no: SerialNo,
    pub session_id: SessionId,
    pub kind: TargetKind,
    pub ids: VendorProduct,
    pub presence: Presence,
}

impl fmt::Display for TargetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} [{}] session={} {:?}",
            self.serial_no, self.kind, self.ids, self.session_id, self.presence
        )
    }
}

/// Outcome of an unplug request
///
/// Unplug never fails for unknown or foreign serial numbers, so the list of
/// flipped targets is the only way to tell whether anything happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnplugReport {
    /// Bytes consumed from the request buffer
    pub transferred: usize,
    /// Serial numbers marked missing by this request
    pub unplugged: Vec<SerialNo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_wildcard() {
        assert!(SerialNo::ALL.is_wildcard());
        assert!(!SerialNo(7).is_wildcard());
    }

    #[test]
    fn test_target_kind_tags() {
        assert_eq!(TargetKind::try_from(0).unwrap(), TargetKind::Xbox360Wired);
        assert_eq!(TargetKind::try_from(2).unwrap(), TargetKind::DualShock4Wired);
        assert_eq!(TargetKind::DualShock4Wired.as_raw(), 2);
    }

    #[test]
    fn test_unimplemented_kind_rejected() {
        assert!(matches!(
            TargetKind::try_from(1),
            Err(BusError::UnsupportedType(1))
        ));
        assert!(matches!(
            TargetKind::try_from(99),
            Err(BusError::UnsupportedType(99))
        ));
    }

    #[test]
    fn test_default_ids() {
        assert_eq!(
            TargetKind::Xbox360Wired.default_ids(),
            VendorProduct::new(0x045E, 0x028E)
        );
        assert_eq!(
            TargetKind::DualShock4Wired.default_ids(),
            VendorProduct::new(0x054C, 0x05C4)
        );
    }

    #[test]
    fn test_incomplete_override() {
        assert!(!VendorProduct::new(0, 0x1234).is_complete());
        assert!(!VendorProduct::new(0x1234, 0).is_complete());
        assert!(VendorProduct::new(0x1234, 0x5678).is_complete());
    }

    #[test]
    fn test_target_kind_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            kind: TargetKind,
        }

        let w: Wrapper = toml::from_str("kind = \"dualshock4-wired\"").unwrap();
        assert_eq!(w.kind, TargetKind::DualShock4Wired);
        let w: Wrapper = toml::from_str("kind = \"xbox360-wired\"").unwrap();
        assert_eq!(w.kind, TargetKind::Xbox360Wired);
    }
}
