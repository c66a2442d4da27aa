//! Virtual targets
//!
//! A target is the type-specific half of a registry entry. Both kinds share a
//! [`TargetIdentity`] fixed at construction; everything else is produced by
//! [`Target::prepare`], which runs before the target is handed to the
//! registry and never touches it.

pub mod ds4;
pub mod slots;
pub mod xusb;

pub use ds4::Ds4Target;
pub use slots::{SlotGuard, SlotPool};
pub use xusb::XusbTarget;

use protocol::{Presence, SerialNo, SessionId, TargetInfo, TargetKind, VendorProduct};
use std::sync::Arc;
use thiserror::Error;

/// Identity shared by every target kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetIdentity {
    pub serial_no: SerialNo,
    pub session_id: SessionId,
    pub ids: VendorProduct,
}

/// Type-specific preparation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrepareError {
    #[error("target already prepared")]
    AlreadyPrepared,
}

/// Resources shared by all targets of one bus
#[derive(Debug, Clone)]
pub struct PrepareContext {
    xusb_slots: Arc<SlotPool>,
}

impl PrepareContext {
    pub fn new() -> Self {
        Self {
            xusb_slots: SlotPool::new(),
        }
    }

    /// Pool of XUSB user indices
    pub fn xusb_slots(&self) -> &Arc<SlotPool> {
        &self.xusb_slots
    }
}

impl Default for PrepareContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Emulated controller attached to a registry entry
#[derive(Debug)]
pub enum Target {
    Xusb(XusbTarget),
    Ds4(Ds4Target),
}

impl Target {
    pub fn identity(&self) -> &TargetIdentity {
        match self {
            Target::Xusb(t) => t.identity(),
            Target::Ds4(t) => t.identity(),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Xusb(_) => TargetKind::Xbox360Wired,
            Target::Ds4(_) => TargetKind::DualShock4Wired,
        }
    }

    pub fn serial_no(&self) -> SerialNo {
        self.identity().serial_no
    }

    pub fn session_id(&self) -> SessionId {
        self.identity().session_id
    }

    pub fn ids(&self) -> VendorProduct {
        self.identity().ids
    }

    /// Run the type-specific preparation step
    pub fn prepare(&mut self, ctx: &PrepareContext) -> Result<(), PrepareError> {
        match self {
            Target::Xusb(t) => t.prepare(ctx),
            Target::Ds4(t) => t.prepare(),
        }
    }

    pub fn is_prepared(&self) -> bool {
        match self {
            Target::Xusb(t) => t.hardware_id().is_some(),
            Target::Ds4(t) => t.hardware_id().is_some(),
        }
    }

    /// Hardware ID string handed to the device surface, once prepared
    pub fn hardware_id(&self) -> Option<&str> {
        match self {
            Target::Xusb(t) => t.hardware_id(),
            Target::Ds4(t) => t.hardware_id(),
        }
    }

    /// Snapshot of this target with the given presence
    pub fn info(&self, presence: Presence) -> TargetInfo {
        let identity = self.identity();
        TargetInfo {
            serial_no: identity.serial_no,
            session_id: identity.session_id,
            kind: self.kind(),
            ids: identity.ids,
            presence,
        }
    }
}

/// `USB\VID_xxxx&PID_xxxx`
pub(crate) fn hardware_id(ids: VendorProduct) -> String {
    format!("USB\\VID_{:04X}&PID_{:04X}", ids.vendor_id, ids.product_id)
}
