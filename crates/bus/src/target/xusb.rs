//! Xbox 360 wired (XUSB) target

use super::{PrepareContext, PrepareError, SlotGuard, TargetIdentity, hardware_id};
use tracing::debug;

#[derive(Debug)]
pub struct XusbTarget {
    identity: TargetIdentity,
    slot: Option<SlotGuard>,
    hardware_id: Option<String>,
}

impl XusbTarget {
    pub fn new(identity: TargetIdentity) -> Self {
        Self {
            identity,
            slot: None,
            hardware_id: None,
        }
    }

    pub fn identity(&self) -> &TargetIdentity {
        &self.identity
    }

    /// Claim a user index and build the hardware ID
    ///
    /// The index stays claimed for as long as the target lives.
    pub fn prepare(&mut self, ctx: &PrepareContext) -> Result<(), PrepareError> {
        if self.slot.is_some() {
            return Err(PrepareError::AlreadyPrepared);
        }

        let slot = ctx.xusb_slots().claim();

        debug!(
            "XUSB target {} assigned user index {}",
            self.identity.serial_no,
            slot.index()
        );

        self.hardware_id = Some(hardware_id(self.identity.ids));
        self.slot = Some(slot);
        Ok(())
    }

    /// Assigned user index (LED number)
    pub fn user_index(&self) -> Option<u32> {
        self.slot.as_ref().map(SlotGuard::index)
    }

    pub fn hardware_id(&self) -> Option<&str> {
        self.hardware_id.as_deref()
    }
}
