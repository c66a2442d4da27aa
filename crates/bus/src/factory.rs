//! Target factory
//!
//! Single entry point that turns a raw type tag into an unprepared [`Target`].
//! Creating a target has no effect on the registry.

use crate::target::{Ds4Target, Target, TargetIdentity, XusbTarget};
use protocol::{Result, SerialNo, SessionId, TargetKind, VendorProduct};
use tracing::{debug, error};

/// Create an unprepared target of the requested kind
///
/// The requested IDs are only used when both are non-zero; otherwise the
/// kind's default vendor/product pair applies.
pub fn create(
    target_type: u32,
    serial_no: SerialNo,
    session_id: SessionId,
    requested: VendorProduct,
) -> Result<Target> {
    let kind = TargetKind::try_from(target_type).inspect_err(|_| {
        error!("Unsupported target type: {}", target_type);
    })?;

    let ids = if requested.is_complete() {
        requested
    } else {
        kind.default_ids()
    };

    let identity = TargetIdentity {
        serial_no,
        session_id,
        ids,
    };

    debug!("Creating {} target {} [{}]", kind, serial_no, ids);

    Ok(match kind {
        TargetKind::Xbox360Wired => Target::Xusb(XusbTarget::new(identity)),
        TargetKind::DualShock4Wired => Target::Ds4(Ds4Target::new(identity)),
    })
}
