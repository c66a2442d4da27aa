//! Plug-in and unplug operations
//!
//! [`Bus`] ties the record codec, the target factory, the registry and the
//! device surface together. Every call runs to completion on the caller's
//! thread; the registry lock is the only point of contention.
//!
//! # Plug-in
//!
//! Validation happens strictly before the registry is touched:
//! 1. record size (declared and actual)
//! 2. serial number must not be 0
//! 3. caller session must be known
//! 4. target kind must be supported
//! 5. type-specific preparation
//! 6. insert-or-replace in the registry
//!
//! # Unplug
//!
//! A single pass over present entries. Serial 0 matches every entry the
//! caller owns (every entry at all on the internal path). Unknown, foreign
//! and already missing serial numbers are silent no-ops.

use crate::factory;
use crate::ownership::may_unplug;
use crate::registry::DeviceRegistry;
use crate::surface::DeviceSurface;
use crate::target::PrepareContext;
use protocol::{
    BusError, InvalidParameter, PlugInRecord, RequestContext, Result, SerialNo, SessionId,
    TargetInfo, UnplugRecord, UnplugReport,
};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

/// Virtual gamepad bus
pub struct Bus {
    registry: DeviceRegistry,
    prepare: PrepareContext,
    surface: Arc<dyn DeviceSurface>,
}

impl Bus {
    /// Create an empty bus reporting transitions to `surface`
    pub fn new(surface: Arc<dyn DeviceSurface>) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            prepare: PrepareContext::default(),
            surface,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn prepare_context(&self) -> &PrepareContext {
        &self.prepare
    }

    /// Plug in a target from a raw request buffer
    ///
    /// Returns the number of bytes consumed.
    pub fn plug_in(&self, buf: &[u8], ctx: &RequestContext) -> Result<usize> {
        trace!("plug_in: {} byte request", buf.len());
        let record = PlugInRecord::decode(buf).inspect_err(|e| {
            error!("Rejected plug-in request: {}", e);
        })?;
        self.plug_in_record(&record, ctx)
    }

    /// Plug in a target from a decoded record
    pub fn plug_in_record(&self, record: &PlugInRecord, ctx: &RequestContext) -> Result<usize> {
        record.check_size().inspect_err(|e| {
            error!("Rejected plug-in request: {}", e);
        })?;

        if record.serial_no.is_wildcard() {
            error!("Serial no. 0 not allowed");
            return Err(InvalidParameter::ZeroSerial.into());
        }

        let session_id = ctx.session.ok_or_else(|| {
            error!("Plug-in of {} without session context", record.serial_no);
            BusError::from(InvalidParameter::NoSession)
        })?;

        let mut target = factory::create(
            record.target_type,
            record.serial_no,
            session_id,
            record.ids(),
        )?;

        target.prepare(&self.prepare).map_err(|e| {
            error!("Preparing target {} failed: {}", record.serial_no, e);
            BusError::PrepareFailed {
                serial_no: record.serial_no,
                reason: e.to_string(),
            }
        })?;

        let info = self
            .registry
            .insert_present(target, self.surface.as_ref())?;
        info!("Plugged in {}", info);

        Ok(record.size as usize)
    }

    /// Unplug from a raw request buffer
    pub fn unplug(&self, buf: &[u8], ctx: &RequestContext) -> Result<UnplugReport> {
        trace!("unplug: {} byte request", buf.len());
        let record = UnplugRecord::decode(buf).inspect_err(|e| {
            error!("Rejected unplug request: {}", e);
        })?;
        self.unplug_record(&record, ctx)
    }

    /// Unplug using a decoded record
    pub fn unplug_record(
        &self,
        record: &UnplugRecord,
        ctx: &RequestContext,
    ) -> Result<UnplugReport> {
        record.check_size().inspect_err(|e| {
            error!("Rejected unplug request: {}", e);
        })?;

        let caller = ctx.session.ok_or_else(|| {
            error!("Unplug of {} without session context", record.serial_no);
            BusError::from(InvalidParameter::NoSession)
        })?;

        let unplugged = self.unplug_matching(record.serial_no, caller, ctx.internal);

        Ok(UnplugReport {
            transferred: record.size as usize,
            unplugged,
        })
    }

    /// Unplug every target owned by a session that went away
    pub fn unplug_session(&self, session_id: SessionId) -> Vec<SerialNo> {
        self.unplug_matching(SerialNo::ALL, session_id, false)
    }

    /// Unplug every present target regardless of owner
    pub fn unplug_all(&self) -> Vec<SerialNo> {
        self.unplug_matching(SerialNo::ALL, SessionId::HOST, true)
    }

    fn unplug_matching(
        &self,
        serial_no: SerialNo,
        caller: SessionId,
        internal: bool,
    ) -> Vec<SerialNo> {
        let unplug_all = serial_no.is_wildcard();

        trace!("Starting registry traversal");
        let unplugged = self.registry.mark_missing_where(
            |entry| {
                if !unplug_all && entry.serial_no() != serial_no {
                    trace!(
                        "Seeking serial no. {}, skipping {}",
                        serial_no,
                        entry.serial_no()
                    );
                    return false;
                }

                let allowed = may_unplug(entry.session_id(), caller, internal);
                if !allowed {
                    trace!(
                        "Target {} owned by session {}, caller is {}",
                        entry.serial_no(),
                        entry.session_id(),
                        caller
                    );
                }
                allowed
            },
            self.surface.as_ref(),
        );
        trace!("Finished registry traversal");

        if !unplugged.is_empty() {
            info!("Unplugged {:?} for session {}", unplugged, caller);
        } else {
            debug!(
                "Unplug of {} by session {} matched nothing",
                serial_no, caller
            );
        }

        unplugged
    }

    /// Remove missing entries and release their targets
    pub fn reclaim_missing(&self) -> Vec<TargetInfo> {
        let reclaimed = self.registry.reclaim_missing();
        for target in &reclaimed {
            debug!("Reclaimed {}", target);
        }
        reclaimed
    }

    /// Snapshot of every entry, sorted by serial number
    pub fn list_targets(&self) -> Vec<TargetInfo> {
        self.registry.snapshot()
    }
}
