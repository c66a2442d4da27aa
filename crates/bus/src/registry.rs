//! Device registry
//!
//! Table of every target the bus knows about, keyed by serial number. An entry
//! moves `Present -> Missing` and is then reclaimed; it never returns to
//! `Present`. Plugging a serial number whose entry is missing replaces that
//! entry with a fresh one.
//!
//! All reads and writes go through one registry-wide mutex. Surface
//! notifications happen while the lock is held so that a transition and its
//! notification are atomic with respect to other callers.

use crate::surface::DeviceSurface;
use crate::target::Target;
use protocol::{BusError, Presence, Result, SerialNo, SessionId, TargetInfo};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, trace};

/// One registry slot
#[derive(Debug)]
pub struct RegistryEntry {
    serial_no: SerialNo,
    session_id: SessionId,
    presence: Presence,
    target: Target,
}

impl RegistryEntry {
    fn present(target: Target) -> Self {
        Self {
            serial_no: target.serial_no(),
            session_id: target.session_id(),
            presence: Presence::Present,
            target,
        }
    }

    pub fn serial_no(&self) -> SerialNo {
        self.serial_no
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn info(&self) -> TargetInfo {
        self.target.info(self.presence)
    }
}

/// Registry of present and missing targets
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    entries: Mutex<HashMap<SerialNo, RegistryEntry>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SerialNo, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a prepared target as present
    ///
    /// Fails with `AlreadyExists` if a present entry holds the same serial
    /// number; the new target is dropped and the registry is unchanged. A
    /// missing entry is replaced and its target released. If the surface
    /// rejects the transition nothing is inserted.
    pub fn insert_present(
        &self,
        target: Target,
        surface: &dyn DeviceSurface,
    ) -> Result<TargetInfo> {
        let serial_no = target.serial_no();
        let mut entries = self.lock();

        if let Some(existing) = entries.get(&serial_no)
            && existing.presence == Presence::Present
        {
            error!("Target with serial no. {} already exists", serial_no);
            return Err(BusError::AlreadyExists { serial_no });
        }

        let info = target.info(Presence::Present);
        surface.present(&info).map_err(|e| {
            error!("Surfacing target {} failed: {}", serial_no, e);
            BusError::PrepareFailed {
                serial_no,
                reason: e.to_string(),
            }
        })?;

        if let Some(stale) = entries.insert(serial_no, RegistryEntry::present(target)) {
            debug!("Replaced missing entry {}", stale.info());
        }

        Ok(info)
    }

    /// Flip every present entry accepted by `matches` to missing
    ///
    /// One locked pass over the table. A transition the surface rejects is
    /// logged and the entry stays present; the pass continues either way.
    /// Returns the flipped serial numbers in ascending order.
    pub fn mark_missing_where<F>(
        &self,
        mut matches: F,
        surface: &dyn DeviceSurface,
    ) -> Vec<SerialNo>
    where
        F: FnMut(&RegistryEntry) -> bool,
    {
        let mut entries = self.lock();
        let mut flipped = Vec::new();

        for entry in entries.values_mut() {
            if entry.presence != Presence::Present || !matches(entry) {
                continue;
            }

            let info = entry.target.info(Presence::Missing);
            match surface.missing(&info) {
                Ok(()) => {
                    trace!("Marked {} missing", entry.serial_no);
                    entry.presence = Presence::Missing;
                    flipped.push(entry.serial_no);
                }
                Err(e) => {
                    error!("Failed to mark target {} missing: {}", entry.serial_no, e);
                }
            }
        }

        flipped.sort_unstable();
        flipped
    }

    /// Remove every missing entry and release its target
    pub fn reclaim_missing(&self) -> Vec<TargetInfo> {
        let mut entries = self.lock();
        let missing: Vec<SerialNo> = entries
            .values()
            .filter(|e| e.presence == Presence::Missing)
            .map(|e| e.serial_no)
            .collect();

        let mut reclaimed: Vec<TargetInfo> = missing
            .into_iter()
            .filter_map(|serial| entries.remove(&serial))
            .map(|entry| entry.info())
            .collect();

        reclaimed.sort_by_key(|t| t.serial_no);
        reclaimed
    }

    /// Every entry, sorted by serial number
    pub fn snapshot(&self) -> Vec<TargetInfo> {
        let mut targets: Vec<TargetInfo> =
            self.lock().values().map(RegistryEntry::info).collect();
        targets.sort_by_key(|t| t.serial_no);
        targets
    }

    pub fn get(&self, serial_no: SerialNo) -> Option<TargetInfo> {
        self.lock().get(&serial_no).map(RegistryEntry::info)
    }

    pub fn present_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|e| e.presence == Presence::Present)
            .count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
