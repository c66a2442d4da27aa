//! Device surface notifications
//!
//! Every presence transition reaches the surface exactly once, and a surface
//! that refuses a transition never leaves the registry half-updated.

use bus::{Bus, ChannelSurface, DeviceSurface, SurfaceError};
use common::BusEvent;
use common::test_utils::{internal, plugin_bytes, session, unplug_bytes};
use protocol::{BusError, Presence, SerialNo, TargetInfo, TargetKind};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Records every call and refuses transitions for selected serial numbers
#[derive(Default)]
struct RecordingSurface {
    calls: Mutex<Vec<(Presence, SerialNo)>>,
    refuse_present: HashSet<u32>,
    refuse_missing: HashSet<u32>,
}

impl RecordingSurface {
    fn refusing(present: &[u32], missing: &[u32]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            refuse_present: present.iter().copied().collect(),
            refuse_missing: missing.iter().copied().collect(),
        }
    }

    fn calls(&self) -> Vec<(Presence, SerialNo)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(
        &self,
        presence: Presence,
        target: &TargetInfo,
        refused: &HashSet<u32>,
    ) -> Result<(), SurfaceError> {
        assert_eq!(target.presence, presence);
        self.calls.lock().unwrap().push((presence, target.serial_no));
        if refused.contains(&target.serial_no.0) {
            return Err(SurfaceError::Rejected {
                serial_no: target.serial_no,
                reason: "device node busy".to_string(),
            });
        }
        Ok(())
    }
}

impl DeviceSurface for RecordingSurface {
    fn present(&self, target: &TargetInfo) -> Result<(), SurfaceError> {
        self.record(Presence::Present, target, &self.refuse_present)
    }

    fn missing(&self, target: &TargetInfo) -> Result<(), SurfaceError> {
        self.record(Presence::Missing, target, &self.refuse_missing)
    }
}

#[test]
fn test_each_transition_reported_once() {
    let surface = Arc::new(RecordingSurface::default());
    let bus = Bus::new(surface.clone());

    bus.plug_in(&plugin_bytes(1, TargetKind::Xbox360Wired), &session(1))
        .unwrap();
    // Rejected duplicate and no-op unplugs produce no calls
    let _ = bus.plug_in(&plugin_bytes(1, TargetKind::Xbox360Wired), &session(1));
    bus.unplug(&unplug_bytes(1), &session(2)).unwrap();
    bus.unplug(&unplug_bytes(1), &session(1)).unwrap();
    bus.unplug(&unplug_bytes(1), &session(1)).unwrap();

    assert_eq!(
        surface.calls(),
        vec![
            (Presence::Present, SerialNo(1)),
            (Presence::Missing, SerialNo(1)),
        ]
    );
}

#[test]
fn test_refused_present_is_prepare_failure() {
    let surface = Arc::new(RecordingSurface::refusing(&[2], &[]));
    let bus = Bus::new(surface);

    let err = bus
        .plug_in(&plugin_bytes(2, TargetKind::DualShock4Wired), &session(1))
        .unwrap_err();

    assert!(matches!(
        err,
        BusError::PrepareFailed {
            serial_no: SerialNo(2),
            ..
        }
    ));
    assert!(bus.registry().is_empty());
    assert_eq!(bus.prepare_context().xusb_slots().in_use(), 0);
}

#[test]
fn test_refused_missing_keeps_entry_and_continues() {
    let surface = Arc::new(RecordingSurface::refusing(&[], &[2]));
    let bus = Bus::new(surface.clone());
    for serial in 1..=3 {
        bus.plug_in(&plugin_bytes(serial, TargetKind::Xbox360Wired), &session(1))
            .unwrap();
    }

    let report = bus.unplug(&unplug_bytes(0), &session(1)).unwrap();

    assert_eq!(report.unplugged, vec![SerialNo(1), SerialNo(3)]);
    assert_eq!(
        bus.registry().get(SerialNo(2)).unwrap().presence,
        Presence::Present
    );
    let missing_calls = surface
        .calls()
        .into_iter()
        .filter(|(p, _)| *p == Presence::Missing)
        .count();
    assert_eq!(missing_calls, 3);
}

#[test]
fn test_channel_surface_emits_bus_events() {
    let (tx, rx) = async_channel::bounded(16);
    let bus = Bus::new(Arc::new(ChannelSurface::new(tx)));

    bus.plug_in(&plugin_bytes(5, TargetKind::DualShock4Wired), &session(3))
        .unwrap();
    bus.unplug(&unplug_bytes(0), &internal(0)).unwrap();

    match rx.try_recv().unwrap() {
        BusEvent::TargetPresent { target } => {
            assert_eq!(target.serial_no, SerialNo(5));
            assert_eq!(target.presence, Presence::Present);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    match rx.try_recv().unwrap() {
        BusEvent::TargetMissing { target } => {
            assert_eq!(target.serial_no, SerialNo(5));
            assert_eq!(target.presence, Presence::Missing);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_closed_channel_blocks_plug_in() {
    let (tx, rx) = async_channel::bounded(1);
    drop(rx);
    let bus = Bus::new(Arc::new(ChannelSurface::new(tx)));

    assert!(matches!(
        bus.plug_in(&plugin_bytes(1, TargetKind::Xbox360Wired), &session(1)),
        Err(BusError::PrepareFailed { .. })
    ));
    assert!(bus.registry().is_empty());
}
