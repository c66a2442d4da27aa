//! Virtual gamepad bus
//!
//! Keeps track of emulated controllers plugged into a virtual bus. Callers
//! plug targets in by serial number and unplug them again; every target is
//! owned by the session that plugged it in.
//!
//! # Architecture
//!
//! - [`target`]: Xbox 360 and DualShock 4 targets and their preparation step
//! - [`factory`]: raw type tag to unprepared target
//! - [`registry`]: serial number table with present/missing state
//! - [`ops`]: the [`Bus`] with its plug-in and unplug operations
//! - [`surface`]: sink for presence transitions
//! - [`worker`] and [`reclaim`]: the blocking worker thread and its Tokio helpers
//!
//! # Example
//!
//! ```
//! use bus::{Bus, NullSurface};
//! use protocol::{PlugInRecord, Presence, RequestContext, SerialNo, SessionId, TargetKind};
//! use std::sync::Arc;
//!
//! let bus = Bus::new(Arc::new(NullSurface));
//! let owner = RequestContext::session(SessionId(1));
//!
//! let record = PlugInRecord::new(SerialNo(7), TargetKind::Xbox360Wired);
//! bus.plug_in(&record.to_bytes(), &owner).unwrap();
//!
//! let report = bus.unplug_session(SessionId(1));
//! assert_eq!(report, vec![SerialNo(7)]);
//! assert_eq!(bus.registry().get(SerialNo(7)).unwrap().presence, Presence::Missing);
//! ```

pub mod config;
pub mod factory;
pub mod ops;
pub mod ownership;
pub mod reclaim;
pub mod registry;
pub mod surface;
pub mod target;
pub mod worker;

pub use config::BusConfig;
pub use ops::Bus;
pub use registry::{DeviceRegistry, RegistryEntry};
pub use surface::{ChannelSurface, DeviceSurface, NullSurface, SurfaceError};
pub use target::{PrepareContext, PrepareError, Target};
pub use worker::{BusWorkerThread, spawn_bus_worker};
