//! Device surfacing sink
//!
//! The registry reports every presence transition to a [`DeviceSurface`]
//! while it still holds its lock, so each transition is delivered exactly
//! once and in registry order. Creating or removing the visible device node
//! is the surface's business.

use common::BusEvent;
use protocol::{SerialNo, TargetInfo};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Nobody is listening for transitions any more
    #[error("device surface channel closed")]
    Closed,

    #[error("device surface rejected target {serial_no}: {reason}")]
    Rejected { serial_no: SerialNo, reason: String },
}

/// Receiver of presence transitions
pub trait DeviceSurface: Send + Sync {
    /// Target became present and should be surfaced
    fn present(&self, target: &TargetInfo) -> Result<(), SurfaceError>;

    /// Target was unplugged and should disappear
    fn missing(&self, target: &TargetInfo) -> Result<(), SurfaceError>;
}

/// Surface that accepts every transition and does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl DeviceSurface for NullSurface {
    fn present(&self, target: &TargetInfo) -> Result<(), SurfaceError> {
        trace!("Surface present: {}", target);
        Ok(())
    }

    fn missing(&self, target: &TargetInfo) -> Result<(), SurfaceError> {
        trace!("Surface missing: {}", target);
        Ok(())
    }
}

/// Surface that forwards transitions as [`BusEvent`]s
///
/// Sends block while the event channel is full.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    event_tx: async_channel::Sender<BusEvent>,
}

impl ChannelSurface {
    pub fn new(event_tx: async_channel::Sender<BusEvent>) -> Self {
        Self { event_tx }
    }

    fn send(&self, event: BusEvent) -> Result<(), SurfaceError> {
        self.event_tx
            .send_blocking(event)
            .map_err(|_| SurfaceError::Closed)
    }
}

impl DeviceSurface for ChannelSurface {
    fn present(&self, target: &TargetInfo) -> Result<(), SurfaceError> {
        self.send(BusEvent::TargetPresent {
            target: target.clone(),
        })
    }

    fn missing(&self, target: &TargetInfo) -> Result<(), SurfaceError> {
        self.send(BusEvent::TargetMissing {
            target: target.clone(),
        })
    }
}
