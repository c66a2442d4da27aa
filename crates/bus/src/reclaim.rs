//! Periodic reclamation of missing entries

use common::BusBridge;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

/// Spawn a task that asks the worker to reclaim missing entries every `period`
///
/// The task ends when the bridge to the worker is closed.
pub fn spawn_reclaimer(bridge: BusBridge, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match bridge.reclaim().await {
                Ok(reclaimed) if !reclaimed.is_empty() => {
                    debug!("Reclaimed {} missing target(s)", reclaimed.len());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Reclaimer stopping: {}", e);
                    break;
                }
            }
        }
    })
}
