//! Bus worker thread
//!
//! Dedicated thread that executes bus commands received from the Tokio
//! runtime. Bus operations block on the registry lock and on the event
//! channel, so they never run on a runtime thread.

use crate::ops::Bus;
use common::{BusCommand, BusEvent, BusWorker};
use protocol::TargetInfo;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Bus worker thread
///
/// Owns the worker end of the bridge and processes commands until a
/// `Shutdown` arrives or every bridge handle is dropped.
pub struct BusWorkerThread {
    bus: Arc<Bus>,
    worker: BusWorker,
    /// Reclaim missing entries right after each unplug
    eager_reclaim: bool,
}

impl BusWorkerThread {
    pub fn new(worker: BusWorker, bus: Arc<Bus>, eager_reclaim: bool) -> Self {
        Self {
            bus,
            worker,
            eager_reclaim,
        }
    }

    /// Run the command loop
    pub fn run(self) {
        info!("Bus worker thread started");

        loop {
            match self.worker.recv_command() {
                Ok(BusCommand::Shutdown) => {
                    info!("Bus worker shutting down");
                    break;
                }
                Ok(cmd) => self.handle_command(cmd),
                Err(e) => {
                    info!("Bus bridge closed ({}), worker exiting", e);
                    break;
                }
            }
        }

        info!("Bus worker thread stopped");
    }

    /// Handle a command from the Tokio runtime
    fn handle_command(&self, cmd: BusCommand) {
        // Wrap in catch_unwind to prevent panics from killing the worker
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.handle_command_inner(cmd)
        }));

        if let Err(e) = result {
            error!("Panic in bus command handler: {:?}", e);
        }
    }

    /// Inner command handler (can panic, caught by handle_command)
    fn handle_command_inner(&self, cmd: BusCommand) {
        match cmd {
            BusCommand::PlugIn {
                request,
                context,
                response,
            } => {
                let result = self.bus.plug_in(&request, &context);
                let _ = response.send(result);
            }

            BusCommand::Unplug {
                request,
                context,
                response,
            } => {
                let result = self.bus.unplug(&request, &context);
                if self.eager_reclaim
                    && let Ok(report) = &result
                    && !report.unplugged.is_empty()
                {
                    self.reclaim();
                }
                let _ = response.send(result);
            }

            BusCommand::ListTargets { response } => {
                let targets = self.bus.list_targets();
                debug!("Listing {} targets", targets.len());
                let _ = response.send(targets);
            }

            BusCommand::Reclaim { response } => {
                let reclaimed = self.reclaim();
                let _ = response.send(reclaimed);
            }

            BusCommand::Shutdown => {
                // The run loop stops before dispatching shutdown
                warn!("Ignoring shutdown outside the run loop");
            }
        }
    }

    fn reclaim(&self) -> Vec<TargetInfo> {
        let reclaimed = self.bus.reclaim_missing();
        for target in &reclaimed {
            let event = BusEvent::TargetReclaimed {
                target: target.clone(),
            };
            if let Err(e) = self.worker.send_event(event) {
                warn!("Dropping reclaim event for {}: {}", target.serial_no, e);
            }
        }
        reclaimed
    }
}

/// Spawn the bus worker thread
pub fn spawn_bus_worker(
    worker: BusWorker,
    bus: Arc<Bus>,
    eager_reclaim: bool,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("bus-worker".to_string())
        .spawn(move || BusWorkerThread::new(worker, bus, eager_reclaim).run())
}
