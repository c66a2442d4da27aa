//! Async channel bridge between Tokio runtime and the bus worker thread

use async_channel::{Receiver, Sender, bounded};
use protocol::{PlugInRecord, RequestContext, TargetInfo, UnplugRecord, UnplugReport};
use tokio::sync::oneshot;

/// Capacity of both the command and the event channel
const CHANNEL_CAPACITY: usize = 256;

/// Commands from Tokio runtime to the bus worker thread
#[derive(Debug)]
pub enum BusCommand {
    /// Plug in a new target
    PlugIn {
        /// Raw plug-in record as delivered by the transport
        request: Vec<u8>,
        /// Session context of the caller
        context: RequestContext,
        /// Channel to send the number of consumed bytes back
        response: oneshot::Sender<protocol::Result<usize>>,
    },

    /// Unplug one target or all targets of a session
    Unplug {
        /// Raw unplug record as delivered by the transport
        request: Vec<u8>,
        /// Session context of the caller
        context: RequestContext,
        /// Channel to send response back
        response: oneshot::Sender<protocol::Result<UnplugReport>>,
    },

    /// List every registry entry, present or missing
    ListTargets {
        /// Channel to send response back
        response: oneshot::Sender<Vec<TargetInfo>>,
    },

    /// Remove missing entries and release their targets
    Reclaim {
        /// Channel to send the reclaimed entries back
        response: oneshot::Sender<Vec<TargetInfo>>,
    },

    /// Shutdown the worker thread gracefully
    Shutdown,
}

/// Presence transitions reported by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// Target became visible and should be surfaced
    TargetPresent {
        /// Entry state after the transition
        target: TargetInfo,
    },

    /// Target was unplugged and should disappear
    TargetMissing {
        /// Entry state after the transition
        target: TargetInfo,
    },

    /// Missing entry was removed and its target released
    TargetReclaimed {
        /// Last state of the removed entry
        target: TargetInfo,
    },
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct BusBridge {
    cmd_tx: Sender<BusCommand>,
    event_rx: Receiver<BusEvent>,
}

impl BusBridge {
    /// Send a command to the worker thread
    pub async fn send_command(&self, cmd: BusCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the worker thread
    pub async fn recv_event(&self) -> crate::Result<BusEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Submit a raw plug-in request and wait for its outcome
    pub async fn plug_in(&self, request: Vec<u8>, context: RequestContext) -> crate::Result<usize> {
        let (response, rx) = oneshot::channel();
        self.send_command(BusCommand::PlugIn {
            request,
            context,
            response,
        })
        .await?;
        Ok(await_response(rx).await??)
    }

    /// Plug in a record built in-process
    pub async fn plug_in_record(
        &self,
        record: &PlugInRecord,
        context: RequestContext,
    ) -> crate::Result<usize> {
        self.plug_in(record.to_bytes(), context).await
    }

    /// Submit a raw unplug request and wait for its outcome
    pub async fn unplug(
        &self,
        request: Vec<u8>,
        context: RequestContext,
    ) -> crate::Result<UnplugReport> {
        let (response, rx) = oneshot::channel();
        self.send_command(BusCommand::Unplug {
            request,
            context,
            response,
        })
        .await?;
        Ok(await_response(rx).await??)
    }

    /// Unplug using a record built in-process
    pub async fn unplug_record(
        &self,
        record: &UnplugRecord,
        context: RequestContext,
    ) -> crate::Result<UnplugReport> {
        self.unplug(record.to_bytes(), context).await
    }

    /// Snapshot of the registry
    pub async fn list_targets(&self) -> crate::Result<Vec<TargetInfo>> {
        let (response, rx) = oneshot::channel();
        self.send_command(BusCommand::ListTargets { response }).await?;
        await_response(rx).await
    }

    /// Ask the worker to reclaim missing entries
    pub async fn reclaim(&self) -> crate::Result<Vec<TargetInfo>> {
        let (response, rx) = oneshot::channel();
        self.send_command(BusCommand::Reclaim { response }).await?;
        await_response(rx).await
    }

    /// Ask the worker thread to stop
    pub async fn shutdown(&self) -> crate::Result<()> {
        self.send_command(BusCommand::Shutdown).await
    }
}

async fn await_response<T>(rx: oneshot::Receiver<T>) -> crate::Result<T> {
    rx.await
        .map_err(|_| crate::Error::Channel("Bus worker dropped the response channel".to_string()))
}

/// Handle for the bus worker thread (blocking)
pub struct BusWorker {
    pub(crate) cmd_rx: Receiver<BusCommand>,
    /// Event sender (public so surfacing sinks can report transitions)
    pub event_tx: Sender<BusEvent>,
}

impl BusWorker {
    /// Receive a command from Tokio runtime (blocking)
    pub fn recv_command(&self) -> crate::Result<BusCommand> {
        self.cmd_rx
            .recv_blocking()
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Try to receive a command without blocking
    pub fn try_recv_command(&self) -> Option<BusCommand> {
        self.cmd_rx.try_recv().ok()
    }

    /// Send an event to Tokio runtime (blocking)
    pub fn send_event(&self, event: BusEvent) -> crate::Result<()> {
        self.event_tx
            .send_blocking(event)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }
}

/// Create the channel bridge between Tokio and the bus worker thread
///
/// Returns (BusBridge for Tokio, BusWorker for the worker thread)
pub fn create_bus_bridge() -> (BusBridge, BusWorker) {
    let (cmd_tx, cmd_rx) = bounded(CHANNEL_CAPACITY);
    let (event_tx, event_rx) = bounded(CHANNEL_CAPACITY);

    (
        BusBridge { cmd_tx, event_rx },
        BusWorker { cmd_rx, event_tx },
    )
}
