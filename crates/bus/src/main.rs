//! vpad-bus host
//!
//! Runs the virtual gamepad bus: plugs in the targets declared in the
//! configuration, reclaims unplugged targets in the background and logs every
//! presence transition until Ctrl+C.

use anyhow::{Context, Result};
use bus::config::{BusConfig, TargetConfig};
use bus::reclaim::spawn_reclaimer;
use bus::{Bus, ChannelSurface, spawn_bus_worker};
use clap::Parser;
use common::{BusBridge, BusEvent, create_bus_bridge, setup_logging};
use protocol::{RequestContext, SessionId, UnplugRecord};
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "vpad-bus")]
#[command(author, version, about = "Virtual gamepad bus")]
#[command(long_about = "
Virtual bus for emulated Xbox 360 and DualShock 4 controllers.
Targets are plugged in by serial number and owned by the session that
plugged them in.

EXAMPLES:
    # Run with default config
    vpad-bus

    # Run with custom config
    vpad-bus --config /path/to/bus.toml

    # Plug in the configured targets, print the registry and exit
    vpad-bus --list-targets

    # Run with debug logging
    vpad-bus --log-level debug

CONFIGURATION:
    The bus looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/vpad-bus/bus.toml
    3. /etc/vpad-bus/bus.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Plug in configured targets, list the registry and exit
    #[arg(long)]
    list_targets: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = BusConfig::default();
        let path = BusConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    // Load configuration first (to get log level from config if not specified)
    let config = if let Some(ref path) = args.config {
        bus::config::load_config(path).context("Failed to load configuration")?
    } else {
        BusConfig::load_or_default()
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.bus.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("vpad-bus v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let (bridge, worker) = create_bus_bridge();
    let surface = Arc::new(ChannelSurface::new(worker.event_tx.clone()));
    let bus = Arc::new(Bus::new(surface));
    let worker_handle = spawn_bus_worker(worker, bus, config.reclaim.eager)
        .context("Failed to spawn bus worker thread")?;
    let event_logger = spawn_event_logger(bridge.clone());

    plug_configured_targets(&bridge, &config.targets).await;

    let result = if args.list_targets {
        list_targets_mode(&bridge).await
    } else {
        run(&config, &bridge).await
    };

    info!("Shutting down bus...");
    if let Err(e) = shutdown_bus(&bridge).await {
        error!("Error shutting down bus worker: {:#}", e);
    }

    if let Err(e) = worker_handle.join() {
        error!("Bus worker thread panicked: {:?}", e);
    }

    // Worker gone: the event channel closes once the backlog is drained
    if let Err(e) = event_logger.await {
        warn!("Event logger task failed: {}", e);
    }

    result
}

/// Plug in host-declared targets
///
/// A target that fails to plug in is logged and skipped.
async fn plug_configured_targets(bridge: &BusBridge, targets: &[TargetConfig]) {
    let host = RequestContext::session(SessionId::HOST);
    for target in targets {
        match bridge.plug_in_record(&target.to_record(), host).await {
            Ok(_) => info!("Plugged in configured target {}", target.serial_no),
            Err(e) => warn!(
                "Failed to plug in configured target {}: {}",
                target.serial_no, e
            ),
        }
    }
}

/// Print the registry and exit
async fn list_targets_mode(bridge: &BusBridge) -> Result<()> {
    let targets = bridge
        .list_targets()
        .await
        .context("Failed to list targets")?;

    if targets.is_empty() {
        println!("No targets on the bus.");
    } else {
        println!("{} target(s) on the bus:\n", targets.len());
        for target in targets {
            println!(
                "  [{}] {} {} - session {} ({:?})",
                target.serial_no, target.kind, target.ids, target.session_id, target.presence
            );
        }
    }

    Ok(())
}

/// Run until Ctrl+C
async fn run(config: &BusConfig, bridge: &BusBridge) -> Result<()> {
    let reclaimer = spawn_reclaimer(bridge.clone(), config.reclaim.interval);

    info!("Press Ctrl+C to shutdown");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
        Err(e) => {
            error!("Error waiting for Ctrl+C: {}", e);
        }
    }

    reclaimer.abort();
    Ok(())
}

/// Log every presence transition reported by the worker
fn spawn_event_logger(bridge: BusBridge) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok(event) = bridge.recv_event().await {
            match event {
                BusEvent::TargetPresent { target } => info!("Present: {}", target),
                BusEvent::TargetMissing { target } => info!("Missing: {}", target),
                BusEvent::TargetReclaimed { target } => info!("Reclaimed: {}", target),
            }
        }
    })
}

/// Unplug everything, reclaim it, then stop the worker thread
async fn shutdown_bus(bridge: &BusBridge) -> Result<()> {
    let report = bridge
        .unplug_record(
            &UnplugRecord::all(),
            RequestContext::internal(SessionId::HOST),
        )
        .await
        .context("Failed to unplug targets")?;
    info!("Unplugged {} target(s)", report.unplugged.len());

    bridge.reclaim().await.context("Failed to reclaim targets")?;

    bridge
        .shutdown()
        .await
        .context("Failed to send Shutdown command")?;
    Ok(())
}
