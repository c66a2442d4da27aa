//! Bus Bridge Integration Tests
//!
//! Tests for the async channel bridge between Tokio runtime and the bus worker thread.
//!
//! # Test Scenarios
//! - Command/response flow for every request helper
//! - Bus errors flattened into `common::Error::Bus`
//! - Event delivery from the worker to async consumers
//! - Concurrent callers sharing cloned bridges
//!
//! Run with: `cargo test -p common --test bus_bridge_tests`

use common::test_utils::{
    DEFAULT_TEST_TIMEOUT, mock_target_info, plugin_bytes, session, unplug_bytes, with_timeout,
};
use common::{BusCommand, BusEvent, Error, create_bus_bridge};
use protocol::{
    BusError, PLUGIN_RECORD_SIZE, PlugInRecord, Presence, SerialNo, TargetKind,
    UNPLUG_RECORD_SIZE, UnplugRecord, UnplugReport,
};
use std::thread;

// ============================================================================
// Request helpers
// ============================================================================

#[tokio::test]
async fn test_plug_in_round_trip() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || {
        if let Ok(BusCommand::PlugIn {
            request,
            context,
            response,
        }) = worker.recv_command()
        {
            assert_eq!(context.session.map(|s| s.0), Some(3));
            let _ = response.send(Ok(request.len()));
        }
    });

    let transferred = with_timeout(
        DEFAULT_TEST_TIMEOUT,
        bridge.plug_in(plugin_bytes(1, TargetKind::Xbox360Wired), session(3)),
    )
    .await
    .expect("timed out")
    .expect("plug-in failed");

    assert_eq!(transferred, PLUGIN_RECORD_SIZE);
    handle.join().expect("Worker thread panicked");
}

#[tokio::test]
async fn test_plug_in_record_encodes_request() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || {
        if let Ok(BusCommand::PlugIn {
            request, response, ..
        }) = worker.recv_command()
        {
            let record = PlugInRecord::decode(&request).expect("valid record");
            assert_eq!(record.serial_no, SerialNo(9));
            assert_eq!(record.target_type, TargetKind::DualShock4Wired.as_raw());
            let _ = response.send(Ok(request.len()));
        }
    });

    let record = PlugInRecord::new(SerialNo(9), TargetKind::DualShock4Wired);
    let transferred = bridge.plug_in_record(&record, session(1)).await.unwrap();
    assert_eq!(transferred, PLUGIN_RECORD_SIZE);
    handle.join().unwrap();
}

#[tokio::test]
async fn test_bus_error_is_flattened() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || {
        if let Ok(BusCommand::PlugIn { response, .. }) = worker.recv_command() {
            let _ = response.send(Err(BusError::AlreadyExists {
                serial_no: SerialNo(1),
            }));
        }
    });

    let err = bridge
        .plug_in(plugin_bytes(1, TargetKind::Xbox360Wired), session(1))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Bus(BusError::AlreadyExists {
            serial_no: SerialNo(1)
        })
    ));
    handle.join().unwrap();
}

#[tokio::test]
async fn test_unplug_round_trip() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || {
        if let Ok(BusCommand::Unplug {
            request, response, ..
        }) = worker.recv_command()
        {
            let record = UnplugRecord::decode(&request).expect("valid record");
            let _ = response.send(Ok(UnplugReport {
                transferred: request.len(),
                unplugged: vec![record.serial_no],
            }));
        }
    });

    let report = bridge
        .unplug_record(&UnplugRecord::new(SerialNo(4)), session(2))
        .await
        .unwrap();

    assert_eq!(report.transferred, UNPLUG_RECORD_SIZE);
    assert_eq!(report.unplugged, vec![SerialNo(4)]);
    handle.join().unwrap();
}

#[tokio::test]
async fn test_list_and_reclaim() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            match worker.recv_command() {
                Ok(BusCommand::ListTargets { response }) => {
                    let _ = response.send(vec![
                        mock_target_info(1, 1, TargetKind::Xbox360Wired, Presence::Present),
                        mock_target_info(2, 1, TargetKind::DualShock4Wired, Presence::Missing),
                    ]);
                }
                Ok(BusCommand::Reclaim { response }) => {
                    let _ = response.send(vec![mock_target_info(
                        2,
                        1,
                        TargetKind::DualShock4Wired,
                        Presence::Missing,
                    )]);
                }
                other => panic!("unexpected command: {:?}", other),
            }
        }
    });

    let targets = bridge.list_targets().await.unwrap();
    assert_eq!(targets.len(), 2);

    let reclaimed = bridge.reclaim().await.unwrap();
    assert_eq!(reclaimed.len(), 1);
    assert_eq!(reclaimed[0].serial_no, SerialNo(2));

    handle.join().unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_shutdown_command() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || matches!(worker.recv_command(), Ok(BusCommand::Shutdown)));

    bridge.shutdown().await.unwrap();
    assert!(handle.join().unwrap());
}

#[tokio::test]
async fn test_send_after_worker_dropped() {
    let (bridge, worker) = create_bus_bridge();
    drop(worker);

    let err = bridge
        .unplug(unplug_bytes(0), session(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Channel(_)));
}

#[test]
fn test_try_recv_on_empty_channel() {
    let (_bridge, worker) = create_bus_bridge();
    assert!(worker.try_recv_command().is_none());
}

// ============================================================================
// Events
// ============================================================================

#[tokio::test]
async fn test_events_delivered_in_order() {
    let (bridge, worker) = create_bus_bridge();

    let handle = thread::spawn(move || {
        let present = mock_target_info(5, 1, TargetKind::Xbox360Wired, Presence::Present);
        let missing = mock_target_info(5, 1, TargetKind::Xbox360Wired, Presence::Missing);
        worker
            .send_event(BusEvent::TargetPresent { target: present })
            .unwrap();
        worker
            .send_event(BusEvent::TargetMissing {
                target: missing.clone(),
            })
            .unwrap();
        worker
            .send_event(BusEvent::TargetReclaimed { target: missing })
            .unwrap();
    });

    let first = with_timeout(DEFAULT_TEST_TIMEOUT, bridge.recv_event())
        .await
        .unwrap()
        .unwrap();
    let second = bridge.recv_event().await.unwrap();
    let third = bridge.recv_event().await.unwrap();

    assert!(matches!(first, BusEvent::TargetPresent { .. }));
    assert!(matches!(second, BusEvent::TargetMissing { .. }));
    assert!(matches!(third, BusEvent::TargetReclaimed { .. }));

    handle.join().unwrap();
}

#[test]
fn test_send_event_without_consumer_fails() {
    let (bridge, worker) = create_bus_bridge();
    drop(bridge);

    let result = worker.send_event(BusEvent::TargetPresent {
        target: mock_target_info(1, 1, TargetKind::Xbox360Wired, Presence::Present),
    });
    assert!(matches!(result, Err(Error::Channel(_))));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_cloned_bridges_share_worker() {
    let (bridge, worker) = create_bus_bridge();
    const CALLERS: usize = 8;

    let handle = thread::spawn(move || {
        for _ in 0..CALLERS {
            if let Ok(BusCommand::PlugIn {
                request, response, ..
            }) = worker.recv_command()
            {
                let _ = response.send(Ok(request.len()));
            }
        }
    });

    let mut tasks = Vec::new();
    for i in 0..CALLERS {
        let bridge = bridge.clone();
        tasks.push(tokio::spawn(async move {
            bridge
                .plug_in(
                    plugin_bytes(i as u32 + 1, TargetKind::Xbox360Wired),
                    session(i as u32),
                )
                .await
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), PLUGIN_RECORD_SIZE);
    }
    handle.join().unwrap();
}
