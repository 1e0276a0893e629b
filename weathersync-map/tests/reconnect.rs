//! The host's reconnect policy running against the real runtime

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use weathersync::prelude::*;
use weathersync::Endpoint;
use weathersync_map::testing::char_key;
use weathersync_map::{Backoff, HostEvent, MapApp};

async fn unreachable_config() -> SyncConfig {
    // Reserve a port, then free it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    SyncConfig::new(Endpoint::parse(&format!("ws://{addr}")).unwrap())
}

#[tokio::test]
async fn test_failed_connect_is_retried() {
    let config = unreachable_config().await;
    let app = RefCell::new(
        MapApp::new(config.default_location).with_reconnect(Backoff::new(
            Duration::from_millis(10),
            Duration::from_millis(20),
        )),
    );
    let mut runtime = SyncRuntime::new(config, Arc::new(FixedGeolocator::unavailable()));
    runtime.enqueue(SyncAction::ConnectionOpen);
    let (_events_tx, events_rx) = mpsc::unbounded_channel::<HostEvent>();

    let mut failures = 0;
    let run = runtime.run(
        events_rx,
        |_| Ok(()),
        |event, state| app.borrow_mut().map_event(event, state),
        |effect, ctx| {
            if let SyncEffect::Notify(Notice::ConnectFailed(_)) = &effect {
                failures += 1;
                if failures == 3 {
                    ctx.emit(SyncAction::Shutdown);
                    return;
                }
            }
            app.borrow_mut().handle_effect(effect, ctx);
        },
    );
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("reconnect attempts stalled")
        .unwrap();

    assert_eq!(failures, 3);
    let app = app.borrow();
    assert!(app
        .notice()
        .is_some_and(|n| n.starts_with("connection failed")));
    assert_eq!(runtime.state().connection().state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_no_retry_without_policy() {
    let config = unreachable_config().await;
    let app = RefCell::new(MapApp::new(config.default_location));
    let mut runtime = SyncRuntime::new(config, Arc::new(FixedGeolocator::unavailable()));
    runtime.enqueue(SyncAction::ConnectionOpen);
    let (_events_tx, events_rx) = mpsc::unbounded_channel::<HostEvent>();

    let mut failures = 0;
    let run = runtime.run(
        events_rx,
        |_| Ok(()),
        |event, state| app.borrow_mut().map_event(event, state),
        |effect, ctx| {
            if let SyncEffect::Notify(Notice::ConnectFailed(_)) = &effect {
                failures += 1;
                // Give a stray retry time to show up before stopping
                ctx.tasks().spawn_after("stop", Duration::from_millis(200), async {
                    SyncAction::Shutdown
                });
            }
            app.borrow_mut().handle_effect(effect, ctx);
        },
    );
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("runtime did not stop")
        .unwrap();

    assert_eq!(failures, 1);
}

#[tokio::test]
async fn test_close_key_cancels_pending_retry() {
    let config = unreachable_config().await;
    let app = RefCell::new(
        MapApp::new(config.default_location).with_reconnect(Backoff::new(
            Duration::from_millis(300),
            Duration::from_millis(300),
        )),
    );
    let mut runtime = SyncRuntime::new(config, Arc::new(FixedGeolocator::unavailable()));
    runtime.enqueue(SyncAction::ConnectionOpen);
    let (events_tx, events_rx) = mpsc::unbounded_channel::<HostEvent>();

    let mut failures = 0;
    let run = runtime.run(
        events_rx,
        |_| Ok(()),
        |event, state| app.borrow_mut().map_event(event, state),
        |effect, ctx| {
            match &effect {
                SyncEffect::Notify(Notice::ConnectFailed(_)) => {
                    failures += 1;
                    // Close while the first retry is still waiting
                    let _ = events_tx.send(char_key('x'));
                }
                SyncEffect::Notify(Notice::Closed) => {
                    ctx.tasks().spawn_after("stop", Duration::from_millis(800), async {
                        SyncAction::Shutdown
                    });
                }
                _ => {}
            }
            app.borrow_mut().handle_effect(effect, ctx);
        },
    );
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("runtime did not stop")
        .unwrap();

    assert_eq!(failures, 1);
    let app = app.borrow();
    assert!(app.reconnect_held());
    assert_eq!(app.notice(), Some("closed"));
    assert_eq!(runtime.state().connection().state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_open_key_resumes_retries_after_close() {
    let config = unreachable_config().await;
    let app = RefCell::new(
        MapApp::new(config.default_location).with_reconnect(Backoff::new(
            Duration::from_millis(10),
            Duration::from_millis(20),
        )),
    );
    let mut runtime = SyncRuntime::new(config, Arc::new(FixedGeolocator::unavailable()));
    runtime.enqueue(SyncAction::ConnectionOpen);
    let (events_tx, events_rx) = mpsc::unbounded_channel::<HostEvent>();

    let mut failures = 0;
    let mut closes = 0;
    let run = runtime.run(
        events_rx,
        |_| Ok(()),
        |event, state| app.borrow_mut().map_event(event, state),
        |effect, ctx| {
            match &effect {
                SyncEffect::Notify(Notice::ConnectFailed(_)) => {
                    failures += 1;
                    if failures == 1 {
                        let _ = events_tx.send(char_key('x'));
                    }
                    if failures == 3 {
                        ctx.emit(SyncAction::Shutdown);
                        return;
                    }
                }
                SyncEffect::Notify(Notice::Closed) => {
                    closes += 1;
                    let _ = events_tx.send(char_key('c'));
                }
                _ => {}
            }
            app.borrow_mut().handle_effect(effect, ctx);
        },
    );
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("retries did not resume")
        .unwrap();

    // One failure before the close, then the manual open and its retry
    assert_eq!(closes, 1);
    assert_eq!(failures, 3);
    assert!(!app.borrow().reconnect_held());
}
