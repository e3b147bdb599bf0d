// End-to-end sync over a real WebSocket.
//
// An axum server on an ephemeral port plays the door event source. The
// controller runs with the production WebSocketTransport and a probe that
// always reports reachable, so the first reachability observation triggers
// the connection.

use async_trait::async_trait;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use flushcap::{
    connection::WebSocketTransport,
    reachability::{ReachabilityConfig, ReachabilityMonitor, ReachabilityProbe},
    state::{DoorLocation, DoorState, StateStore},
    sync::SyncController,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

struct AlwaysReachable;

#[async_trait]
impl ReachabilityProbe for AlwaysReachable {
    async fn is_reachable(&self, _target: &str) -> bool {
        true
    }
}

/// Sends two door events and stays open until the client leaves
async fn steady_source(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket
            .send(Message::Text(
                r#"{"name":"new office - left toilet","state":"locked"}"#.to_string(),
            ))
            .await;
        let _ = socket
            .send(Message::Binary(
                br#"{"name":"new office - shower","state":"unlocked"}"#.to_vec(),
            ))
            .await;
        while let Some(Ok(_)) = socket.recv().await {}
    })
}

/// Sends one door event, then closes
async fn closing_source(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket
            .send(Message::Text(
                r#"{"name":"old office - left toilet","state":"locked"}"#.to_string(),
            ))
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = socket.send(Message::Close(None)).await;
    })
}

async fn start_server() -> SocketAddr {
    let app = Router::new()
        .route("/changes", get(steady_source))
        .route("/closing", get(closing_source));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn start_controller(
    store: Arc<StateStore>,
    url: Url,
) -> (oneshot::Sender<()>, JoinHandle<anyhow::Result<()>>) {
    let monitor = ReachabilityMonitor::new(
        Arc::new(AlwaysReachable),
        ReachabilityConfig {
            general_target: "127.0.0.1:9".to_string(),
            interval_ms: 20,
            probe_timeout_ms: 20,
        },
    );
    let (endpoint_tx, endpoint_rx) = watch::channel(url.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let controller = SyncController::new(store, Arc::new(WebSocketTransport::new()), url);

    let task = tokio::spawn(async move {
        // Keep the settings side alive for the whole run
        let _endpoint_tx = endpoint_tx;
        controller
            .run(monitor, endpoint_rx, async move {
                let _ = shutdown_rx.await;
            })
            .await
    });
    (shutdown_tx, task)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_door_events_reach_the_store() {
    let addr = start_server().await;
    let store = Arc::new(StateStore::new());
    let url = Url::parse(&format!("ws://{}/changes", addr)).unwrap();

    let (shutdown_tx, task) = start_controller(Arc::clone(&store), url);

    wait_until(|| {
        let snapshot = store.snapshot();
        store.is_connected()
            && snapshot.get(DoorLocation::SouthLeft).state == DoorState::Locked
            && snapshot.get(DoorLocation::SouthShower).state == DoorState::Unlocked
    })
    .await;

    let snapshot = store.snapshot();
    assert_eq!(snapshot.get(DoorLocation::NorthLeft).state, DoorState::Unknown);
    assert_eq!(snapshot.get(DoorLocation::SouthRight).state, DoorState::Unknown);

    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();

    assert!(!store.is_connected());
    assert!(store
        .snapshot()
        .iter()
        .all(|(_, t)| t.state == DoorState::Unknown));
}

#[tokio::test]
async fn test_server_close_resets_to_unknown() {
    let addr = start_server().await;
    let store = Arc::new(StateStore::new());

    let history = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&history);
    store.subscribe_state(move |snapshot| {
        sink.lock()
            .unwrap()
            .push(snapshot.get(DoorLocation::NorthLeft).state)
    });
    let flags = Arc::new(Mutex::new(Vec::new()));
    let flag_sink = Arc::clone(&flags);
    store.subscribe_connectivity(move |connected| flag_sink.lock().unwrap().push(connected));

    let url = Url::parse(&format!("ws://{}/closing", addr)).unwrap();
    let (shutdown_tx, task) = start_controller(Arc::clone(&store), url);

    // online, then offline again after the server's close frame
    wait_until(|| *flags.lock().unwrap() == vec![false, true, false]).await;

    assert!(history.lock().unwrap().contains(&DoorState::Locked));
    assert_eq!(
        store.snapshot().get(DoorLocation::NorthLeft).state,
        DoorState::Unknown
    );

    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}
