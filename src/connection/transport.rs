use futures::{SinkExt, StreamExt};
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

/// Identity of one transport connection. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub(crate) u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle and data events reported by a transport
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// Handshake completed
    Open,
    /// Peer closed the connection, or the stream ended
    Closed {
        code: Option<u16>,
        reason: String,
        clean: bool,
    },
    /// Handshake or read failure; the connection is gone
    Error(String),
    /// Text or binary frame, normalized to bytes
    Frame(Vec<u8>),
}

/// Transport event tagged with the connection that produced it
#[derive(Clone, Debug, PartialEq)]
pub struct TransportMessage {
    pub id: ConnectionId,
    pub event: TransportEvent,
}

pub type TransportSender = mpsc::UnboundedSender<TransportMessage>;
pub type TransportReceiver = mpsc::UnboundedReceiver<TransportMessage>;

/// Single-use handle to an open or opening connection.
///
/// Consumed by [`ConnectionHandle::close`]. Dropping the handle closes the
/// connection as well.
#[derive(Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    shutdown: oneshot::Sender<()>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, shutdown: oneshot::Sender<()>) -> Self {
        Self { id, shutdown }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Ask the transport to close. No event is reported for a requested close.
    pub fn close(self) {
        let _ = self.shutdown.send(());
    }
}

/// Opens connections and reports their events asynchronously.
///
/// `open` must not block: the handshake runs in the background and its
/// outcome arrives on `events` as [`TransportEvent::Open`] or an error.
pub trait Transport: Send + Sync {
    fn open(&self, id: ConnectionId, url: &Url, events: TransportSender) -> ConnectionHandle;
}

/// WebSocket transport on tokio-tungstenite. `open` must run inside a tokio runtime.
#[derive(Clone, Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, id: ConnectionId, url: &Url, events: TransportSender) -> ConnectionHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(run_connection(id, url.clone(), events, shutdown_rx));
        ConnectionHandle::new(id, shutdown_tx)
    }
}

async fn run_connection(
    id: ConnectionId,
    url: Url,
    events: TransportSender,
    mut shutdown: oneshot::Receiver<()>,
) {
    let report = |event: TransportEvent| {
        let _ = events.send(TransportMessage { id, event });
    };

    let stream = tokio::select! {
        // Fires on close() and on a dropped handle
        _ = &mut shutdown => {
            debug!(connection = %id, "Connection cancelled during handshake");
            return;
        }
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                warn!(connection = %id, url = %url, error = %e, "WebSocket handshake failed");
                report(TransportEvent::Error(e.to_string()));
                return;
            }
        }
    };

    info!(connection = %id, url = %url, "WebSocket open");
    report(TransportEvent::Open);

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!(connection = %id, "Closing WebSocket on request");
                if let Err(e) = write.send(Message::Close(None)).await {
                    debug!(connection = %id, error = %e, "Close frame not delivered");
                }
                break;
            }

            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    report(TransportEvent::Frame(text.as_str().as_bytes().to_vec()));
                }
                Some(Ok(Message::Binary(data))) => {
                    report(TransportEvent::Frame(data.to_vec()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_string()),
                        None => (None, String::new()),
                    };
                    info!(connection = %id, code = ?code, reason = %reason, "WebSocket closed by peer");
                    report(TransportEvent::Closed { code, reason, clean: true });
                    break;
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite
                }
                Some(Err(e)) => {
                    warn!(connection = %id, error = %e, "WebSocket read error");
                    report(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    info!(connection = %id, "WebSocket stream ended");
                    report(TransportEvent::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                        clean: false,
                    });
                    break;
                }
            }
        }
    }
}
