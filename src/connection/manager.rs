use crate::connection::transport::{ConnectionHandle, ConnectionId, Transport, TransportSender};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Owns the single active transport connection.
///
/// A connection that is still handshaking counts as active, so there is
/// never more than one transport alive. Handles are single-use: every
/// `connect` opens a fresh one with a new [`ConnectionId`].
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    events: TransportSender,
    active: Option<ConnectionHandle>,
    last_id: u64,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn Transport>, events: TransportSender) -> Self {
        Self {
            transport,
            events,
            active: None,
            last_id: 0,
        }
    }

    /// Open a connection unless one is already active.
    ///
    /// Returns true if a new connection was started.
    pub fn connect(&mut self, url: &Url) -> bool {
        if let Some(active) = &self.active {
            debug!(connection = %active.id(), url = %url, "WS connect: already connected");
            return false;
        }

        self.last_id += 1;
        let id = ConnectionId(self.last_id);
        info!(connection = %id, url = %url, "WS connect: will connect");

        let handle = self.transport.open(id, url, self.events.clone());
        self.active = Some(handle);
        true
    }

    /// Close the active connection, if any.
    ///
    /// The active reference is cleared before the handle is closed. Returns
    /// true if a connection was closed.
    pub fn disconnect(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                info!(connection = %handle.id(), "WS disconnect: will disconnect");
                handle.close();
                true
            }
            None => {
                debug!("WS disconnect: already disconnected");
                false
            }
        }
    }

    /// Disconnect if connected, then connect to `url`
    pub fn reconnect(&mut self, url: &Url) {
        info!(url = %url, "WS reconnect");
        self.disconnect();
        self.connect(url);
    }

    /// True if `id` is the active connection
    pub fn is_current(&self, id: ConnectionId) -> bool {
        self.active_id() == Some(id)
    }

    pub fn active_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(ConnectionHandle::id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
