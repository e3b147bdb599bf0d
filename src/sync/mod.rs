//! Keeps the door snapshot in step with the remote event source.
//!
//! One task owns the [`SyncController`] and feeds it transport events,
//! reachability transitions and endpoint changes through `tokio::select!`,
//! so the transitions below never race:
//!
//! | Event                         | Action                                        |
//! |-------------------------------|-----------------------------------------------|
//! | host unreachable              | disconnect, flag off, all doors `Unknown`     |
//! | general unreachable           | logged only                                   |
//! | scope reachable               | connect (no-op if a connection is active)     |
//! | endpoint changed              | reconnect to the new URL                      |
//! | transport open                | flag on, all doors `Unknown`                  |
//! | transport closed / error      | flag off, all doors `Unknown`, disconnect     |
//! | frame decodes                 | update that door                              |
//! | frame fails to decode         | all doors `Unknown`                           |
//!
//! Events from a connection that is no longer the active one are dropped.

use crate::connection::{
    ConnectionManager, Transport, TransportEvent, TransportMessage, TransportReceiver,
};
use crate::reachability::{
    host_target, ReachabilityEvent, ReachabilityMonitor, ReachabilityScope,
};
use crate::state::{DoorState, StateStore};
use crate::wire;
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;


/// Connection phase as seen by the controller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Disconnected,
    Connecting,
    Connected,
}

pub struct SyncController {
    store: Arc<StateStore>,
    connections: ConnectionManager,
    transport_rx: TransportReceiver,
    endpoint: Url,
    state: SyncState,
}

impl SyncController {
    pub fn new(store: Arc<StateStore>, transport: Arc<dyn Transport>, endpoint: Url) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        Self {
            store,
            connections: ConnectionManager::new(transport, transport_tx),
            transport_rx,
            endpoint,
            state: SyncState::Disconnected,
        }
    }

    pub fn sync_state(&self) -> SyncState {
        self.state
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// React to a reachability transition.
    ///
    /// Either scope becoming reachable connects; only the host scope disconnects.
    pub fn handle_reachability(&mut self, event: ReachabilityEvent) {
        if event.reachable {
            info!(scope = %event.scope, url = %self.endpoint, "Reachable, connecting");
            if self.connections.connect(&self.endpoint) {
                self.state = SyncState::Connecting;
            }
        } else if event.scope == ReachabilityScope::Host {
            info!(scope = %event.scope, "Unreachable, disconnecting");
            self.connections.disconnect();
            self.state = SyncState::Disconnected;
            self.mark_unsynced();
        } else {
            // The host probe alone decides teardown
            info!(scope = %event.scope, "Unreachable, keeping connection");
        }
    }

    /// Switch to a new endpoint, replacing any active connection
    pub fn handle_endpoint_changed(&mut self, url: Url) {
        let had_connection = self.connections.is_active();
        self.endpoint = url;
        self.connections.reconnect(&self.endpoint);
        self.state = SyncState::Connecting;
        if had_connection {
            self.mark_unsynced();
        }
    }

    /// React to an event from the transport
    pub fn handle_transport(&mut self, message: TransportMessage) {
        if !self.connections.is_current(message.id) {
            debug!(connection = %message.id, "Dropping event from superseded connection");
            return;
        }

        match message.event {
            TransportEvent::Open => {
                info!(connection = %message.id, "Connected, waiting for door events");
                self.state = SyncState::Connected;
                self.store.set_connected(true);
                self.store.reset_all(DoorState::Unknown);
            }
            TransportEvent::Closed {
                code,
                reason,
                clean,
            } => {
                info!(
                    connection = %message.id,
                    code = ?code,
                    reason = %reason,
                    clean = clean,
                    "Connection closed"
                );
                self.drop_connection();
            }
            TransportEvent::Error(error) => {
                warn!(connection = %message.id, error = %error, "Connection failed");
                self.drop_connection();
            }
            TransportEvent::Frame(payload) => match wire::decode(&payload) {
                Ok((location, state)) => {
                    info!(door = ?location, state = state.label(), "Door event");
                    self.store.update(location, state);
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        payload = %String::from_utf8_lossy(&payload),
                        "Undecodable frame, resetting all doors"
                    );
                    self.store.reset_all(DoorState::Unknown);
                }
            },
        }
    }

    fn drop_connection(&mut self) {
        self.store.set_connected(false);
        self.store.reset_all(DoorState::Unknown);
        self.connections.disconnect();
        self.state = SyncState::Disconnected;
    }

    /// Flag off (if it was on) and every door back to `Unknown`
    fn mark_unsynced(&self) {
        if self.store.is_connected() {
            self.store.set_connected(false);
        }
        self.store.reset_all(DoorState::Unknown);
    }

    /// Run until `shutdown` completes.
    ///
    /// Starts `monitor` against the endpoint host; a start failure is
    /// returned. On exit the monitor is stopped and the connection closed.
    pub async fn run<F>(
        mut self,
        mut monitor: ReachabilityMonitor,
        mut endpoint_rx: watch::Receiver<Url>,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (reachability_tx, mut reachability_rx) = mpsc::unbounded_channel();
        let target = host_target(&self.endpoint)
            .with_context(|| format!("Endpoint '{}' has no host to probe", self.endpoint))?;
        monitor
            .start(&target, reachability_tx)
            .context("Failed to start reachability monitor")?;

        info!(url = %self.endpoint, "Sync controller running");

        tokio::pin!(shutdown);
        endpoint_rx.borrow_and_update();
        let mut endpoint_open = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                Some(message) = self.transport_rx.recv() => {
                    self.handle_transport(message);
                }

                Some(event) = reachability_rx.recv() => {
                    self.handle_reachability(event);
                }

                changed = endpoint_rx.changed(), if endpoint_open => match changed {
                    Ok(()) => {
                        let url = endpoint_rx.borrow_and_update().clone();
                        if url != self.endpoint {
                            if let Some(target) = host_target(&url) {
                                if let Err(e) = monitor.retarget_host(&target) {
                                    warn!(error = %e, "Failed to retarget host reachability");
                                }
                            }
                            self.handle_endpoint_changed(url);
                        }
                    }
                    Err(_) => {
                        debug!("Endpoint settings dropped, keeping current endpoint");
                        endpoint_open = false;
                    }
                },
            }
        }

        monitor.stop();
        self.connections.disconnect();
        self.state = SyncState::Disconnected;
        self.mark_unsynced();
        info!("Sync controller stopped");

        Ok(())
    }
}
