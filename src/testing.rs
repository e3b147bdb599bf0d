//! In-memory transport and probe used by unit tests.

use crate::connection::{ConnectionHandle, ConnectionId, Transport, TransportSender};
use crate::reachability::ReachabilityProbe;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use url::Url;

struct Opened {
    id: ConnectionId,
    url: Url,
    shutdown: oneshot::Receiver<()>,
}

/// Transport that records every `open` and never produces events itself
#[derive(Clone, Default)]
pub struct FakeTransport {
    opened: Arc<Mutex<Vec<Opened>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every connection opened so far
    pub fn opened(&self) -> Vec<ConnectionId> {
        self.opened.lock().unwrap().iter().map(|o| o.id).collect()
    }

    pub fn opened_urls(&self) -> Vec<Url> {
        self.opened.lock().unwrap().iter().map(|o| o.url.clone()).collect()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn last_id(&self) -> Option<ConnectionId> {
        self.opened.lock().unwrap().last().map(|o| o.id)
    }

    /// Connections whose handle has been neither closed nor dropped
    pub fn live(&self) -> Vec<ConnectionId> {
        self.opened
            .lock()
            .unwrap()
            .iter_mut()
            .filter_map(|o| match o.shutdown.try_recv() {
                Err(TryRecvError::Empty) => Some(o.id),
                _ => None,
            })
            .collect()
    }
}

impl Transport for FakeTransport {
    fn open(&self, id: ConnectionId, url: &Url, _events: TransportSender) -> ConnectionHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.opened.lock().unwrap().push(Opened {
            id,
            url: url.clone(),
            shutdown: shutdown_rx,
        });
        ConnectionHandle::new(id, shutdown_tx)
    }
}

/// Probe whose answers are set by the test, per target. Unknown targets are unreachable.
#[derive(Default)]
pub struct ScriptedProbe {
    reachable: Mutex<HashMap<String, bool>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, target: &str, reachable: bool) {
        self.reachable
            .lock()
            .unwrap()
            .insert(target.to_string(), reachable);
    }
}

#[async_trait]
impl ReachabilityProbe for ScriptedProbe {
    async fn is_reachable(&self, target: &str) -> bool {
        self.reachable
            .lock()
            .unwrap()
            .get(target)
            .copied()
            .unwrap_or(false)
    }
}
