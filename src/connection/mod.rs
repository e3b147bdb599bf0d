// Transport connection lifecycle

mod manager;
mod transport;

pub use manager::ConnectionManager;
pub use transport::{
    ConnectionHandle, ConnectionId, Transport, TransportEvent, TransportMessage,
    TransportReceiver, TransportSender, WebSocketTransport,
};
