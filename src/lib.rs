// Door snapshot and state store
pub mod state;

// Inbound frame decoding
pub mod wire;

// Transport connection lifecycle
pub mod connection;

// Network reachability sampling
pub mod reachability;

// Controller tying reachability, transport and store together
pub mod sync;

// Configuration and endpoint settings
pub mod config;

// Text rendering of the snapshot
pub mod status;

#[cfg(test)]
pub(crate) mod testing;
