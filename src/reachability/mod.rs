// Network reachability sampling for the endpoint host and general connectivity

mod monitor;
mod probe;

pub use monitor::{
    validate_target, ReachabilityConfig, ReachabilityEvent, ReachabilityMonitor,
    ReachabilityReceiver, ReachabilityScope, ReachabilitySender,
};
pub use probe::{host_target, ReachabilityProbe, TcpProbe};
