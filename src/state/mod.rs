// Door snapshot and its change-notifying store

mod door;
mod store;

pub use door::{DoorLocation, DoorState, DoorTransition, Snapshot, DOOR_COUNT};
pub use store::{StateStore, Subscription};
