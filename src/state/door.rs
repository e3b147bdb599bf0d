use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Number of known doors
pub const DOOR_COUNT: usize = 5;

/// A monitored door. The set is fixed at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorLocation {
    NorthLeft,
    NorthRight,
    SouthLeft,
    SouthRight,
    SouthShower,
}

impl DoorLocation {
    /// Every known door, in display order
    pub const ALL: [DoorLocation; DOOR_COUNT] = [
        DoorLocation::NorthLeft,
        DoorLocation::NorthRight,
        DoorLocation::SouthLeft,
        DoorLocation::SouthRight,
        DoorLocation::SouthShower,
    ];

    fn index(self) -> usize {
        match self {
            DoorLocation::NorthLeft => 0,
            DoorLocation::NorthRight => 1,
            DoorLocation::SouthLeft => 2,
            DoorLocation::SouthRight => 3,
            DoorLocation::SouthShower => 4,
        }
    }

    /// Human-readable name used by the status view
    pub fn display_name(self) -> &'static str {
        match self {
            DoorLocation::NorthLeft => "north left",
            DoorLocation::NorthRight => "north right",
            DoorLocation::SouthLeft => "south left",
            DoorLocation::SouthRight => "south right",
            DoorLocation::SouthShower => "shower",
        }
    }
}

/// Lock state of a single door
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    #[default]
    Unknown,
    Unlocked,
    Locked,
}

impl DoorState {
    pub fn label(self) -> &'static str {
        match self {
            DoorState::Unknown => "unknown",
            DoorState::Unlocked => "unlocked",
            DoorState::Locked => "locked",
        }
    }
}

/// Lock state plus the moment it was entered.
///
/// Never mutated in place: a state change produces a new transition, so
/// `since` is always the start of the current state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DoorTransition {
    pub state: DoorState,
    pub since: DateTime<Utc>,
}

impl DoorTransition {
    pub fn new(state: DoorState, since: DateTime<Utc>) -> Self {
        Self { state, since }
    }
}

/// Transition for every known door.
///
/// Backed by a fixed table indexed by [`DoorLocation`], so no door can be
/// missing and no unknown door can be added.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    transitions: [DoorTransition; DOOR_COUNT],
}

impl Snapshot {
    /// Snapshot with every door set to `state` at the same instant
    pub fn uniform(state: DoorState, since: DateTime<Utc>) -> Self {
        Self {
            transitions: [DoorTransition::new(state, since); DOOR_COUNT],
        }
    }

    pub fn get(&self, location: DoorLocation) -> &DoorTransition {
        &self.transitions[location.index()]
    }

    pub(crate) fn set(&mut self, location: DoorLocation, transition: DoorTransition) {
        self.transitions[location.index()] = transition;
    }

    /// Doors paired with their transitions, in [`DoorLocation::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (DoorLocation, &DoorTransition)> {
        DoorLocation::ALL
            .iter()
            .map(move |location| (*location, self.get(*location)))
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (location, transition) in self.iter() {
            map.serialize_entry(&location, transition)?;
        }
        map.end()
    }
}
