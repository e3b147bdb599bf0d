//! One-line text rendering of the door snapshot.

use crate::state::{DoorLocation, DoorTransition, Snapshot};
use chrono::{DateTime, Utc};

/// Title for one door, e.g. `south left locked 12 min`.
///
/// The shower has no time suffix.
pub fn door_title(location: DoorLocation, transition: &DoorTransition, now: DateTime<Utc>) -> String {
    let name = location.display_name();
    let label = transition.state.label();

    if location == DoorLocation::SouthShower {
        return format!("{} {}", name, label);
    }

    let minutes = (now - transition.since).num_minutes().max(0);
    format!("{} {} {} min", name, label, minutes)
}

/// Connectivity marker followed by every door title
pub fn summary(snapshot: &Snapshot, connected: bool, now: DateTime<Utc>) -> String {
    let marker = if connected { "[online]" } else { "[offline]" };
    let titles: Vec<String> = snapshot
        .iter()
        .map(|(location, transition)| door_title(location, transition, now))
        .collect();
    format!("{} {}", marker, titles.join(" | "))
}
