//! Decoding of inbound door events.
//!
//! Every frame is a flat JSON object with string values:
//!
//! ```json
//! {"name": "new office - left toilet", "state": "locked"}
//! ```

use crate::state::{DoorLocation, DoorState, DOOR_COUNT};
use serde_json::{Map, Value};
use std::fmt;

#[cfg(test)]
mod tests;

/// Wire name of each door
const WIRE_DOORS: [(&str, DoorLocation); DOOR_COUNT] = [
    ("old office - left toilet", DoorLocation::NorthLeft),
    ("old office - right toilet", DoorLocation::NorthRight),
    ("new office - left toilet", DoorLocation::SouthLeft),
    ("new office - right toilet", DoorLocation::SouthRight),
    ("new office - shower", DoorLocation::SouthShower),
];

/// Wire token of each reportable lock state
const WIRE_STATES: [(&str, DoorState); 2] = [
    ("locked", DoorState::Locked),
    ("unlocked", DoorState::Unlocked),
];

/// Decode failures for inbound frames
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    MalformedPayload(String),
    UnknownEntity(String),
    UnknownState(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::MalformedPayload(reason) => write!(f, "malformed payload: {}", reason),
            DecodeError::UnknownEntity(name) => write!(f, "unknown door '{}'", name),
            DecodeError::UnknownState(state) => write!(f, "unknown lock state '{}'", state),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Decode a raw frame into the door it reports and its new state.
///
/// Extra string-valued keys are ignored. `name` is resolved before `state`.
pub fn decode(raw: &[u8]) -> Result<(DoorLocation, DoorState), DecodeError> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DecodeError::MalformedPayload(format!(
                "expected object, got {}",
                json_kind(&other)
            )))
        }
    };

    // Every value must be a string, not only the two we read
    if let Some((key, value)) = object.iter().find(|(_, v)| !v.is_string()) {
        return Err(DecodeError::MalformedPayload(format!(
            "value of '{}' is {}, expected string",
            key,
            json_kind(value)
        )));
    }

    let name = string_field(&object, "name")?;
    let state = string_field(&object, "state")?;

    let location = lookup_door(name).ok_or_else(|| DecodeError::UnknownEntity(name.to_string()))?;
    let state = lookup_state(state).ok_or_else(|| DecodeError::UnknownState(state.to_string()))?;

    Ok((location, state))
}

/// Door for a wire name (exact match)
pub fn lookup_door(name: &str) -> Option<DoorLocation> {
    WIRE_DOORS
        .iter()
        .find(|(wire, _)| *wire == name)
        .map(|(_, location)| *location)
}

/// Lock state for a wire token (exact, case-sensitive match)
pub fn lookup_state(token: &str) -> Option<DoorState> {
    WIRE_STATES
        .iter()
        .find(|(wire, _)| *wire == token)
        .map(|(_, state)| *state)
}

/// Wire name used by the event source for a door
pub fn wire_name(location: DoorLocation) -> &'static str {
    match location {
        DoorLocation::NorthLeft => "old office - left toilet",
        DoorLocation::NorthRight => "old office - right toilet",
        DoorLocation::SouthLeft => "new office - left toilet",
        DoorLocation::SouthRight => "new office - right toilet",
        DoorLocation::SouthShower => "new office - shower",
    }
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, DecodeError> {
    object
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::MalformedPayload(format!("missing '{}'", key)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
