use super::*;

#[test]
fn test_decode_locked_door() {
    let result = decode(br#"{"name":"new office - left toilet","state":"locked"}"#);
    assert_eq!(result, Ok((DoorLocation::SouthLeft, DoorState::Locked)));
}

#[test]
fn test_decode_every_wire_name() {
    for location in DoorLocation::ALL {
        let frame = format!(r#"{{"name":"{}","state":"unlocked"}}"#, wire_name(location));
        assert_eq!(
            decode(frame.as_bytes()),
            Ok((location, DoorState::Unlocked))
        );
    }
}

#[test]
fn test_unknown_entity_fails() {
    let result = decode(br#"{"name":"bogus","state":"locked"}"#);
    assert_eq!(result, Err(DecodeError::UnknownEntity("bogus".to_string())));
}

#[test]
fn test_unknown_state_fails() {
    let result = decode(br#"{"name":"new office - left toilet","state":"ajar"}"#);
    assert_eq!(result, Err(DecodeError::UnknownState("ajar".to_string())));
}

#[test]
fn test_state_token_is_case_sensitive() {
    let result = decode(br#"{"name":"new office - shower","state":"Locked"}"#);
    assert!(matches!(result, Err(DecodeError::UnknownState(_))));
}

#[test]
fn test_name_resolved_before_state() {
    let result = decode(br#"{"name":"bogus","state":"ajar"}"#);
    assert!(matches!(result, Err(DecodeError::UnknownEntity(_))));
}

#[test]
fn test_array_payload_is_malformed() {
    let result = decode(br#"[{"name":"new office - left toilet","state":"locked"}]"#);
    match result {
        Err(DecodeError::MalformedPayload(_)) => {}
        other => panic!("Expected MalformedPayload, got {:?}", other),
    }
}

#[test]
fn test_invalid_json_is_malformed() {
    assert!(matches!(
        decode(b"{\"name\":"),
        Err(DecodeError::MalformedPayload(_))
    ));
    assert!(matches!(
        decode(&[0xff, 0xfe, 0x00]),
        Err(DecodeError::MalformedPayload(_))
    ));
}

#[test]
fn test_non_string_values_are_malformed() {
    let result = decode(br#"{"name":"new office - left toilet","state":"locked","seq":3}"#);
    assert!(matches!(result, Err(DecodeError::MalformedPayload(_))));

    let result = decode(br#"{"name":"new office - left toilet","state":true}"#);
    assert!(matches!(result, Err(DecodeError::MalformedPayload(_))));
}

#[test]
fn test_missing_key_is_malformed() {
    let result = decode(br#"{"name":"new office - left toilet"}"#);
    assert_eq!(
        result,
        Err(DecodeError::MalformedPayload("missing 'state'".to_string()))
    );
}

#[test]
fn test_extra_string_keys_ignored() {
    let result = decode(
        br#"{"name":"old office - right toilet","state":"unlocked","source":"pi-2"}"#,
    );
    assert_eq!(result, Ok((DoorLocation::NorthRight, DoorState::Unlocked)));
}

#[test]
fn test_error_display() {
    assert_eq!(
        DecodeError::UnknownEntity("bogus".to_string()).to_string(),
        "unknown door 'bogus'"
    );
    assert_eq!(
        DecodeError::UnknownState("ajar".to_string()).to_string(),
        "unknown lock state 'ajar'"
    );
}

#[test]
fn test_wire_name_matches_lookup_table() {
    assert_eq!(WIRE_DOORS.len(), DOOR_COUNT);
    for (wire, location) in WIRE_DOORS {
        assert_eq!(wire_name(location), wire);
        assert_eq!(lookup_door(wire), Some(location));
    }
}
