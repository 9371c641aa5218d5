//! Tests for shared value types

use cabinet_lights::util::{DeviceKind, Priority, Rgb, ALL_GROUPS};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_all_groups_is_highest_group() {
    assert_eq!(ALL_GROUPS, u8::MAX);
}

#[test]
fn test_serde_names() {
    assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
    assert_eq!(
        serde_json::to_string(&DeviceKind::StreamingLight).unwrap(),
        "\"streaming_light\""
    );
    let rgb: Rgb = serde_json::from_str(r#"{"red":1,"green":2,"blue":3}"#).unwrap();
    assert_eq!(rgb, Rgb::new(1, 2, 3));
    assert_eq!(Rgb::default(), Rgb::BLACK);
}
